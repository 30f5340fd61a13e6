//! Incremental partial-match engine
//!
//! Per-watcher join state. A new quad may extend any live partial whose next
//! template it satisfies, and may start a fresh partial at the first
//! template; extension never consumes the parent, so one matched prefix can
//! complete along many future suffixes.

use crate::log::QuadLog;
use crate::pattern::{match_template, CompiledPattern};
use quad_model::{Atom, Binding, Quad, QuadId};
use smallvec::SmallVec;

/// A completed match delivered to a watcher callback
#[derive(Clone, Debug)]
pub struct MatchEvent {
    /// Variable assignments accumulated across the templates
    pub binding: Binding,
    /// The quads that satisfied the templates, in template order
    pub quads: Vec<Quad>,
}

/// Intermediate join state: binding plus quads matched so far, awaiting the
/// template at `next`
struct PartialMatch {
    next: usize,
    binding: Binding,
    quads: SmallVec<[QuadId; 4]>,
}

/// A completion produced by [`MatchState::advance`], pending NAC evaluation
pub(crate) struct Completion {
    pub binding: Binding,
    pub quads: SmallVec<[QuadId; 4]>,
}

/// Per-watcher incremental state
///
/// Partials live in an arena in creation order; they are only dropped when
/// the owning watcher is uninstalled (the whole state goes with it).
pub(crate) struct MatchState {
    partials: Vec<PartialMatch>,
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            partials: Vec::new(),
        }
    }

    pub fn partial_count(&self) -> usize {
        self.partials.len()
    }

    /// Feed one quad through the pattern
    ///
    /// Returns completions in deterministic order: extensions of existing
    /// partials in creation order, then a fresh start. Only partials that
    /// existed before this call are considered, so a quad never extends a
    /// partial it just created.
    pub fn advance(
        &mut self,
        pattern: &CompiledPattern,
        quad: &Quad,
    ) -> SmallVec<[Completion; 2]> {
        let mut completed: SmallVec<[Completion; 2]> = SmallVec::new();
        let total = pattern.template_count();
        if total == 0 {
            return completed;
        }

        let existing = self.partials.len();
        for i in 0..existing {
            let partial = &self.partials[i];
            if let Some(binding) = pattern.match_template(partial.next, quad, &partial.binding) {
                let mut quads = partial.quads.clone();
                quads.push(quad.id());
                let next = partial.next + 1;
                if next == total {
                    completed.push(Completion { binding, quads });
                } else {
                    self.partials.push(PartialMatch {
                        next,
                        binding,
                        quads,
                    });
                }
            }
        }

        if let Some(binding) = pattern.match_template(0, quad, &Binding::new()) {
            let quads: SmallVec<[QuadId; 4]> = smallvec::smallvec![quad.id()];
            if total == 1 {
                completed.push(Completion { binding, quads });
            } else {
                self.partials.push(PartialMatch {
                    next: 1,
                    binding,
                    quads,
                });
            }
        }

        completed
    }
}

/// Evaluate a pattern's NACs against the visible store
///
/// A NAC fires (suppresses the match) when any visible quad matches the
/// instantiated template. Bound variables substitute their values; unbound
/// positions act as existential wildcards, with repeated unbound variables
/// still required to agree within the witness quad.
pub(crate) fn nac_blocked(log: &QuadLog, pattern: &CompiledPattern, binding: &Binding) -> bool {
    pattern.nacs().iter().any(|nac| {
        let resolved = substitute(nac, binding);
        if let Some(key) = ground_key(&resolved) {
            return log.contains(&key);
        }
        log.visible()
            .iter()
            .any(|quad| match_template(&resolved, quad, &Binding::new()).is_some())
    })
}

fn substitute(template: &[Atom; 4], binding: &Binding) -> [Atom; 4] {
    let resolve = |atom: &Atom| match atom {
        Atom::Var(var) => binding
            .get(var.symbol())
            .cloned()
            .unwrap_or_else(|| atom.clone()),
        other => other.clone(),
    };
    [
        resolve(&template[0]),
        resolve(&template[1]),
        resolve(&template[2]),
        resolve(&template[3]),
    ]
}

/// Identity key for a fully ground template without NaN literals, which can
/// answer through the dedup index instead of a scan. NaN literals never
/// match, so they must take the scan path.
fn ground_key(template: &[Atom; 4]) -> Option<(Atom, Atom, Atom, Atom)> {
    for atom in template {
        if atom.is_pattern_only() {
            return None;
        }
        if let Atom::Number(n) = atom {
            if n.is_nan() {
                return None;
            }
        }
    }
    Some((
        template[0].clone(),
        template[1].clone(),
        template[2].clone(),
        template[3].clone(),
    ))
}
