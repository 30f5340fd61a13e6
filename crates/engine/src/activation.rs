//! Selective-activation index
//!
//! Maps literal atoms at each quad position to the watchers enrolled under
//! them. Each watcher lives in exactly one position index (or the wildcard
//! set), chosen by the priority `source > attribute > target > context`:
//! source and attribute carry the most selective literals in entity- and
//! predicate-centric workloads, while contexts are frequently wildcarded.

use crate::pattern::CompiledPattern;
use quad_model::{Atom, Quad};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

pub(crate) type WatcherId = u64;

/// Watcher index keyed by literal position values
#[derive(Default)]
pub(crate) struct ActivationIndex {
    positions: [FxHashMap<Atom, SmallVec<[WatcherId; 2]>>; 4],
    wildcard: Vec<WatcherId>,
}

impl ActivationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enrol a watcher under its pattern's index position
    pub fn enrol(&mut self, id: WatcherId, pattern: &CompiledPattern) {
        match pattern.index_position() {
            Some(pos) => {
                for literal in pattern.literals_at(pos) {
                    self.positions[pos]
                        .entry(literal.clone())
                        .or_default()
                        .push(id);
                }
            }
            None => self.wildcard.push(id),
        }
    }

    /// Remove a watcher from every entry it occupies
    pub fn remove(&mut self, id: WatcherId, pattern: &CompiledPattern) {
        match pattern.index_position() {
            Some(pos) => {
                for literal in pattern.literals_at(pos) {
                    if let Some(entry) = self.positions[pos].get_mut(literal) {
                        entry.retain(|w| *w != id);
                        if entry.is_empty() {
                            self.positions[pos].remove(literal);
                        }
                    }
                }
            }
            None => self.wildcard.retain(|&w| w != id),
        }
    }

    /// Watchers whose pattern could conceivably match a quad involving `quad`
    ///
    /// Union of the four position entries and the wildcard set, sorted by
    /// watcher id so dispatch follows install order. Single-position
    /// enrolment keeps the union duplicate-free.
    pub fn candidates(&self, quad: &Quad) -> SmallVec<[WatcherId; 8]> {
        let mut out: SmallVec<[WatcherId; 8]> = SmallVec::new();
        for (pos, atom) in quad.atoms().into_iter().enumerate() {
            if let Some(entry) = self.positions[pos].get(atom) {
                out.extend_from_slice(entry);
            }
        }
        out.extend_from_slice(&self.wildcard);
        out.sort_unstable();
        out
    }

    /// Total enrolled entries across all positions plus the wildcard set
    pub fn len(&self) -> usize {
        self.positions
            .iter()
            .map(|map| map.values().map(|v| v.len()).sum::<usize>())
            .sum::<usize>()
            + self.wildcard.len()
    }
}
