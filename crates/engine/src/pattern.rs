//! Pattern IR - multi-template specs compiled for incremental matching

use crate::{EngineError, EngineResult};
use quad_model::{Atom, Binding, Quad};

/// One quad template: four positions, each a literal atom, a PatternVar, or
/// the Wildcard
pub type Template = [Atom; 4];

/// A multi-quad pattern with optional negative application conditions
///
/// Templates are evaluated conjunctively in declared order under a shared
/// binding; the engine never reorders them. A NAC template suppresses a
/// completion when any stored quad matches it under the completion binding.
#[derive(Clone, Debug, Default)]
pub struct Pattern {
    /// Quad templates in join order
    pub templates: Vec<Template>,
    /// Negative application conditions
    pub nacs: Vec<Template>,
}

impl Pattern {
    /// Create a pattern from ordered templates
    pub fn new(templates: Vec<Template>) -> Self {
        Self {
            templates,
            nacs: Vec::new(),
        }
    }

    /// Attach NAC templates
    pub fn with_nacs(mut self, nacs: Vec<Template>) -> Self {
        self.nacs = nacs;
        self
    }

    /// Create a pattern from row slices, checking arity
    pub fn from_rows(rows: &[Vec<Atom>]) -> EngineResult<Self> {
        let mut templates = Vec::with_capacity(rows.len());
        for row in rows {
            let template: Template = row.clone().try_into().map_err(|_| {
                EngineError::InvalidPattern(format!(
                    "quad template must have 4 positions, found {}",
                    row.len()
                ))
            })?;
            templates.push(template);
        }
        Ok(Self::new(templates))
    }
}

/// Pattern compiled at watcher install
///
/// Carries per-template literal masks, the per-position literal summary the
/// activation index enrols under, and the wildcard flag for patterns with no
/// indexable literal.
pub(crate) struct CompiledPattern {
    templates: Vec<Template>,
    nacs: Vec<Template>,
    /// Bit i set when position i of the template holds a literal
    literal_masks: Vec<u8>,
    /// Literals occurring at each position, deduplicated
    literals: [Vec<Atom>; 4],
    /// Position every template constrains with a literal, if any; the
    /// activation index may only enrol under such a position
    indexable: Option<usize>,
}

impl CompiledPattern {
    pub fn compile(pattern: Pattern) -> Self {
        let Pattern { templates, nacs } = pattern;

        let mut literal_masks = Vec::with_capacity(templates.len());
        let mut literals: [Vec<Atom>; 4] = Default::default();
        for template in &templates {
            let mut mask = 0u8;
            for (pos, atom) in template.iter().enumerate() {
                if !atom.is_pattern_only() {
                    mask |= 1 << pos;
                    if !literals[pos].contains(atom) {
                        literals[pos].push(atom.clone());
                    }
                }
            }
            literal_masks.push(mask);
        }

        // Selective activation is only sound at a position every template
        // constrains: a quad matching some template must carry that
        // template's literal there. Priority: source > attribute > target >
        // context.
        let indexable = (0..4).find(|&pos| {
            !templates.is_empty()
                && literal_masks.iter().all(|mask| mask & (1 << pos) != 0)
        });

        Self {
            templates,
            nacs,
            literal_masks,
            literals,
            indexable,
        }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn nacs(&self) -> &[Template] {
        &self.nacs
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Literals at the given position across all templates
    pub fn literals_at(&self, pos: usize) -> &[Atom] {
        &self.literals[pos]
    }

    /// The position the activation index enrols this pattern under
    pub fn index_position(&self) -> Option<usize> {
        self.indexable
    }

    /// True when no position is indexable (pure variables/wildcards, or
    /// uneven literal coverage across templates)
    pub fn has_only_wildcards(&self) -> bool {
        self.indexable.is_none()
    }

    /// Match one template against a quad under an existing binding
    ///
    /// Literal positions are checked mask-first, so a mismatching quad is
    /// rejected before any binding is cloned.
    pub fn match_template(
        &self,
        index: usize,
        quad: &Quad,
        binding: &Binding,
    ) -> Option<Binding> {
        let template = &self.templates[index];
        let mask = self.literal_masks[index];
        for (pos, atom) in quad.atoms().into_iter().enumerate() {
            if mask & (1 << pos) != 0 && !template[pos].matches(atom) {
                return None;
            }
        }
        match_template(template, quad, binding)
    }

    #[cfg(test)]
    pub fn literal_mask(&self, index: usize) -> u8 {
        self.literal_masks[index]
    }
}

/// Match a single template against a quad, extending the binding
///
/// Literal positions require atom match equality; variables bind or check
/// consistency; wildcards accept without binding. Returns the extended
/// binding on success.
pub(crate) fn match_template(
    template: &Template,
    quad: &Quad,
    binding: &Binding,
) -> Option<Binding> {
    let mut bound = binding.clone();
    for (slot, atom) in template.iter().zip(quad.atoms()) {
        match slot {
            Atom::Wildcard => {}
            Atom::Var(var) => {
                bound = bound.extended(var.symbol(), atom.clone())?;
            }
            literal => {
                if !literal.matches(atom) {
                    return None;
                }
            }
        }
    }
    Some(bound)
}
