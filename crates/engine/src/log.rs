//! Append-only quad log with dedup and batch savepoints

use crate::{EngineError, EngineResult};
use ahash::AHashMap;
use quad_model::{word, Atom, Quad, QuadId, SystemVocab};

/// Identity key over the four fields
type QuadKey = (Atom, Atom, Atom, Atom);
/// Identity key over source/attribute/target, used for contextless dedup
type TripleKey = (Atom, Atom, Atom);

/// Outcome of an append
#[derive(Debug, Clone, Copy)]
pub(crate) struct Appended {
    pub id: QuadId,
    /// False when the append deduplicated against an existing quad
    pub fresh: bool,
}

/// Savepoint for batch rollback
#[derive(Debug, Clone, Copy)]
pub(crate) struct Savepoint {
    len: usize,
}

/// The ordered quad sequence
///
/// Ids are dense and double as log positions. `visible_len` trails the
/// physical length while a batch is open; committed quads are visible,
/// pending ones are not.
pub(crate) struct QuadLog {
    quads: Vec<Quad>,
    dedup: AHashMap<QuadKey, QuadId>,
    /// Contextless appends dedup on the triple against earlier
    /// auto-contexted quads
    auto_dedup: AHashMap<TripleKey, QuadId>,
    visible_len: usize,
}

impl QuadLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            quads: Vec::with_capacity(capacity),
            dedup: AHashMap::with_capacity(capacity),
            auto_dedup: AHashMap::new(),
            visible_len: 0,
        }
    }

    /// Record a quad, deduplicating against the existing sequence
    ///
    /// `in_batch` leaves the new quad pending (invisible) until commit.
    pub fn append(
        &mut self,
        source: Atom,
        attribute: Atom,
        target: Atom,
        context: Option<Atom>,
        in_batch: bool,
    ) -> EngineResult<Appended> {
        for atom in [&source, &attribute, &target] {
            reject_pattern_atom(atom)?;
        }
        if let Some(c) = &context {
            reject_pattern_atom(c)?;
        }

        let next_id = self.quads.len() as u64;
        let (context, auto) = match context {
            Some(c) => {
                let key = (
                    source.clone(),
                    attribute.clone(),
                    target.clone(),
                    c.clone(),
                );
                if let Some(&id) = self.dedup.get(&key) {
                    return Ok(Appended { id, fresh: false });
                }
                (c, false)
            }
            None => {
                let key = (source.clone(), attribute.clone(), target.clone());
                if let Some(&id) = self.auto_dedup.get(&key) {
                    return Ok(Appended { id, fresh: false });
                }
                let c = word(&format!("{}{}", SystemVocab::EDGE_PREFIX, next_id));
                (c, true)
            }
        };

        let id = QuadId(next_id);
        let quad = Quad::new(source, attribute, target, context, id);
        self.dedup.insert(quad.fields(), id);
        if auto {
            let (s, a, t, _) = quad.fields();
            self.auto_dedup.insert((s, a, t), id);
        }
        self.quads.push(quad);
        if !in_batch {
            self.visible_len = self.quads.len();
        }
        Ok(Appended { id, fresh: true })
    }

    pub fn quad(&self, id: QuadId) -> &Quad {
        &self.quads[id.index()]
    }

    /// Committed quads in id order
    pub fn visible(&self) -> &[Quad] {
        &self.quads[..self.visible_len]
    }

    /// Whether a visible quad with these exact fields exists
    pub fn contains(&self, key: &QuadKey) -> bool {
        match self.dedup.get(key) {
            Some(id) => id.index() < self.visible_len,
            None => false,
        }
    }

    /// Physical length, pending quads included
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn savepoint(&self) -> Savepoint {
        Savepoint {
            len: self.quads.len(),
        }
    }

    /// Make every pending quad visible
    pub fn commit(&mut self) {
        self.visible_len = self.quads.len();
    }

    /// Discard quads recorded after the savepoint and rewind the id counter
    pub fn rollback(&mut self, sp: Savepoint) {
        for quad in self.quads.drain(sp.len..) {
            self.dedup.remove(&quad.fields());
            let (s, a, t, _) = quad.fields();
            if let Some(&id) = self.auto_dedup.get(&(s.clone(), a.clone(), t.clone())) {
                if id == quad.id() {
                    self.auto_dedup.remove(&(s, a, t));
                }
            }
        }
        debug_assert!(self.visible_len <= self.quads.len());
    }
}

fn reject_pattern_atom(atom: &Atom) -> EngineResult<()> {
    if atom.is_pattern_only() {
        return Err(EngineError::InvalidAtom(format!(
            "{} may not appear in a stored quad",
            atom
        )));
    }
    Ok(())
}
