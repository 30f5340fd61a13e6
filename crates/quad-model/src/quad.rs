//! Quads: the atomic unit of storage

use crate::Atom;
use std::fmt;

/// Dense, strictly increasing quad identifier
///
/// Ids double as positions in the append-only log; they are never reused
/// (a rolled-back batch rewinds the counter before any id escapes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct QuadId(pub u64);

impl QuadId {
    /// Position in the log
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for QuadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored quad: `(source, attribute, target, context)`
///
/// All four fields are ground atoms (never PatternVar or Wildcard). The id
/// is not part of identity; two quads are the same iff all four fields are
/// equal under atom equality.
#[derive(Clone)]
pub struct Quad {
    /// Subject of the statement
    pub source: Atom,
    /// Relation name
    pub attribute: Atom,
    /// Object of the statement
    pub target: Atom,
    /// Provenance/grouping atom; the quad's user-facing handle
    pub context: Atom,
    id: QuadId,
}

impl Quad {
    /// Create a quad with an assigned id
    pub fn new(source: Atom, attribute: Atom, target: Atom, context: Atom, id: QuadId) -> Self {
        Quad {
            source,
            attribute,
            target,
            context,
            id,
        }
    }

    /// The quad's id
    pub fn id(&self) -> QuadId {
        self.id
    }

    /// The four fields in position order
    pub fn atoms(&self) -> [&Atom; 4] {
        [&self.source, &self.attribute, &self.target, &self.context]
    }

    /// The four fields as an owned identity key
    pub fn fields(&self) -> (Atom, Atom, Atom, Atom) {
        (
            self.source.clone(),
            self.attribute.clone(),
            self.target.clone(),
            self.context.clone(),
        )
    }
}

// Identity is the four fields; the id is a log position, not content
impl PartialEq for Quad {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.attribute == other.attribute
            && self.target == other.target
            && self.context == other.context
    }
}

impl Eq for Quad {}

impl std::hash::Hash for Quad {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.attribute.hash(state);
        self.target.hash(state);
        self.context.hash(state);
    }
}

impl fmt::Debug for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quad")
            .field("id", &self.id.0)
            .field("source", &self.source)
            .field("attribute", &self.attribute)
            .field("target", &self.target)
            .field("context", &self.context)
            .finish()
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.source, self.attribute, self.target, self.context
        )
    }
}
