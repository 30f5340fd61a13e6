//! Core data model for the quad store
//!
//! Implements the five atom kinds (Word, String, Number, PatternVar,
//! Wildcard), interned symbols for O(1) Word equality, quads with dense
//! monotonic ids, and immutable variable bindings.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod atom;
mod binding;
mod interner;
mod quad;
mod vocab;

pub use atom::{pattern_var, word, Atom, Number, PatternVar, Word, WC};
pub use binding::Binding;
pub use interner::{intern, resolve, Symbol};
pub use quad::{Quad, QuadId};
pub use vocab::SystemVocab;
