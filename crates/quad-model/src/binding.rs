//! Immutable variable bindings

use crate::interner::Symbol;
use crate::{Atom, PatternVar};
use smallvec::SmallVec;
use std::fmt;

/// Immutable map from variable name to atom
///
/// Backed by a small inline vector; extension clones. Typical patterns bind
/// a handful of variables, where a linear scan beats a hash map.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Binding {
    slots: SmallVec<[(Symbol, Atom); 4]>,
}

impl Binding {
    /// The empty binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a variable by its interned symbol
    pub fn get(&self, var: Symbol) -> Option<&Atom> {
        self.slots
            .iter()
            .find(|(sym, _)| *sym == var)
            .map(|(_, atom)| atom)
    }

    /// Look up a variable by name (canonicalised like `PatternVar::new`)
    pub fn get_named(&self, name: &str) -> Option<&Atom> {
        self.get(PatternVar::new(name).symbol())
    }

    /// Extend with `var -> value`
    ///
    /// Returns `None` when `var` is already bound to a value that does not
    /// match `value`; otherwise a new binding (unchanged if already bound to
    /// an equal value).
    pub fn extended(&self, var: Symbol, value: Atom) -> Option<Binding> {
        match self.get(var) {
            Some(bound) => {
                if bound.matches(&value) {
                    Some(self.clone())
                } else {
                    None
                }
            }
            None => {
                let mut next = self.clone();
                next.slots.push((var, value));
                Some(next)
            }
        }
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no variable is bound
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over `(variable, atom)` pairs in binding order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Atom)> {
        self.slots.iter().map(|(sym, atom)| (*sym, atom))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (sym, atom) in self.iter() {
            map.entry(
                &format_args!("?{}", sym.as_str()),
                &format_args!("{}", atom),
            );
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pattern_var, word};

    fn sym(name: &str) -> Symbol {
        match pattern_var(name) {
            Atom::Var(v) => v.symbol(),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_extend_fresh_variable() {
        let b = Binding::new().extended(sym("x"), word("alice")).unwrap();

        assert_eq!(b.get(sym("x")), Some(&word("alice")));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_extend_consistent_rebind() {
        let b = Binding::new().extended(sym("x"), word("alice")).unwrap();
        let b2 = b.extended(sym("x"), word("ALICE")).unwrap();

        assert_eq!(b2.len(), 1);
    }

    #[test]
    fn test_extend_conflict() {
        let b = Binding::new().extended(sym("x"), word("alice")).unwrap();

        assert!(b.extended(sym("x"), word("bob")).is_none());
    }

    #[test]
    fn test_extension_preserves_original() {
        let b = Binding::new().extended(sym("x"), word("alice")).unwrap();
        let _b2 = b.extended(sym("y"), word("bob")).unwrap();

        assert_eq!(b.len(), 1);
        assert!(b.get(sym("y")).is_none());
    }

    #[test]
    fn test_get_named_canonicalises() {
        let b = Binding::new().extended(sym("x"), word("alice")).unwrap();

        assert_eq!(b.get_named("X"), Some(&word("alice")));
        assert_eq!(b.get_named(" x "), Some(&word("alice")));
    }
}
