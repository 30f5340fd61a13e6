//! Process-wide symbol interning
//!
//! Deduplicates canonical names and hands out stable `Symbol` handles so
//! that Word and variable equality is a single integer comparison.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// Handle to an interned string
///
/// Two symbols are equal iff they were interned from the same canonical
/// string. Handles are valid for the lifetime of the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Get the interned string this symbol refers to
    pub fn as_str(&self) -> Arc<str> {
        resolve(*self)
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Symbol({}: {})", self.0, self.as_str())
    }
}

#[derive(Default)]
struct Inner {
    ids: FxHashMap<Arc<str>, u32>,
    names: Vec<Arc<str>>,
}

struct Interner {
    inner: RwLock<Inner>,
}

impl Interner {
    fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn intern(&self, s: &str) -> Symbol {
        // Fast path: already interned (read lock)
        {
            let guard = self.inner.read();
            if let Some(&id) = guard.ids.get(s) {
                return Symbol(id);
            }
        }

        // Slow path: insert (write lock)
        let mut guard = self.inner.write();

        // Re-check after acquiring the write lock
        if let Some(&id) = guard.ids.get(s) {
            return Symbol(id);
        }

        let arc: Arc<str> = s.into();
        let id = guard.names.len() as u32;
        guard.names.push(arc.clone());
        guard.ids.insert(arc, id);
        Symbol(id)
    }

    fn resolve(&self, sym: Symbol) -> Arc<str> {
        self.inner.read().names[sym.0 as usize].clone()
    }
}

fn global() -> &'static Interner {
    static INTERNER: OnceLock<Interner> = OnceLock::new();
    INTERNER.get_or_init(Interner::new)
}

/// Intern a string and return its symbol
///
/// The string is interned verbatim; callers are responsible for
/// canonicalisation (Words normalise before interning).
pub fn intern(s: &str) -> Symbol {
    global().intern(s)
}

/// Resolve a symbol back to its interned string
pub fn resolve(sym: Symbol) -> Arc<str> {
    global().resolve(sym)
}
