//! In-memory append-only quad store with incremental pattern matching
//!
//! The store keeps an ordered, deduplicated log of quads and a set of
//! long-lived watchers. Each watcher owns a multi-template pattern with
//! variable binding and negative application conditions; as quads are
//! appended, partial matches extend incrementally and every newly completed
//! match fires the watcher's callback exactly once. Callbacks may append
//! further quads; cascades run on a single-threaded work queue.
//!
//! # Design Principles
//!
//! 1. **Append-only**: quads are never mutated or removed outside a batch
//!    that rolls back.
//! 2. **Selective activation**: watchers are indexed by the literals of
//!    their patterns so a new quad wakes only the watchers that could
//!    conceivably care.
//! 3. **Partial-match preservation**: extending a partial keeps the parent
//!    alive, so one prefix can complete along many suffixes.
//!
//! # Example
//!
//! ```rust
//! use engine::{Pattern, Store};
//! use quad_model::{pattern_var, word};
//!
//! let mut store = Store::new();
//! store.append(word("alice"), word("parent"), word("bob"), None).unwrap();
//! store.append(word("bob"), word("parent"), word("carol"), None).unwrap();
//!
//! let pattern = Pattern::new(vec![
//!     [pattern_var("x"), word("parent"), pattern_var("y"), quad_model::WC],
//!     [pattern_var("y"), word("parent"), pattern_var("z"), quad_model::WC],
//! ]);
//! let bindings = store.query(&pattern).unwrap();
//! assert_eq!(bindings.len(), 1);
//! assert_eq!(bindings[0].get_named("z"), Some(&word("carol")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod activation;
mod log;
mod matcher;
mod pattern;
mod store;

pub use matcher::MatchEvent;
pub use pattern::{Pattern, Template};
pub use store::{Store, StoreStats, WatcherHandle};

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// PatternVar or Wildcard used in a stored quad
    #[error("invalid atom in stored quad: {0}")]
    InvalidAtom(String),

    /// Malformed pattern at watcher install
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Watcher callback raised
    #[error("watcher callback failed: {0}")]
    Callback(String),

    /// Batch body raised; the batch was discarded and ids rewound
    #[error("batch aborted: {0}")]
    BatchAborted(#[source] Box<EngineError>),

    /// Cascade budget exceeded
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Expected quad count, used to pre-allocate the log and dedup index
    pub expected_quads: usize,
    /// Maximum quads propagated by one top-level append or batch commit;
    /// `None` leaves cascades unbounded
    pub cascade_budget: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            expected_quads: 1024,
            cascade_budget: None,
        }
    }
}
