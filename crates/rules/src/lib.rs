//! Reified rules over the quad store
//!
//! Rules are themselves quads: a rule's match, produce and NAC templates are
//! stored as strings under its own context, and membership in the `RULE`
//! system context activates it. The activator is an ordinary watcher; firing
//! appends the produced quads followed by firing records, so the whole
//! mechanism stays inside the store's semantics.
//!
//! Also hosts the effect-operation helper: a convention where requests,
//! outputs and completion markers are ordinary quads and the engine's
//! ordering guarantee makes completion-marker-last reliable.

use engine::EngineError;

mod activator;
mod ops;
mod template;

pub use activator::RuleActivator;
pub use ops::install_operation;
pub use template::parse_template;

/// Rule layer error types
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Malformed quad-template string
    #[error("malformed quad template: {0}")]
    Template(String),

    /// Structurally invalid rule definition
    #[error("invalid rule definition: {0}")]
    Definition(String),

    /// Underlying engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;
