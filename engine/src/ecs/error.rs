//! Error types surfaced by the world's mutation API.
//!
//! The storage layer distinguishes API misuse from expected runtime state:
//! a dead entity or a missing component is normal traffic in a simulation and
//! is reported through `false`/`None` returns, never through this enum. The
//! only error value a caller can receive is a validation failure detected
//! before any mutation has happened.

use thiserror::Error;

/// Errors raised by the world's mutation API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The same component type appeared more than once in a single spawn set
    /// while strict validation is enabled. Raised before any entity id is
    /// allocated or any archetype touched.
    #[error("duplicate component type `{0}` in spawn set")]
    DuplicateComponentType(&'static str),
}

/// Convenience alias for results produced by the world API.
pub type Result<T> = std::result::Result<T, Error>;
