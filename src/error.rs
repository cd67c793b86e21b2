//! Error types and handling infrastructure for actionkit.
//!
//! Custom error variants use `thiserror`; listener failures carry an
//! `anyhow::Error` so user callbacks can bubble arbitrary context through the
//! execution queue.
//!
//! ## Design Principles
//!
//! - **Fail fast on misuse**: malformed bindings and unbound updates error
//!   before any state mutation.
//! - **Recover locally where sensible**: unbinding a never-bound action is a
//!   logged warning, not an error.
//! - **No silent listener failures**: a failed listener future propagates to
//!   whoever awaits the flush, after queue cleanup has run.

use thiserror::Error;

/// The main error type for actionkit operations.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Malformed action-like value passed to `bind` or a dynamic update.
    #[error("invalid binding: {reason}")]
    InvalidBinding { reason: String },

    /// Dynamic update called on an action with no dispatcher context.
    #[error("cannot update a dynamic action that is not bound to a context")]
    UnboundUpdate,

    /// A bound listener future returned an error.
    #[error("action listener failed")]
    Listener(#[source] anyhow::Error),
}

/// Standard Result type for actionkit operations.
pub type Result<T> = std::result::Result<T, ActionError>;

impl ActionError {
    /// Create an InvalidBinding error with a descriptive reason
    pub fn invalid_binding(reason: impl Into<String>) -> Self {
        Self::InvalidBinding {
            reason: reason.into(),
        }
    }

    /// Wrap a listener failure
    pub fn listener(source: anyhow::Error) -> Self {
        Self::Listener(source)
    }
}
