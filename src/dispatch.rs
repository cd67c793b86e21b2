//! The dispatching side of the crate: configuration, the dispatcher itself,
//! and the single-flight execution queue behind it.

pub mod context;
pub mod options;
pub mod queue;

pub use context::Context;
pub use options::{ContextOptions, Gate};
