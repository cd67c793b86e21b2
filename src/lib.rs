//! actionkit: composable input actions with dispatch arbitration.
//!
//! The crate splits into two halves:
//!
//! - [`action`] defines the combinator algebra. Every variant, from a plain
//!   key press to a nested sequence of chords, exposes the same activation
//!   contract: `triggered` when its condition starts holding, `released`
//!   when it stops.
//! - [`dispatch`] owns the pipeline. A [`Context`] routes raw events into
//!   bound actions, batches their triggers, applies the ghosting check and
//!   largest-chord arbitration, and executes exactly one listener at a time
//!   through its queue.
//!
//! Everything runs single-threaded and cooperatively; state is shared with
//! `Rc`/`RefCell` and listeners are local futures. A tokio current-thread
//! runtime is the intended host.
//!
//! ```no_run
//! use actionkit::{Action, ChannelSource, Context, InputEvent, InputId};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let ctx = Context::default();
//! let jump = InputId(32);
//!
//! ctx.bind(Action::tap(jump, 2, std::time::Duration::from_millis(250)), || async {
//!     println!("double jump");
//!     Ok(())
//! })?;
//!
//! let (source, events) = ChannelSource::new();
//! events.send(InputEvent::began(jump))?;
//! ctx.drive(source).await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod dispatch;
pub mod error;
pub mod input;
pub mod signal;

mod router;

pub use action::{Action, ActionKind, Binding, Predicate, TriggerData, TriggerPayload};
pub use dispatch::{Context, ContextOptions, Gate};
pub use error::{ActionError, Result};
pub use input::{
    install_labels, label_of, resolve_label, AxisPayload, ChannelSource, DeviceClass,
    InputEvent, InputId, InputPhase, InputSource,
};
pub use signal::{Signal, Subscription, SubscriptionBin};

/// Crate version, for embedders that surface it in diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
