//! Raw input identities, events, labels, and the input source capability.
//!
//! Everything physical lives behind this module's boundary: the rest of the
//! crate only sees opaque [`InputId`]s and [`InputEvent`]s. The engine- or
//! platform-specific side (reading keyboards, gamepads, gesture recognizers)
//! implements [`InputSource`] and feeds events into a dispatcher.

pub mod event;
pub mod labels;
pub mod source;

pub use event::{AxisPayload, DeviceClass, InputEvent, InputId, InputPhase};
pub use labels::{install_labels, label_of, resolve_label};
pub use source::{ChannelSource, InputSource};
