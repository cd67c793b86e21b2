//! The input source capability consumed by a dispatcher.
//!
//! actionkit never reads hardware itself; an embedding supplies something
//! that yields [`InputEvent`]s and answers point-in-time "is this held"
//! queries. [`ChannelSource`] is a ready-made adapter over a tokio channel,
//! useful for tests and for engines that already have an event pump.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::event::{InputEvent, InputId, InputPhase};

/// Feed of raw input events plus a held-state query.
#[async_trait(?Send)]
pub trait InputSource {
    /// Next event, or `None` once the source is exhausted.
    async fn next_event(&mut self) -> Option<InputEvent>;

    /// Whether the input is currently held, as of the last yielded event.
    fn is_held(&self, id: InputId) -> bool;
}

/// Channel-backed [`InputSource`]. Producers push [`InputEvent`]s through the
/// sender half; the source tracks held state from the events it yields.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<InputEvent>,
    held: HashSet<InputId>,
}

impl ChannelSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<InputEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx,
                held: HashSet::new(),
            },
            tx,
        )
    }
}

#[async_trait(?Send)]
impl InputSource for ChannelSource {
    async fn next_event(&mut self) -> Option<InputEvent> {
        let event = self.rx.recv().await?;
        match event.phase {
            InputPhase::Began => {
                self.held.insert(event.id);
            }
            InputPhase::Ended => {
                self.held.remove(&event.id);
            }
            InputPhase::Changed(_) => {}
        }
        Some(event)
    }

    fn is_held(&self, id: InputId) -> bool {
        self.held.contains(&id)
    }
}
