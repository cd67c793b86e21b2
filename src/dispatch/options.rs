//! Dispatcher configuration.

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::input::InputId;

/// Pre-dispatch gate, consulted once per staged trigger. A `false` verdict
/// drops that trigger before arbitration.
pub enum Gate {
    Sync(Box<dyn Fn() -> bool>),
    Async(Box<dyn Fn() -> LocalBoxFuture<'static, bool>>),
}

impl Gate {
    pub fn sync(check: impl Fn() -> bool + 'static) -> Self {
        Gate::Sync(Box::new(check))
    }

    pub fn asynchronous<F, Fut>(check: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: std::future::Future<Output = bool> + 'static,
    {
        Gate::Async(Box::new(move || check().boxed_local()))
    }

    pub(crate) async fn check(&self) -> bool {
        match self {
            Gate::Sync(check) => check(),
            Gate::Async(check) => check().await,
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Gate::Sync(Box::new(|| true))
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gate::Sync(_) => f.write_str("Gate::Sync"),
            Gate::Async(_) => f.write_str("Gate::Async"),
        }
    }
}

/// Per-dispatcher options, fixed at construction.
#[derive(Debug, Default)]
pub struct ContextOptions {
    /// Maximum tolerated ghosting level across one arbitration batch.
    /// Zero disables the check.
    pub ghosting_cap: u32,
    /// Gate consulted for every staged trigger before arbitration.
    pub on_before: Gate,
    /// Tri-state filter on the event `processed` flag: `None` forwards
    /// everything, `Some(v)` forwards only events whose flag equals `v`.
    pub process: Option<bool>,
    /// Inputs exempt from the `process` filter.
    pub process_allow_list: Vec<InputId>,
    /// Run every winning listener inline instead of through the queue.
    pub run_synchronously: bool,
}

impl ContextOptions {
    pub fn with_ghosting_cap(mut self, cap: u32) -> Self {
        self.ghosting_cap = cap;
        self
    }

    pub fn with_on_before(mut self, gate: Gate) -> Self {
        self.on_before = gate;
        self
    }

    pub fn with_process(mut self, process: Option<bool>) -> Self {
        self.process = process;
        self
    }

    pub fn with_process_allow_list(mut self, allow: Vec<InputId>) -> Self {
        self.process_allow_list = allow;
        self
    }

    pub fn with_run_synchronously(mut self, yes: bool) -> Self {
        self.run_synchronously = yes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sync_and_async_gates_agree() {
        let allow = Gate::sync(|| true);
        let deny = Gate::asynchronous(|| async { false });
        assert!(allow.check().await);
        assert!(!deny.check().await);
    }

    #[test]
    fn defaults_are_permissive() {
        let options = ContextOptions::default();
        assert_eq!(options.ghosting_cap, 0);
        assert_eq!(options.process, None);
        assert!(!options.run_synchronously);
    }
}
