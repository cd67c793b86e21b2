//! The uniform state machine embedded in every action variant.
//!
//! `ActionCore` owns the activation flag, the flattened raw-input content,
//! the full signal set, and the weak back-pointer to the owning dispatcher.
//! Variants never add primitive states; they re-derive their own `active`
//! from child `changed` notifications and funnel every transition through
//! [`ActionCore::set_triggered`] so the trigger/release pair fires exactly
//! once per transition.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dispatch::context::ContextInner;
use crate::input::InputId;
use crate::input::event::AxisPayload;
use crate::signal::{Signal, SubscriptionBin};

/// Data attached to a trigger notification.
#[derive(Clone)]
pub enum TriggerData {
    None,
    /// Sample from a continuous input.
    Axis(AxisPayload),
    /// Caller-supplied payload from a manual trigger.
    Custom(Rc<dyn Any>),
}

impl std::fmt::Debug for TriggerData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Axis(payload) => f.debug_tuple("Axis").field(payload).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Payload delivered with every `triggered` signal.
#[derive(Clone, Debug)]
pub struct TriggerPayload {
    /// The dispatcher's configured `process` filter at trigger time.
    pub processed: Option<bool>,
    pub data: TriggerData,
}

pub(crate) struct ActionCore {
    pub active: Cell<bool>,
    /// Locked actions never stage their triggers into dispatcher arbitration.
    /// Set when a caller-supplied action is adopted as a combinator child.
    pub locked: Cell<bool>,
    pub destroyed_flag: Cell<bool>,
    /// Flattened list of every raw input transitively referenced.
    pub content: RefCell<Vec<InputId>>,
    pub context: RefCell<Weak<ContextInner>>,

    pub triggered: Signal<TriggerPayload>,
    pub released: Signal<Option<bool>>,
    pub changed: Signal<()>,
    pub cancelled: Signal<()>,
    pub resolved: Signal<()>,
    pub rejected: Signal<()>,
    pub destroyed: Signal<()>,
    pub bound: Signal<()>,
    pub updated: Signal<()>,

    /// Construction-time wiring (variant re-evaluation hooks). Lives for the
    /// whole action lifetime.
    pub bin: SubscriptionBin,
    /// Per-context wiring (router + member subscriptions). Cleared whenever
    /// the action detaches or moves to a different dispatcher.
    pub context_bin: SubscriptionBin,
}

impl ActionCore {
    pub fn new(content: Vec<InputId>) -> Self {
        Self {
            active: Cell::new(false),
            locked: Cell::new(false),
            destroyed_flag: Cell::new(false),
            content: RefCell::new(content),
            context: RefCell::new(Weak::new()),
            triggered: Signal::new(),
            released: Signal::new(),
            changed: Signal::new(),
            cancelled: Signal::new(),
            resolved: Signal::new(),
            rejected: Signal::new(),
            destroyed: Signal::new(),
            bound: Signal::new(),
            updated: Signal::new(),
            bin: SubscriptionBin::new(),
            context_bin: SubscriptionBin::new(),
        }
    }

    pub fn context(&self) -> Option<Rc<ContextInner>> {
        self.context.borrow().upgrade()
    }

    /// The single activation transition. Fires `triggered` or `released`
    /// unless suppressed.
    pub fn set_triggered(&self, value: bool, suppress: bool, data: TriggerData) {
        self.active.set(value);

        if suppress {
            return;
        }

        let processed = self.context().and_then(|ctx| ctx.options.process);
        if value {
            self.triggered.fire(&TriggerPayload { processed, data });
        } else {
            self.released.fire(&processed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_triggered_fires_matching_signal() {
        let core = ActionCore::new(vec![InputId(1)]);
        let log = Rc::new(RefCell::new(Vec::new()));

        let t = {
            let log = Rc::clone(&log);
            core.triggered.connect(move |_| log.borrow_mut().push("trigger"))
        };
        let r = {
            let log = Rc::clone(&log);
            core.released.connect(move |_| log.borrow_mut().push("release"))
        };

        core.set_triggered(true, false, TriggerData::None);
        core.set_triggered(false, false, TriggerData::None);
        core.set_triggered(true, true, TriggerData::None);

        assert!(core.active.get());
        assert_eq!(&*log.borrow(), &["trigger", "release"]);
        drop((t, r));
    }
}
