//! Discrete single-input actions, including multi-tap.
//!
//! A simple action with `repeat == 1` triggers on press and releases on
//! release. With `repeat > 1` it counts presses: each press must land within
//! the tap window of the previous one, and the window expiring with a partial
//! count fires `cancelled` and resets.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;

use crate::action::core::TriggerData;
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;
use crate::input::InputId;
use crate::router::{self, RouteMode};

pub(crate) const DEFAULT_TAP_WINDOW: Duration = Duration::from_millis(300);

pub(crate) struct SimpleState {
    pub raw: InputId,
    pub repeat: u32,
    pub window: Duration,
    pub taps: Cell<u32>,
    pub deadline: Cell<Option<Instant>>,
}

pub(crate) fn new(raw: InputId, repeat: u32, window: Duration) -> Action {
    Action::from_parts(
        Kind::Simple(SimpleState {
            raw,
            repeat,
            window,
            taps: Cell::new(0),
            deadline: Cell::new(None),
        }),
        vec![raw],
    )
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let Kind::Simple(state) = &inner.kind else {
        return;
    };
    router::connect(ctx, inner, state.raw, RouteMode::Discrete);
}

pub(crate) fn on_began(inner: &Rc<ActionInner>, _processed: bool) {
    let Kind::Simple(state) = &inner.kind else {
        return;
    };

    let taps = state.taps.get() + 1;
    state.taps.set(taps);

    if taps >= state.repeat {
        state.taps.set(0);
        state.deadline.set(None);
        inner.core.set_triggered(true, false, TriggerData::None);
    } else {
        let at = Instant::now() + state.window;
        state.deadline.set(Some(at));
        if let Some(ctx) = inner.core.context() {
            ctx.schedule(at, Rc::downgrade(inner));
        }
    }
    inner.core.changed.fire(&());
}

pub(crate) fn on_ended(inner: &Rc<ActionInner>, processed: bool) {
    let Kind::Simple(state) = &inner.kind else {
        return;
    };

    if inner.core.active.get() {
        inner.core.set_triggered(false, false, TriggerData::None);
    } else if state.repeat == 1 {
        // Not active (e.g. the press was swallowed upstream) but observers
        // still learn the key went up.
        inner.core.released.fire(&Some(processed));
    }
    inner.core.changed.fire(&());
}

/// Tap-window expiry, driven by the dispatcher's timer wheel. A stale
/// deadline (the press count advanced and re-armed since) is ignored.
pub(crate) fn on_deadline(inner: &Rc<ActionInner>, at: Instant) {
    let Kind::Simple(state) = &inner.kind else {
        return;
    };
    if state.deadline.get() != Some(at) {
        return;
    }
    state.deadline.set(None);

    if state.taps.get() > 0 {
        state.taps.set(0);
        inner.core.cancelled.fire(&());
        inner.core.set_triggered(false, false, TriggerData::None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_trigger_with_single_repeat() {
        let action = Action::simple(InputId(1));
        let fired = Rc::new(Cell::new(false));
        let sub = {
            let fired = Rc::clone(&fired);
            action.on_triggered(move |_| fired.set(true))
        };

        on_began(&action.inner, false);
        assert!(action.is_active());
        assert!(fired.get());

        on_ended(&action.inner, false);
        assert!(!action.is_active());
        drop(sub);
    }

    #[test]
    fn partial_tap_count_waits_for_more_presses() {
        let action = Action::tap(InputId(1), 3, Duration::from_millis(250));

        on_began(&action.inner, false);
        on_ended(&action.inner, false);
        on_began(&action.inner, false);
        on_ended(&action.inner, false);
        assert!(!action.is_active());

        on_began(&action.inner, false);
        assert!(action.is_active());
    }
}
