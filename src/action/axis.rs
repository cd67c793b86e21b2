//! Continuous-input actions.
//!
//! An axis action pulses once per sample: the trigger carries the payload
//! and the matching release is suppressed, so listeners see a stream of
//! triggers without interleaved release noise.

use std::rc::Rc;

use crate::action::core::TriggerData;
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;
use crate::input::event::AxisPayload;
use crate::input::InputId;
use crate::router::{self, RouteMode};

pub(crate) struct AxisState {
    pub raw: InputId,
}

pub(crate) fn new(raw: InputId) -> Action {
    Action::from_parts(Kind::Axis(AxisState { raw }), vec![raw])
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let Kind::Axis(state) = &inner.kind else {
        return;
    };
    router::connect(ctx, inner, state.raw, RouteMode::Axis);
}

pub(crate) fn on_changed(inner: &Rc<ActionInner>, payload: AxisPayload) {
    inner.core.set_triggered(true, false, TriggerData::Axis(payload));
    inner.core.set_triggered(false, true, TriggerData::None);
    inner.core.changed.fire(&());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::action::TriggerPayload;
    use crate::input::DeviceClass;

    #[test]
    fn pulse_carries_payload_and_suppresses_release() {
        let action = Action::axis(InputId(5));
        let seen: Rc<RefCell<Vec<TriggerPayload>>> = Rc::new(RefCell::new(Vec::new()));
        let releases = Rc::new(std::cell::Cell::new(0));

        let t = {
            let seen = Rc::clone(&seen);
            action.on_triggered(move |payload| seen.borrow_mut().push(payload.clone()))
        };
        let r = {
            let releases = Rc::clone(&releases);
            action.on_released(move |_| releases.set(releases.get() + 1))
        };

        let sample = AxisPayload::new([0.5, -0.25], [0.1, 0.0], DeviceClass::Gamepad);
        on_changed(&action.inner, sample);
        on_changed(&action.inner, sample);

        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(releases.get(), 0);
        assert!(!action.is_active());
        drop((t, r));
    }
}
