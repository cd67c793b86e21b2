//! Event routing from the dispatcher's raw stream into leaf actions.
//!
//! Each leaf (simple or axis) gets one filtered subscription on the
//! dispatcher's event signal: id must match, and the event's processed flag
//! must pass the dispatcher's configured gate unless the id is explicitly
//! allow-listed past it.

use std::rc::Rc;

use crate::action::{axis, simple, ActionInner};
use crate::dispatch::context::ContextInner;
use crate::input::{InputEvent, InputId, InputPhase};

#[derive(Clone, Copy)]
pub(crate) enum RouteMode {
    Discrete,
    Axis,
}

pub(crate) fn connect(
    ctx: &Rc<ContextInner>,
    inner: &Rc<ActionInner>,
    raw: InputId,
    mode: RouteMode,
) {
    let gate = ctx.options.process;
    let allowed_past_gate = ctx.options.process_allow_list.contains(&raw);
    let weak = Rc::downgrade(inner);

    let sub = ctx.events.connect(move |event: &InputEvent| {
        if event.id != raw {
            return;
        }
        if let Some(expected) = gate {
            if !allowed_past_gate && event.processed != expected {
                return;
            }
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match (mode, event.phase) {
            (RouteMode::Discrete, InputPhase::Began) => simple::on_began(&inner, event.processed),
            (RouteMode::Discrete, InputPhase::Ended) => simple::on_ended(&inner, event.processed),
            (RouteMode::Axis, InputPhase::Changed(payload)) => axis::on_changed(&inner, payload),
            _ => {}
        }
    });
    inner.core.context_bin.add(sub);
}
