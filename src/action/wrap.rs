//! Single-delegate wrappers: optional (ghost) and synchronous.
//!
//! Both mirror the delegate's activation one-to-one. The difference is in
//! how the rest of the system reads the tag: a parent combinator treats an
//! optional child as non-gating, and the dispatcher runs a synchronous
//! action's listener inline instead of queueing it.

use std::rc::Rc;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::member::WrapState;
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;

pub(crate) fn optional(binding: Binding) -> Action {
    let state = WrapState::new(binding);
    let content = state.delegate.action.content();
    Action::from_parts(Kind::Optional(state), content)
}

pub(crate) fn synchronous(binding: Binding) -> Action {
    let state = WrapState::new(binding);
    let content = state.delegate.action.content();
    Action::from_parts(Kind::Synchronous(state), content)
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let state = match &inner.kind {
        Kind::Optional(state) | Kind::Synchronous(state) => state,
        _ => return,
    };

    state.delegate.action.set_context(ctx);

    let weak = Rc::downgrade(inner);
    let sub = state.delegate.action.inner.core.triggered.connect(move |payload| {
        if let Some(parent) = weak.upgrade() {
            parent.core.set_triggered(true, false, payload.data.clone());
            parent.core.changed.fire(&());
        }
    });
    inner.core.context_bin.add(sub);

    let weak = Rc::downgrade(inner);
    let sub = state.delegate.action.inner.core.released.connect(move |_| {
        if let Some(parent) = weak.upgrade() {
            if parent.core.active.get() {
                parent.core.set_triggered(false, false, TriggerData::None);
            }
            parent.core.changed.fire(&());
        }
    });
    inner.core.context_bin.add(sub);
}
