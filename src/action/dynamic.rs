//! Wrapper whose delegate can be swapped at runtime.
//!
//! Rebinding is atomic from the outside: the old delegate is disconnected
//! before the new one is connected, content is recomputed, and `updated`
//! fires last. A delegate the wrapper promoted itself is destroyed on swap;
//! a caller-supplied action is only detached.

use std::cell::RefCell;
use std::rc::Rc;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::member::{adopt, Member};
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;
use crate::error::{ActionError, Result};
use crate::signal::SubscriptionBin;

pub(crate) struct DynamicState {
    pub delegate: RefCell<Member>,
    /// Wrapper-side subscriptions onto the current delegate, dropped as a
    /// unit on every swap.
    pub delegate_subs: SubscriptionBin,
}

pub(crate) fn new(initial: Binding) -> Action {
    let member = adopt(initial);
    let content = member.action.content();
    Action::from_parts(
        Kind::Dynamic(DynamicState {
            delegate: RefCell::new(member),
            delegate_subs: SubscriptionBin::new(),
        }),
        content,
    )
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    connect_current(inner, ctx);
}

pub(crate) fn update(action: &Action, binding: Binding) -> Result<()> {
    let Kind::Dynamic(state) = &action.inner.kind else {
        return Err(ActionError::invalid_binding("update on a non-dynamic action"));
    };
    binding.validate()?;
    let ctx = action
        .inner
        .core
        .context()
        .ok_or(ActionError::UnboundUpdate)?;

    state.delegate_subs.clear();
    let old = std::mem::replace(&mut *state.delegate.borrow_mut(), adopt(binding));
    if old.owned {
        old.action.destroy();
    } else {
        old.action.clear_context();
    }

    let content = state.delegate.borrow().action.content();
    *action.inner.core.content.borrow_mut() = content;

    connect_current(&action.inner, &ctx);
    action.inner.core.updated.fire(&());
    Ok(())
}

fn connect_current(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let Kind::Dynamic(state) = &inner.kind else {
        return;
    };
    state.delegate_subs.clear();

    let delegate = state.delegate.borrow();
    delegate.action.set_context(ctx);

    let weak = Rc::downgrade(inner);
    state
        .delegate_subs
        .add(delegate.action.inner.core.triggered.connect(move |payload| {
            if let Some(parent) = weak.upgrade() {
                parent.core.set_triggered(true, false, payload.data.clone());
                parent.core.changed.fire(&());
            }
        }));

    let weak = Rc::downgrade(inner);
    state
        .delegate_subs
        .add(delegate.action.inner.core.released.connect(move |_| {
            if let Some(parent) = weak.upgrade() {
                if parent.core.active.get() {
                    parent.core.set_triggered(false, false, TriggerData::None);
                }
                parent.core.changed.fire(&());
            }
        }));

    let weak = Rc::downgrade(inner);
    state
        .delegate_subs
        .add(delegate.action.inner.core.cancelled.connect(move |_| {
            if let Some(parent) = weak.upgrade() {
                parent.core.cancelled.fire(&());
            }
        }));
}
