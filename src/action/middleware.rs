//! Predicate-gated wrapper.
//!
//! Every delegate trigger is put to the predicate; a `false` verdict drops
//! the trigger without any state change. Async predicates defer the verdict
//! into the dispatcher's work list, so the wrapper activates during a later
//! flush rather than mid-notification.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::member::{adopt, Member};
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;

/// Gate applied to each delegate trigger.
#[derive(Clone)]
pub enum Predicate {
    Sync(Rc<dyn Fn(&Action) -> bool>),
    Async(Rc<dyn Fn(&Action) -> LocalBoxFuture<'static, bool>>),
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Predicate::Sync"),
            Self::Async(_) => f.write_str("Predicate::Async"),
        }
    }
}

pub(crate) struct MiddlewareState {
    pub delegate: Member,
    pub predicate: Predicate,
}

pub(crate) fn new(binding: Binding, predicate: Predicate) -> Action {
    let delegate = adopt(binding);
    let content = delegate.action.content();
    Action::from_parts(
        Kind::Middleware(MiddlewareState {
            delegate,
            predicate,
        }),
        content,
    )
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let Kind::Middleware(state) = &inner.kind else {
        return;
    };

    state.delegate.action.set_context(ctx);

    let weak = Rc::downgrade(inner);
    let weak_ctx = Rc::downgrade(ctx);
    let predicate = state.predicate.clone();
    let sub = state.delegate.action.inner.core.triggered.connect(move |payload| {
        let Some(parent) = weak.upgrade() else {
            return;
        };
        match &predicate {
            Predicate::Sync(check) => {
                if check(&Action::from_inner(Rc::clone(&parent))) {
                    parent.core.set_triggered(true, false, payload.data.clone());
                }
                parent.core.changed.fire(&());
            }
            Predicate::Async(check) => {
                let Some(ctx) = weak_ctx.upgrade() else {
                    return;
                };
                let verdict = check(&Action::from_inner(Rc::clone(&parent)));
                let weak = Rc::downgrade(&parent);
                let data = payload.data.clone();
                ctx.defer_future(
                    async move {
                        if verdict.await {
                            if let Some(parent) = weak.upgrade() {
                                parent.core.set_triggered(true, false, data);
                                parent.core.changed.fire(&());
                            }
                        }
                    }
                    .boxed_local(),
                );
            }
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
