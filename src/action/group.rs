//! The pressed-set combinators: composite (all), union (any), unique
//! (exactly one).
//!
//! All three track a per-member pressed flag and re-evaluate on every child
//! transition. Only the evaluation differs; wiring and teardown are shared.

use std::rc::Rc;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::member::GroupState;
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;

pub(crate) fn composite(members: Vec<Binding>) -> Action {
    // Ghost members start pressed so they never hold completion back.
    build(Kind::Composite(GroupState::new(members, |m| m.optional)))
}

pub(crate) fn union(members: Vec<Binding>) -> Action {
    build(Kind::Union(GroupState::new(members, |_| false)))
}

pub(crate) fn unique(members: Vec<Binding>) -> Action {
    build(Kind::Unique(GroupState::new(members, |_| false)))
}

fn build(kind: Kind) -> Action {
    let content = match &kind {
        Kind::Composite(state) | Kind::Union(state) | Kind::Unique(state) => state.content(),
        _ => Vec::new(),
    };
    let action = Action::from_parts(kind, content);

    let weak = action.weak();
    let sub = action.inner.core.changed.connect(move |_| {
        if let Some(inner) = weak.upgrade() {
            evaluate(&inner);
        }
    });
    action.inner.core.bin.add(sub);
    action
}

fn evaluate(inner: &Rc<ActionInner>) {
    let active = inner.core.active.get();
    let (state, holds) = match &inner.kind {
        Kind::Composite(state) => (state, state.pressed.borrow().iter().all(|p| *p)),
        Kind::Union(state) => (state, state.pressed.borrow().iter().any(|p| *p)),
        Kind::Unique(state) => {
            let pressed = state.pressed.borrow();
            let exclusive = state
                .members
                .iter()
                .zip(pressed.iter())
                .filter(|(member, down)| !member.optional && **down)
                .count()
                == 1;
            drop(pressed);
            (state, exclusive)
        }
        _ => return,
    };

    if holds && !active {
        // Forward the payload of whichever member completed the group.
        let data = state.last.borrow().clone();
        inner.core.set_triggered(true, false, data);
    } else if !holds && active {
        inner.core.set_triggered(false, false, TriggerData::None);
    }
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let (state, is_unique, is_composite) = match &inner.kind {
        Kind::Composite(state) => (state, false, true),
        Kind::Union(state) => (state, false, false),
        Kind::Unique(state) => (state, true, false),
        _ => return,
    };

    for (index, member) in state.members.iter().enumerate() {
        member.action.set_context(ctx);

        if member.optional && (is_unique || is_composite) {
            // Ghosts never gate completion and never touch the pressed set.
            // A unique forwards their triggers unconditionally; a composite
            // only re-triggers a chord that is already complete.
            let weak = Rc::downgrade(inner);
            let only_while_active = is_composite;
            let sub = member.action.inner.core.triggered.connect(move |payload| {
                if let Some(parent) = weak.upgrade() {
                    if !only_while_active || parent.core.active.get() {
                        parent.core.triggered.fire(payload);
                    }
                }
            });
            inner.core.context_bin.add(sub);

            let weak = Rc::downgrade(inner);
            let sub = member.action.inner.core.released.connect(move |_| {
                if let Some(parent) = weak.upgrade() {
                    parent.core.changed.fire(&());
                }
            });
            inner.core.context_bin.add(sub);
            continue;
        }

        let weak = Rc::downgrade(inner);
        let sub = member.action.inner.core.triggered.connect(move |payload| {
            let Some(parent) = weak.upgrade() else {
                return;
            };
            if let Kind::Composite(state) | Kind::Union(state) | Kind::Unique(state) =
                &parent.kind
            {
                *state.last.borrow_mut() = payload.data.clone();
            }
            set_pressed(&parent, index, true);
            parent.core.changed.fire(&());
        });
        inner.core.context_bin.add(sub);

        let weak = Rc::downgrade(inner);
        let sub = member.action.inner.core.released.connect(move |_| {
            let Some(parent) = weak.upgrade() else {
                return;
            };
            set_pressed(&parent, index, false);
            parent.core.changed.fire(&());
        });
        inner.core.context_bin.add(sub);
    }
}

fn set_pressed(inner: &Rc<ActionInner>, index: usize, value: bool) {
    let state = match &inner.kind {
        Kind::Composite(state) | Kind::Union(state) | Kind::Unique(state) => state,
        _ => return,
    };
    if let Some(slot) = state.pressed.borrow_mut().get_mut(index) {
        *slot = value;
    }
}
