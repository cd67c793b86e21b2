//! Order-sensitive combinator.
//!
//! The sequence triggers only when its required members activate in
//! declaration order. Progress is kept as the list of member indices in
//! activation order and must always equal a prefix of the required order;
//! an out-of-order press poisons the attempt until everything resets.
//! Abandoning a genuine partial prefix fires `cancelled`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::member::{adopt, Member};
use crate::action::{Action, ActionInner, Kind};
use crate::dispatch::context::ContextInner;
use crate::input::InputId;

pub(crate) struct SequenceState {
    pub members: Vec<Member>,
    /// Member indices in the order they must activate. Ghost members are
    /// excluded.
    pub required: Vec<usize>,
    /// Member indices in actual activation order.
    pub progress: RefCell<Vec<usize>>,
    /// Which members are currently down, so releases of never-counted
    /// members don't disturb progress.
    pub began: RefCell<Vec<bool>>,
    /// Armed while a genuine partial prefix exists; consumed into a
    /// `cancelled` fire when that prefix is abandoned.
    pub can_cancel: Cell<bool>,
    /// Set when the latest change was a progress extension, so evaluation
    /// only arms cancellation for real advances.
    pub extended: Cell<bool>,
}

pub(crate) fn new(bindings: Vec<Binding>) -> Action {
    let members: Vec<Member> = bindings.into_iter().map(adopt).collect();
    let required = members
        .iter()
        .enumerate()
        .filter(|(_, member)| !member.optional)
        .map(|(index, _)| index)
        .collect();
    let began = vec![false; members.len()];
    let content: Vec<InputId> = members
        .iter()
        .flat_map(|member| member.action.content())
        .collect();

    let action = Action::from_parts(
        Kind::Sequence(SequenceState {
            members,
            required,
            progress: RefCell::new(Vec::new()),
            began: RefCell::new(began),
            can_cancel: Cell::new(false),
            extended: Cell::new(false),
        }),
        content,
    );

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
    let Kind::Sequence(state) = &inner.kind else {
        return;
    };

    let (prefix_ok, full) = {
        let progress = state.progress.borrow();
        let prefix_ok = !progress.is_empty()
            && progress.len() <= state.required.len()
            && progress
                .iter()
                .zip(state.required.iter())
                .all(|(got, want)| got == want);
        (prefix_ok, prefix_ok && progress.len() == state.required.len())
    };

    if state.extended.replace(false) && prefix_ok && !full {
        state.can_cancel.set(true);
    }

    if full {
        state.can_cancel.set(false);
        if !inner.core.active.get() {
            inner.core.set_triggered(true, false, TriggerData::None);
        }
        return;
    }

    if inner.core.active.get() {
        state.can_cancel.set(false);
        inner.core.set_triggered(false, false, TriggerData::None);
    }
}

pub(crate) fn wire(inner: &Rc<ActionInner>, ctx: &Rc<ContextInner>) {
    let Kind::Sequence(state) = &inner.kind else {
        return;
    };

    for (index, member) in state.members.iter().enumerate() {
        member.action.set_context(ctx);
        let counted = !member.optional;

        let weak = Rc::downgrade(inner);
        let sub = member.action.inner.core.triggered.connect(move |_| {
            let Some(parent) = weak.upgrade() else {
                return;
            };
            let Kind::Sequence(state) = &parent.kind else {
                return;
            };
            if counted {
                state.progress.borrow_mut().push(index);
                state.extended.set(true);
            }
            if let Some(slot) = state.began.borrow_mut().get_mut(index) {
                *slot = true;
            }
            parent.core.changed.fire(&());
        });
        inner.core.context_bin.add(sub);

        let weak = Rc::downgrade(inner);
        let sub = member.action.inner.core.released.connect(move |_| {
            let Some(parent) = weak.upgrade() else {
                return;
            };
            let Kind::Sequence(state) = &parent.kind else {
                return;
            };
            let was_down = {
                let mut began = state.began.borrow_mut();
                began.get_mut(index).map_or(false, |slot| std::mem::replace(slot, false))
            };
            if was_down {
                let mut progress = state.progress.borrow_mut();
                if let Some(pos) = progress.iter().position(|&i| i == index) {
                    progress.remove(pos);
                }
            }
            if state.can_cancel.replace(false) {
                parent.core.cancelled.fire(&());
            }
            parent.core.changed.fire(&());
        });
        inner.core.context_bin.add(sub);
    }
}
