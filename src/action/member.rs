//! Adoption of bindings into combinator membership.

use std::cell::RefCell;

use crate::action::binding::Binding;
use crate::action::core::TriggerData;
use crate::action::{Action, ActionKind};

/// One child of a combinator, with the adoption metadata the parent needs
/// for teardown and evaluation.
pub(crate) struct Member {
    pub action: Action,
    /// Ghost members never gate their parent's completion.
    pub optional: bool,
    /// Promoted from a raw id at adoption time; destroyed with the parent.
    /// Caller-supplied actions are detached instead.
    pub owned: bool,
}

/// Promote a binding into a member action. Caller-supplied actions are
/// locked so the dispatcher never stages them on their own.
pub(crate) fn adopt(binding: Binding) -> Member {
    match binding {
        Binding::Raw(id) => Member {
            action: Action::simple(id),
            optional: false,
            owned: true,
        },
        Binding::Action(action) => {
            action.lock();
            let optional = action.kind() == ActionKind::Optional;
            Member {
                action,
                optional,
                owned: false,
            }
        }
        Binding::Many(items) => Member {
            action: Action::union(items),
            optional: false,
            owned: true,
        },
    }
}

/// Shared state for the pressed-set combinators (composite, union, unique).
pub(crate) struct GroupState {
    pub members: Vec<Member>,
    pub pressed: RefCell<Vec<bool>>,
    /// Payload of the most recent member trigger, forwarded when the group
    /// itself triggers.
    pub last: RefCell<TriggerData>,
}

impl GroupState {
    pub fn new(bindings: Vec<Binding>, start_pressed: impl Fn(&Member) -> bool) -> Self {
        let members: Vec<Member> = bindings.into_iter().map(adopt).collect();
        let pressed = members.iter().map(start_pressed).collect();
        Self {
            members,
            pressed: RefCell::new(pressed),
            last: RefCell::new(TriggerData::None),
        }
    }

    pub fn content(&self) -> Vec<crate::input::InputId> {
        self.members
            .iter()
            .flat_map(|member| member.action.content())
            .collect()
    }
}

/// State for the single-delegate wrappers (optional, synchronous).
pub(crate) struct WrapState {
    pub delegate: Member,
}

impl WrapState {
    pub fn new(binding: Binding) -> Self {
        Self {
            delegate: adopt(binding),
        }
    }
}
