//! Binding shapes accepted anywhere an action can appear.
//!
//! Raw ids and vectors of bindings are promoted to concrete actions at bind
//! or adoption time, so combinators and the dispatcher only ever operate on
//! [`Action`] values internally.

use crate::action::Action;
use crate::error::{ActionError, Result};
use crate::input::InputId;

/// Anything that can be bound: a raw input, a full action, or a list that
/// gets promoted to a union.
#[derive(Clone)]
pub enum Binding {
    Raw(InputId),
    Action(Action),
    Many(Vec<Binding>),
}

impl Binding {
    /// Reject shapes that cannot produce a working action.
    pub fn validate(&self) -> Result<()> {
        match self {
            Binding::Raw(_) => Ok(()),
            Binding::Action(action) => {
                if action.is_destroyed() {
                    return Err(ActionError::invalid_binding("action has been destroyed"));
                }
                Ok(())
            }
            Binding::Many(items) => {
                if items.is_empty() {
                    return Err(ActionError::invalid_binding("empty binding list"));
                }
                items.iter().try_for_each(Binding::validate)
            }
        }
    }

    /// Flattened raw-input content of this binding.
    pub(crate) fn content(&self) -> Vec<InputId> {
        match self {
            Binding::Raw(id) => vec![*id],
            Binding::Action(action) => action.content(),
            Binding::Many(items) => items.iter().flat_map(Binding::content).collect(),
        }
    }

    /// Lookup key for bindings registered by raw shape rather than by action
    /// identity. `None` for action bindings.
    pub(crate) fn raw_key(&self) -> Option<RawKey> {
        match self {
            Binding::Raw(id) => Some(RawKey::Single(*id)),
            Binding::Action(_) => None,
            Binding::Many(_) => Some(RawKey::Many(self.content())),
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Binding::Raw(id) => write!(f, "Raw({id})"),
            Binding::Action(action) => action.fmt(f),
            Binding::Many(items) => f.debug_list().entries(items).finish(),
        }
    }
}

/// Identity of a raw-shape binding inside a dispatcher's table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum RawKey {
    Single(InputId),
    Many(Vec<InputId>),
}

impl From<InputId> for Binding {
    fn from(id: InputId) -> Self {
        Binding::Raw(id)
    }
}

impl From<Action> for Binding {
    fn from(action: Action) -> Self {
        Binding::Action(action)
    }
}

impl From<&Action> for Binding {
    fn from(action: &Action) -> Self {
        Binding::Action(action.clone())
    }
}

impl From<Vec<Binding>> for Binding {
    fn from(items: Vec<Binding>) -> Self {
        Binding::Many(items)
    }
}

impl From<Vec<InputId>> for Binding {
    fn from(ids: Vec<InputId>) -> Self {
        Binding::Many(ids.into_iter().map(Binding::Raw).collect())
    }
}

impl<const N: usize> From<[InputId; N]> for Binding {
    fn from(ids: [InputId; N]) -> Self {
        Binding::Many(ids.into_iter().map(Binding::Raw).collect())
    }
}
