//! Single-flight execution queue.
//!
//! Listeners run strictly one at a time in FIFO order. An entry waiting
//! behind another is cancellable: if its action releases, cancels, or is
//! destroyed before its turn, the entry is removed and `rejected` fires.
//! Once a listener starts it always runs to completion.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::action::{Action, ActionInner};
use crate::error::{ActionError, Result};
use crate::signal::{Signal, Subscription};

/// A bound listener, re-invocable once per trigger.
pub(crate) type Listener = Box<dyn FnMut() -> LocalBoxFuture<'static, anyhow::Result<()>>>;
pub(crate) type SharedListener = Rc<RefCell<Listener>>;

struct QueueEntry {
    action: Action,
    listener: SharedListener,
    executing: Cell<bool>,
    /// Cancellation guards, armed only for entries that queued up behind
    /// another and dropped once execution starts.
    guards: RefCell<Vec<Subscription>>,
}

pub(crate) struct ExecutionQueue {
    entries: RefCell<VecDeque<QueueEntry>>,
}

impl ExecutionQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            entries: RefCell::new(VecDeque::new()),
        })
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.entries.borrow().iter().any(|entry| entry.action == *action)
    }

    pub fn add(self: &Rc<Self>, action: &Action, listener: SharedListener) {
        if self.contains(action) {
            return;
        }

        let entry = QueueEntry {
            action: action.clone(),
            listener,
            executing: Cell::new(false),
            guards: RefCell::new(Vec::new()),
        };

        if !self.entries.borrow().is_empty() {
            let mut guards = entry.guards.borrow_mut();
            guards.push(self.guard(action, &action.inner.core.released));
            guards.push(self.guard(action, &action.inner.core.cancelled));
            guards.push(self.guard(action, &action.inner.core.destroyed));
        }

        self.entries.borrow_mut().push_back(entry);
    }

    fn guard<T: 'static>(self: &Rc<Self>, action: &Action, signal: &Signal<T>) -> Subscription {
        let weak_queue = Rc::downgrade(self);
        let weak_action = action.weak();
        signal.connect(move |_| {
            let (Some(queue), Some(inner)) = (weak_queue.upgrade(), weak_action.upgrade()) else {
                return;
            };
            queue.reject(&inner);
        })
    }

    fn reject(&self, inner: &Rc<ActionInner>) {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            let position = entries
                .iter()
                .position(|entry| Rc::ptr_eq(&entry.action.inner, inner) && !entry.executing.get());
            position.and_then(|index| entries.remove(index))
        };
        if let Some(entry) = removed {
            entry.guards.borrow_mut().clear();
            entry.action.inner.core.rejected.fire(&());
        }
    }

    /// Execute queued listeners in order until the queue drains. Concurrent
    /// callers back off while another caller owns the head entry. The first
    /// listener error is returned after the queue finishes draining.
    pub async fn run(&self) -> Result<()> {
        let mut first_err: Option<ActionError> = None;

        loop {
            let next = {
                let entries = self.entries.borrow();
                match entries.front() {
                    None => None,
                    Some(entry) if entry.executing.get() => None,
                    Some(entry) => {
                        entry.executing.set(true);
                        entry.guards.borrow_mut().clear();
                        Some((entry.action.clone(), Rc::clone(&entry.listener)))
                    }
                }
            };
            let Some((action, listener)) = next else {
                break;
            };

            let invocation = (listener.borrow_mut())();
            let result = invocation.await;

            {
                let mut entries = self.entries.borrow_mut();
                if let Some(index) = entries.iter().position(|entry| entry.action == action) {
                    entries.remove(index);
                }
            }

            match result {
                Ok(()) => action.inner.core.resolved.fire(&()),
                Err(err) => {
                    first_err.get_or_insert(ActionError::listener(err));
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
