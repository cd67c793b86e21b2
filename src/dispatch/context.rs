//! The dispatcher: binding tables, trigger batching, arbitration, and the
//! event loop.
//!
//! Raw events enter through [`Context::dispatch`] and fan out to leaf
//! actions synchronously; trigger notifications collect into a pending
//! batch instead of running listeners inline. [`Context::flush`] then gates,
//! arbitrates, and routes exactly one winner per batch into the execution
//! queue. [`Context::drive`] wraps dispatch-then-flush around an
//! [`InputSource`] and the tap-window timer wheel.

use std::cell::{Cell, RefCell};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::rc::{Rc, Weak};

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tokio::time::Instant;

use crate::action::binding::RawKey;
use crate::action::{simple, Action, ActionInner, ActionKind, Binding};
use crate::dispatch::options::ContextOptions;
use crate::dispatch::queue::{ExecutionQueue, Listener, SharedListener};
use crate::error::{ActionError, Result};
use crate::input::{InputEvent, InputId, InputPhase, InputSource};
use crate::signal::Signal;

/// Work produced during dispatch but run during flush.
pub(crate) enum Deferred {
    Call(Box<dyn FnOnce()>),
    Future(LocalBoxFuture<'static, ()>),
}

/// One armed tap-window expiry. Ordered by time, ties by arming order.
struct Deadline {
    at: Instant,
    seq: u64,
    target: Weak<ActionInner>,
}

impl PartialEq for Deadline {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Deadline {}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

struct BoundAction {
    action: Action,
    listener: SharedListener,
}

struct PendingTrigger {
    action: Action,
    listener: SharedListener,
}

pub(crate) struct ContextInner {
    pub options: ContextOptions,
    pub events: Signal<InputEvent>,
    pub held: RefCell<HashSet<InputId>>,
    bindings: RefCell<HashMap<usize, BoundAction>>,
    raw_bindings: RefCell<HashMap<RawKey, Action>>,
    pending: RefCell<Vec<PendingTrigger>>,
    deferred: RefCell<Vec<Deferred>>,
    deadlines: RefCell<BinaryHeap<Reverse<Deadline>>>,
    deadline_seq: Cell<u64>,
    queue: Rc<ExecutionQueue>,
}

impl ContextInner {
    pub(crate) fn defer_call(&self, call: Box<dyn FnOnce()>) {
        self.deferred.borrow_mut().push(Deferred::Call(call));
    }

    pub(crate) fn defer_future(&self, future: LocalBoxFuture<'static, ()>) {
        self.deferred.borrow_mut().push(Deferred::Future(future));
    }

    /// Arm a tap-window expiry for a simple action.
    pub(crate) fn schedule(&self, at: Instant, target: Weak<ActionInner>) {
        let seq = self.deadline_seq.get();
        self.deadline_seq.set(seq + 1);
        self.deadlines
            .borrow_mut()
            .push(Reverse(Deadline { at, seq, target }));
    }

    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.borrow().peek().map(|Reverse(head)| head.at)
    }

    fn take_due(&self, now: Instant) -> Vec<(Rc<ActionInner>, Instant)> {
        let mut due = Vec::new();
        let mut heap = self.deadlines.borrow_mut();
        while heap.peek().is_some_and(|Reverse(head)| head.at <= now) {
            if let Some(Reverse(deadline)) = heap.pop() {
                if let Some(target) = deadline.target.upgrade() {
                    due.push((target, deadline.at));
                }
            }
        }
        due
    }

    /// Stage a trigger for arbitration. Locked (combinator-adopted) actions
    /// and actions whose binding disappeared are ignored.
    fn stage(&self, action: Action) {
        if action.inner.core.locked.get() {
            return;
        }
        let listener = self
            .bindings
            .borrow()
            .get(&action.id())
            .map(|bound| Rc::clone(&bound.listener));
        if let Some(listener) = listener {
            self.pending
                .borrow_mut()
                .push(PendingTrigger { action, listener });
        }
    }

    /// Drop every table entry for a destroyed action.
    pub(crate) fn forget(&self, action: &Action) {
        self.bindings.borrow_mut().remove(&action.id());
        self.raw_bindings
            .borrow_mut()
            .retain(|_, bound| bound != action);
    }
}

/// An input dispatcher. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Context {
    inner: Rc<ContextInner>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ContextOptions::default())
    }
}

impl Context {
    pub fn new(options: ContextOptions) -> Self {
        Self {
            inner: Rc::new(ContextInner {
                options,
                events: Signal::new(),
                held: RefCell::new(HashSet::new()),
                bindings: RefCell::new(HashMap::new()),
                raw_bindings: RefCell::new(HashMap::new()),
                pending: RefCell::new(Vec::new()),
                deferred: RefCell::new(Vec::new()),
                deadlines: RefCell::new(BinaryHeap::new()),
                deadline_seq: Cell::new(0),
                queue: ExecutionQueue::new(),
            }),
        }
    }

    /// Register a binding with its listener. Raw shapes are promoted (a bare
    /// id to a simple action, a list to a union); re-registering an already
    /// bound shape keeps the existing action, and re-binding the same action
    /// just swaps the listener.
    pub fn bind<B, F, Fut>(&self, binding: B, listener: F) -> Result<&Self>
    where
        B: Into<Binding>,
        F: FnMut() -> Fut + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + 'static,
    {
        let binding = binding.into();
        binding.validate()?;

        let mut listener = listener;
        let boxed: Listener = Box::new(move || listener().boxed_local());
        let listener: SharedListener = Rc::new(RefCell::new(boxed));

        match binding {
            Binding::Action(action) => {
                self.attach(action, listener);
            }
            other => {
                let Some(key) = other.raw_key() else {
                    return Ok(self);
                };
                if self.inner.raw_bindings.borrow().contains_key(&key) {
                    log::debug!("{key:?} already bound; keeping the existing action");
                    return Ok(self);
                }
                let action = match other {
                    Binding::Raw(id) => Action::simple(id),
                    Binding::Many(items) => Action::union(items),
                    Binding::Action(action) => action,
                };
                self.inner
                    .raw_bindings
                    .borrow_mut()
                    .insert(key, action.clone());
                self.attach(action, listener);
            }
        }
        Ok(self)
    }

    fn attach(&self, action: Action, listener: SharedListener) {
        let id = action.id();
        {
            let mut bindings = self.inner.bindings.borrow_mut();
            if let Some(existing) = bindings.get_mut(&id) {
                existing.listener = listener;
                return;
            }
            bindings.insert(
                id,
                BoundAction {
                    action: action.clone(),
                    listener,
                },
            );
        }

        action.set_context(&self.inner);

        let weak_ctx = Rc::downgrade(&self.inner);
        let weak_action = action.weak();
        let sub = action.inner.core.triggered.connect(move |_| {
            let (Some(ctx), Some(inner)) = (weak_ctx.upgrade(), weak_action.upgrade()) else {
                return;
            };
            ctx.stage(Action::from_inner(inner));
        });
        action.inner.core.context_bin.add(sub);
    }

    /// Remove a binding and destroy its action. Unknown bindings only log.
    pub fn unbind<B: Into<Binding>>(&self, binding: B) -> &Self {
        let binding = binding.into();
        match binding {
            Binding::Action(action) => {
                if self.inner.bindings.borrow().contains_key(&action.id()) {
                    action.destroy();
                } else {
                    log::warn!("unbind: {action:?} is not bound to this dispatcher");
                }
            }
            other => {
                let Some(key) = other.raw_key() else {
                    return self;
                };
                let removed = self.inner.raw_bindings.borrow_mut().remove(&key);
                match removed {
                    Some(action) => action.destroy(),
                    None => self.unbind_fallback(key),
                }
            }
        }
        self
    }

    /// A bare id may also name a directly bound simple action.
    fn unbind_fallback(&self, key: RawKey) {
        let RawKey::Single(id) = key else {
            log::warn!("unbind: no binding for {key:?}");
            return;
        };
        let found = self
            .inner
            .bindings
            .borrow()
            .values()
            .find(|bound| {
                bound.action.kind() == ActionKind::Simple && bound.action.content() == [id]
            })
            .map(|bound| bound.action.clone());
        match found {
            Some(action) => action.destroy(),
            None => log::warn!("unbind: no binding for {id}"),
        }
    }

    /// Whether the binding is currently registered.
    pub fn has<B: Into<Binding>>(&self, binding: B) -> bool {
        let binding = binding.into();
        match &binding {
            Binding::Action(action) => {
                self.inner.bindings.borrow().contains_key(&action.id())
            }
            _ => binding
                .raw_key()
                .is_some_and(|key| self.inner.raw_bindings.borrow().contains_key(&key)),
        }
    }

    /// Destroy every bound action and clear both tables.
    pub fn unbind_all(&self) -> &Self {
        let actions: Vec<Action> = self
            .inner
            .bindings
            .borrow()
            .values()
            .map(|bound| bound.action.clone())
            .collect();
        for action in actions {
            action.destroy();
        }
        self.inner.bindings.borrow_mut().clear();
        self.inner.raw_bindings.borrow_mut().clear();
        self
    }

    /// Feed one raw event into the router. Listener execution waits for the
    /// next [`Context::flush`].
    pub fn dispatch(&self, event: InputEvent) {
        match event.phase {
            InputPhase::Began => {
                self.inner.held.borrow_mut().insert(event.id);
            }
            InputPhase::Ended => {
                self.inner.held.borrow_mut().remove(&event.id);
            }
            InputPhase::Changed(_) => {}
        }
        self.inner.events.fire(&event);
    }

    pub fn is_held(&self, id: InputId) -> bool {
        self.inner.held.borrow().contains(&id)
    }

    /// Run the dispatch pipeline to quiescence: expire due tap windows, run
    /// deferred work, gate and arbitrate the pending batch, and drain the
    /// execution queue. The first listener error is returned once everything
    /// settles.
    pub async fn flush(&self) -> Result<()> {
        let inner = &self.inner;
        let mut first_err: Option<ActionError> = None;

        loop {
            for (target, at) in inner.take_due(Instant::now()) {
                simple::on_deadline(&target, at);
            }

            let work = {
                let mut deferred = inner.deferred.borrow_mut();
                std::mem::take(&mut *deferred)
            };
            for item in work {
                match item {
                    Deferred::Call(call) => call(),
                    Deferred::Future(future) => future.await,
                }
            }

            let batch = {
                let mut pending = inner.pending.borrow_mut();
                std::mem::take(&mut *pending)
            };
            let mut survivors = Vec::with_capacity(batch.len());
            for entry in batch {
                if inner.options.on_before.check().await {
                    survivors.push(entry);
                }
            }

            if let Some(index) = arbitrate(&survivors, inner.options.ghosting_cap) {
                let winner = &survivors[index];
                let synchronous = inner.options.run_synchronously
                    || winner.action.kind() == ActionKind::Synchronous;
                if synchronous {
                    let invocation = (winner.listener.borrow_mut())();
                    if let Err(err) = invocation.await {
                        first_err.get_or_insert(ActionError::listener(err));
                    }
                } else {
                    inner.queue.add(&winner.action, Rc::clone(&winner.listener));
                }
            }

            if let Err(err) = inner.queue.run().await {
                first_err.get_or_insert(err);
            }

            let settled =
                inner.pending.borrow().is_empty() && inner.deferred.borrow().is_empty();
            if settled {
                break;
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Event loop: pull from the source, dispatch, and flush, waking early
    /// for tap-window expiries. Returns once the source is exhausted and the
    /// final flush has settled.
    ///
    /// The context maintains its own held-input set from the events it
    /// consumes; [`InputSource::is_held`] is never queried here, it exists
    /// for embedders that poll the source directly.
    pub async fn drive<S: InputSource>(&self, mut source: S) -> Result<()> {
        loop {
            let next_deadline = self.inner.next_deadline();
            let step = tokio::select! {
                event = source.next_event() => Some(event),
                _ = async {
                    match next_deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => futures::future::pending::<()>().await,
                    }
                } => None,
            };

            match step {
                Some(Some(event)) => {
                    self.dispatch(event);
                    // Drain whatever is immediately available so one flush
                    // arbitrates the whole batch.
                    while let Some(Some(event)) = source.next_event().now_or_never() {
                        self.dispatch(event);
                    }
                    self.flush().await?;
                }
                Some(None) => {
                    self.flush().await?;
                    return Ok(());
                }
                None => {
                    self.flush().await?;
                }
            }
        }
    }
}

/// Pick the surviving batch's winner: `None` when the combined ghosting
/// level reaches the cap, otherwise the entry with the largest content,
/// first-staged winning ties.
fn arbitrate(entries: &[PendingTrigger], ghosting_cap: u32) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }

    if ghosting_cap > 0 && entries.len() > 1 {
        let level: usize = entries
            .windows(2)
            .map(|pair| overlap(&pair[0].action.content(), &pair[1].action.content()))
            .sum();
        if level >= ghosting_cap as usize {
            log::debug!(
                "ghosting level {level} at cap {ghosting_cap}; dropping {} trigger(s)",
                entries.len()
            );
            return None;
        }
    }

    let mut best = 0;
    let mut best_len = entries[0].action.content().len();
    for (index, entry) in entries.iter().enumerate().skip(1) {
        let len = entry.action.content().len();
        if len > best_len {
            best = index;
            best_len = len;
        }
    }
    Some(best)
}

/// Number of distinct raw inputs two actions share.
fn overlap(a: &[InputId], b: &[InputId]) -> usize {
    let a: HashSet<&InputId> = a.iter().collect();
    let b: HashSet<&InputId> = b.iter().collect();
    a.intersection(&b).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_raw_binding_keeps_first_action() {
        let ctx = Context::default();
        let q = InputId(81);

        ctx.bind(q, || async { Ok(()) }).unwrap();
        ctx.bind(q, || async { Ok(()) }).unwrap();

        assert!(ctx.has(q));
        assert_eq!(ctx.inner.raw_bindings.borrow().len(), 1);
        assert_eq!(ctx.inner.bindings.borrow().len(), 1);
    }

    #[tokio::test]
    async fn unbind_unknown_binding_is_harmless() {
        let ctx = Context::default();
        ctx.unbind(InputId(5));
        assert!(!ctx.has(InputId(5)));
    }

    #[tokio::test]
    async fn held_state_follows_dispatch() {
        let ctx = Context::default();
        let q = InputId(81);

        ctx.dispatch(InputEvent::began(q));
        assert!(ctx.is_held(q));
        ctx.dispatch(InputEvent::ended(q));
        assert!(!ctx.is_held(q));
    }

    #[test]
    fn arbitration_prefers_larger_content() {
        let entries = [
            pending(Action::simple(InputId(1))),
            pending(Action::composite([InputId(2), InputId(3)])),
        ];
        assert_eq!(arbitrate(&entries, 0), Some(1));
    }

    #[test]
    fn arbitration_breaks_ties_by_staging_order() {
        let entries = [
            pending(Action::simple(InputId(1))),
            pending(Action::simple(InputId(2))),
        ];
        assert_eq!(arbitrate(&entries, 0), Some(0));
    }

    #[test]
    fn arbitration_drops_whole_batch_at_cap() {
        let entries = [
            pending(Action::composite([InputId(81), InputId(69)])),
            pending(Action::simple(InputId(81))),
        ];
        assert_eq!(arbitrate(&entries, 1), None);
        // Without a cap the composite wins.
        assert_eq!(arbitrate(&entries, 0), Some(0));
    }

    fn pending(action: Action) -> PendingTrigger {
        let listener: Listener = Box::new(|| async { Ok(()) }.boxed_local());
        PendingTrigger {
            action,
            listener: Rc::new(RefCell::new(listener)),
        }
    }
}
