//! Composable input actions.
//!
//! Every variant shares one activation contract: an inactive action that
//! observes its completion condition becomes active and fires `triggered`;
//! an active action whose condition stops holding becomes inactive and fires
//! `released`. Combinators own their children, re-derive their own state from
//! child notifications, and expose exactly the same surface as a plain
//! simple action, so nesting is uniform at any depth.

use std::rc::{Rc, Weak};
use std::time::Duration;

use futures::FutureExt;

use crate::dispatch::context::ContextInner;
use crate::error::Result;
use crate::input::InputId;
use crate::signal::Subscription;

pub mod binding;
pub mod core;
pub mod middleware;

pub(crate) mod axis;
pub(crate) mod dynamic;
pub(crate) mod group;
pub(crate) mod manual;
pub(crate) mod member;
pub(crate) mod sequence;
pub(crate) mod simple;
pub(crate) mod wrap;

pub use binding::Binding;
pub use middleware::Predicate;
pub use self::core::{TriggerData, TriggerPayload};

use self::core::ActionCore;

/// Which variant an action is. Combinator internals stay private; the tag is
/// enough for callers to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Simple,
    Axis,
    Composite,
    Union,
    Unique,
    Sequence,
    Optional,
    Dynamic,
    Middleware,
    Synchronous,
    Manual,
}

pub(crate) enum Kind {
    Simple(simple::SimpleState),
    Axis(axis::AxisState),
    Composite(member::GroupState),
    Union(member::GroupState),
    Unique(member::GroupState),
    Sequence(sequence::SequenceState),
    Optional(member::WrapState),
    Dynamic(dynamic::DynamicState),
    Middleware(middleware::MiddlewareState),
    Synchronous(member::WrapState),
    Manual,
}

pub(crate) struct ActionInner {
    pub core: ActionCore,
    pub kind: Kind,
}

/// Handle to one action. Cloning the handle shares the underlying action;
/// use [`Action::clone_action`] for an independent copy.
#[derive(Clone)]
pub struct Action {
    pub(crate) inner: Rc<ActionInner>,
}

impl Action {
    // --- constructors ------------------------------------------------------

    /// Discrete action over one raw input.
    pub fn simple(id: InputId) -> Self {
        simple::new(id, 1, simple::DEFAULT_TAP_WINDOW)
    }

    /// Discrete action that triggers after `repeat` presses, each within
    /// `window` of the previous one.
    pub fn tap(id: InputId, repeat: u32, window: Duration) -> Self {
        simple::new(id, repeat.max(1), window)
    }

    /// Continuous action over one axis channel. Pulses on every sample.
    pub fn axis(id: InputId) -> Self {
        axis::new(id)
    }

    /// Active while every member is active.
    pub fn composite<I, B>(members: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Binding>,
    {
        group::composite(collect(members))
    }

    /// Active while any member is active.
    pub fn union<I, B>(members: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Binding>,
    {
        group::union(collect(members))
    }

    /// Active while exactly one member is active.
    pub fn unique<I, B>(members: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Binding>,
    {
        group::unique(collect(members))
    }

    /// Triggers when members activate in declaration order with no
    /// out-of-order activation in between.
    pub fn sequence<I, B>(members: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Binding>,
    {
        sequence::new(collect(members))
    }

    /// Ghost wrapper: mirrors the inner action but never gates a parent
    /// combinator's completion.
    pub fn optional(inner: impl Into<Binding>) -> Self {
        wrap::optional(inner.into())
    }

    /// Wrapper whose delegate can be swapped at runtime with
    /// [`Action::update`].
    pub fn dynamic(initial: impl Into<Binding>) -> Self {
        dynamic::new(initial.into())
    }

    /// Gates the inner action's triggers through a synchronous predicate.
    pub fn middleware<F>(inner: impl Into<Binding>, predicate: F) -> Self
    where
        F: Fn(&Action) -> bool + 'static,
    {
        middleware::new(inner.into(), Predicate::Sync(Rc::new(predicate)))
    }

    /// Gates the inner action's triggers through an async predicate. The
    /// action stays inactive until the predicate resolves to `true`.
    pub fn middleware_async<F, Fut>(inner: impl Into<Binding>, predicate: F) -> Self
    where
        F: Fn(&Action) -> Fut + 'static,
        Fut: std::future::Future<Output = bool> + 'static,
    {
        middleware::new(
            inner.into(),
            Predicate::Async(Rc::new(move |action| predicate(action).boxed_local())),
        )
    }

    /// Wrapper whose listener runs inline during dispatch instead of through
    /// the execution queue.
    pub fn synchronous(inner: impl Into<Binding>) -> Self {
        wrap::synchronous(inner.into())
    }

    /// Action with no input condition; fired explicitly with
    /// [`Action::trigger`].
    pub fn manual() -> Self {
        Self::from_parts(Kind::Manual, Vec::new())
    }

    pub(crate) fn from_parts(kind: Kind, content: Vec<InputId>) -> Self {
        Self {
            inner: Rc::new(ActionInner {
                core: ActionCore::new(content),
                kind,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ActionInner>) -> Self {
        Self { inner }
    }

    // --- inspection --------------------------------------------------------

    pub fn kind(&self) -> ActionKind {
        match &self.inner.kind {
            Kind::Simple(_) => ActionKind::Simple,
            Kind::Axis(_) => ActionKind::Axis,
            Kind::Composite(_) => ActionKind::Composite,
            Kind::Union(_) => ActionKind::Union,
            Kind::Unique(_) => ActionKind::Unique,
            Kind::Sequence(_) => ActionKind::Sequence,
            Kind::Optional(_) => ActionKind::Optional,
            Kind::Dynamic(_) => ActionKind::Dynamic,
            Kind::Middleware(_) => ActionKind::Middleware,
            Kind::Synchronous(_) => ActionKind::Synchronous,
            Kind::Manual => ActionKind::Manual,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.core.active.get()
    }

    pub fn is_bound(&self) -> bool {
        self.inner.core.context().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.core.destroyed_flag.get()
    }

    /// Flattened list of every raw input this action transitively references.
    pub fn content(&self) -> Vec<InputId> {
        self.inner.core.content.borrow().clone()
    }

    /// Content rendered through the process-wide label table.
    pub fn content_labels(&self) -> Vec<String> {
        self.content().iter().map(InputId::to_string).collect()
    }

    /// How many of this action's raw inputs the bound dispatcher currently
    /// sees held. Zero when unbound.
    pub fn active_inputs(&self) -> usize {
        let Some(ctx) = self.inner.core.context() else {
            return 0;
        };
        let held = ctx.held.borrow();
        self.inner
            .core
            .content
            .borrow()
            .iter()
            .filter(|id| held.contains(id))
            .count()
    }

    // --- variant operations ------------------------------------------------

    /// Fire a manual action once: trigger, then release, on the next flush.
    /// Ignored with a warning on every other variant.
    pub fn trigger(&self) {
        self.trigger_with(TriggerData::None);
    }

    /// [`Action::trigger`] with an attached payload.
    pub fn trigger_with(&self, data: TriggerData) {
        manual::trigger(self, data);
    }

    /// Swap a dynamic action's delegate. Fails on other variants, on invalid
    /// bindings, and on dynamic actions not yet bound to a dispatcher.
    pub fn update(&self, binding: impl Into<Binding>) -> Result<()> {
        dynamic::update(self, binding.into())
    }

    /// Independent deep copy: fresh state, fresh children, no context.
    pub fn clone_action(&self) -> Action {
        match &self.inner.kind {
            Kind::Simple(state) => simple::new(state.raw, state.repeat, state.window),
            Kind::Axis(state) => axis::new(state.raw),
            Kind::Composite(state) => group::composite(clone_members(&state.members)),
            Kind::Union(state) => group::union(clone_members(&state.members)),
            Kind::Unique(state) => group::unique(clone_members(&state.members)),
            Kind::Sequence(state) => sequence::new(clone_members(&state.members)),
            Kind::Optional(state) => {
                wrap::optional(Binding::Action(state.delegate.action.clone_action()))
            }
            Kind::Dynamic(state) => {
                let delegate = state.delegate.borrow().action.clone_action();
                dynamic::new(Binding::Action(delegate))
            }
            Kind::Middleware(state) => middleware::new(
                Binding::Action(state.delegate.action.clone_action()),
                state.predicate.clone(),
            ),
            Kind::Synchronous(state) => {
                wrap::synchronous(Binding::Action(state.delegate.action.clone_action()))
            }
            Kind::Manual => Action::manual(),
        }
    }

    /// Tear the action down: fires `destroyed`, cascades into children,
    /// drops every subscription, and detaches from the dispatcher.
    pub fn destroy(&self) {
        if self.inner.core.destroyed_flag.replace(true) {
            return;
        }
        self.inner.core.destroyed.fire(&());
        for child in self.children() {
            child.destroy();
        }
        self.inner.core.context_bin.clear();
        self.inner.core.bin.clear();
        if let Some(ctx) = self.inner.core.context() {
            ctx.forget(self);
        }
        *self.inner.core.context.borrow_mut() = Weak::new();
    }

    // --- signal accessors --------------------------------------------------

    pub fn on_triggered(&self, f: impl Fn(&TriggerPayload) + 'static) -> Subscription {
        self.inner.core.triggered.connect(f)
    }

    pub fn on_released(&self, f: impl Fn(Option<bool>) + 'static) -> Subscription {
        self.inner.core.released.connect(move |processed| f(*processed))
    }

    pub fn on_changed(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.changed.connect(move |_| f())
    }

    pub fn on_cancelled(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.cancelled.connect(move |_| f())
    }

    pub fn on_resolved(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.resolved.connect(move |_| f())
    }

    pub fn on_rejected(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.rejected.connect(move |_| f())
    }

    pub fn on_destroyed(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.destroyed.connect(move |_| f())
    }

    pub fn on_bound(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.bound.connect(move |_| f())
    }

    /// Dynamic actions only: fires after a successful [`Action::update`].
    pub fn on_updated(&self, f: impl Fn() + 'static) -> Subscription {
        self.inner.core.updated.connect(move |_| f())
    }

    // --- internal ----------------------------------------------------------

    /// Stable identity for dispatcher tables.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn weak(&self) -> Weak<ActionInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn lock(&self) {
        self.inner.core.locked.set(true);
    }

    /// Attach to a dispatcher and (re)wire the variant. Idempotent for the
    /// same dispatcher; switching dispatchers drops the old wiring first.
    pub(crate) fn set_context(&self, ctx: &Rc<ContextInner>) {
        let same = self
            .inner
            .core
            .context
            .borrow()
            .upgrade()
            .is_some_and(|current| Rc::ptr_eq(&current, ctx));
        if same {
            return;
        }

        self.inner.core.context_bin.clear();
        *self.inner.core.context.borrow_mut() = Rc::downgrade(ctx);
        self.wire(ctx);
        self.inner.core.changed.fire(&());
        self.inner.core.bound.fire(&());
    }

    /// Detach from the current dispatcher without destroying the action.
    pub(crate) fn clear_context(&self) {
        self.inner.core.context_bin.clear();
        *self.inner.core.context.borrow_mut() = Weak::new();
    }

    fn wire(&self, ctx: &Rc<ContextInner>) {
        match &self.inner.kind {
            Kind::Simple(_) => simple::wire(&self.inner, ctx),
            Kind::Axis(_) => axis::wire(&self.inner, ctx),
            Kind::Composite(_) | Kind::Union(_) | Kind::Unique(_) => {
                group::wire(&self.inner, ctx)
            }
            Kind::Sequence(_) => sequence::wire(&self.inner, ctx),
            Kind::Optional(_) | Kind::Synchronous(_) => wrap::wire(&self.inner, ctx),
            Kind::Dynamic(_) => dynamic::wire(&self.inner, ctx),
            Kind::Middleware(_) => middleware::wire(&self.inner, ctx),
            Kind::Manual => {}
        }
    }

    fn children(&self) -> Vec<Action> {
        match &self.inner.kind {
            Kind::Simple(_) | Kind::Axis(_) | Kind::Manual => Vec::new(),
            Kind::Composite(state) | Kind::Union(state) | Kind::Unique(state) => {
                state.members.iter().map(|m| m.action.clone()).collect()
            }
            Kind::Sequence(state) => state.members.iter().map(|m| m.action.clone()).collect(),
            Kind::Optional(state) | Kind::Synchronous(state) => {
                vec![state.delegate.action.clone()]
            }
            Kind::Dynamic(state) => vec![state.delegate.borrow().action.clone()],
            Kind::Middleware(state) => vec![state.delegate.action.clone()],
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Action {}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}(", self.kind())?;
        for (i, label) in self.content_labels().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(label)?;
        }
        f.write_str(")")
    }
}

fn collect<I, B>(members: I) -> Vec<Binding>
where
    I: IntoIterator<Item = B>,
    B: Into<Binding>,
{
    members.into_iter().map(Into::into).collect()
}

fn clone_members(members: &[member::Member]) -> Vec<Binding> {
    members
        .iter()
        .map(|m| Binding::Action(m.action.clone_action()))
        .collect()
}
