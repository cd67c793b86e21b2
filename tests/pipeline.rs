//! Dispatch pipeline coverage: batching, gating, arbitration, the execution
//! queue, and the driving event loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use actionkit::{
    Action, ActionError, ChannelSource, Context, ContextOptions, Gate, InputEvent, InputId,
};

fn tally(count: &Rc<Cell<usize>>) -> impl FnMut() -> LocalBoxFuture<'static, anyhow::Result<()>> {
    let count = Rc::clone(count);
    move || {
        let count = Rc::clone(&count);
        async move {
            count.set(count.get() + 1);
            Ok(())
        }
        .boxed_local()
    }
}

fn recorder(
    log: &Rc<RefCell<Vec<&'static str>>>,
    tag: &'static str,
) -> impl FnMut() -> LocalBoxFuture<'static, anyhow::Result<()>> {
    let log = Rc::clone(log);
    move || {
        let log = Rc::clone(&log);
        async move {
            log.borrow_mut().push(tag);
            Ok(())
        }
        .boxed_local()
    }
}

#[tokio::test]
async fn arbitration_prefers_the_largest_chord() {
    let ctx = Context::default();
    let q = InputId(81);
    let e = InputId(69);
    let chord = Rc::new(Cell::new(0));
    let single = Rc::new(Cell::new(0));

    ctx.bind(Action::composite([q, e]), tally(&chord)).unwrap();
    ctx.bind(q, tally(&single)).unwrap();

    ctx.dispatch(InputEvent::began(q));
    ctx.dispatch(InputEvent::began(e));
    ctx.flush().await.unwrap();

    assert_eq!(chord.get(), 1);
    assert_eq!(single.get(), 0);
}

#[tokio::test]
async fn ghosting_cap_drops_the_whole_batch() {
    // Dropped batches are reported through the log facade.
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = Context::new(ContextOptions::default().with_ghosting_cap(1));
    let q = InputId(81);
    let e = InputId(69);
    let chord = Rc::new(Cell::new(0));
    let single = Rc::new(Cell::new(0));

    ctx.bind(Action::composite([q, e]), tally(&chord)).unwrap();
    ctx.bind(q, tally(&single)).unwrap();

    ctx.dispatch(InputEvent::began(q));
    ctx.dispatch(InputEvent::began(e));
    ctx.flush().await.unwrap();

    assert_eq!(chord.get(), 0);
    assert_eq!(single.get(), 0);

    // Non-overlapping triggers are unaffected by the cap.
    ctx.dispatch(InputEvent::ended(q));
    ctx.dispatch(InputEvent::ended(e));
    ctx.flush().await.unwrap();
    ctx.dispatch(InputEvent::began(q));
    ctx.flush().await.unwrap();
    assert_eq!(single.get(), 1);
}

#[tokio::test]
async fn queue_runs_fifo_and_rejects_released_entries() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let ctx = Context::default();
            let log = Rc::new(RefCell::new(Vec::new()));
            let gate = Rc::new(tokio::sync::Notify::new());

            let first = Action::manual();
            let held_key = InputId(1);
            let held = Action::simple(held_key);
            let last = Action::manual();

            let rejected = Rc::new(Cell::new(false));
            let sub = {
                let rejected = Rc::clone(&rejected);
                held.on_rejected(move || rejected.set(true))
            };

            {
                let log = Rc::clone(&log);
                let gate = Rc::clone(&gate);
                ctx.bind(&first, move || {
                    let log = Rc::clone(&log);
                    let gate = Rc::clone(&gate);
                    async move {
                        gate.notified().await;
                        log.borrow_mut().push("first");
                        Ok(())
                    }
                    .boxed_local()
                })
                .unwrap();
            }
            ctx.bind(&held, recorder(&log, "held")).unwrap();
            ctx.bind(&last, recorder(&log, "last")).unwrap();

            // Start the first listener; it parks inside the queue.
            first.trigger();
            let running = tokio::task::spawn_local({
                let ctx = ctx.clone();
                async move { ctx.flush().await }
            });
            tokio::task::yield_now().await;

            // Two more entries queue up behind it.
            ctx.dispatch(InputEvent::began(held_key));
            ctx.flush().await.unwrap();
            last.trigger();
            ctx.flush().await.unwrap();

            // Releasing while queued kicks the entry out immediately.
            ctx.dispatch(InputEvent::ended(held_key));
            assert!(rejected.get());

            gate.notify_one();
            running.await.unwrap().unwrap();

            assert_eq!(&*log.borrow(), &["first", "last"]);
            drop(sub);
        })
        .await;
}

#[tokio::test]
async fn synchronous_actions_bypass_the_queue() {
    let ctx = Context::default();
    let count = Rc::new(Cell::new(0));
    let resolved = Rc::new(Cell::new(false));

    let inner = Action::manual();
    let wrapper = Action::synchronous(&inner);
    let sub = {
        let resolved = Rc::clone(&resolved);
        wrapper.on_resolved(move || resolved.set(true))
    };
    ctx.bind(&wrapper, tally(&count)).unwrap();

    inner.trigger();
    ctx.flush().await.unwrap();

    assert_eq!(count.get(), 1);
    // Inline execution never goes through queue resolution.
    assert!(!resolved.get());
    drop(sub);
}

#[tokio::test]
async fn run_synchronously_applies_to_every_listener() {
    let ctx = Context::new(ContextOptions::default().with_run_synchronously(true));
    let q = InputId(81);
    let count = Rc::new(Cell::new(0));
    let resolved = Rc::new(Cell::new(false));

    let action = Action::simple(q);
    let sub = {
        let resolved = Rc::clone(&resolved);
        action.on_resolved(move || resolved.set(true))
    };
    ctx.bind(&action, tally(&count)).unwrap();

    ctx.dispatch(InputEvent::began(q));
    ctx.flush().await.unwrap();

    assert_eq!(count.get(), 1);
    assert!(!resolved.get());
    drop(sub);
}

#[tokio::test]
async fn pre_dispatch_gate_filters_triggers() {
    let denied = Context::new(
        ContextOptions::default().with_on_before(Gate::sync(|| false)),
    );
    let allowed = Context::new(
        ContextOptions::default().with_on_before(Gate::asynchronous(|| async { true })),
    );
    let q = InputId(81);
    let denied_count = Rc::new(Cell::new(0));
    let allowed_count = Rc::new(Cell::new(0));

    denied.bind(q, tally(&denied_count)).unwrap();
    allowed.bind(q, tally(&allowed_count)).unwrap();

    denied.dispatch(InputEvent::began(q));
    denied.flush().await.unwrap();
    allowed.dispatch(InputEvent::began(q));
    allowed.flush().await.unwrap();

    assert_eq!(denied_count.get(), 0);
    assert_eq!(allowed_count.get(), 1);
}

#[tokio::test]
async fn process_filter_and_allow_list() {
    let w = InputId(87);
    let q = InputId(81);
    let ctx = Context::new(
        ContextOptions::default()
            .with_process(Some(false))
            .with_process_allow_list(vec![w]),
    );
    let q_count = Rc::new(Cell::new(0));
    let w_count = Rc::new(Cell::new(0));

    ctx.bind(q, tally(&q_count)).unwrap();
    ctx.bind(w, tally(&w_count)).unwrap();

    // Consumed upstream: filtered for q, exempt for w.
    ctx.dispatch(InputEvent::began(q).processed(true));
    ctx.dispatch(InputEvent::began(w).processed(true));
    ctx.flush().await.unwrap();
    assert_eq!(q_count.get(), 0);
    assert_eq!(w_count.get(), 1);

    ctx.dispatch(InputEvent::ended(q).processed(true));
    ctx.flush().await.unwrap();
    ctx.dispatch(InputEvent::began(q));
    ctx.flush().await.unwrap();
    assert_eq!(q_count.get(), 1);
}

#[tokio::test]
async fn listener_errors_surface_from_flush() {
    let ctx = Context::default();
    let q = InputId(81);

    ctx.bind(q, || async { Err(anyhow::anyhow!("boom")) })
        .unwrap();

    ctx.dispatch(InputEvent::began(q));
    let err = ctx.flush().await.unwrap_err();
    assert!(matches!(err, ActionError::Listener(_)));
}

#[tokio::test]
async fn unbind_destroys_and_forgets() {
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = Context::default();
    let q = InputId(81);
    let count = Rc::new(Cell::new(0));

    ctx.bind(q, tally(&count)).unwrap();
    assert!(ctx.has(q));

    ctx.unbind(q);
    assert!(!ctx.has(q));

    ctx.dispatch(InputEvent::began(q));
    ctx.flush().await.unwrap();
    assert_eq!(count.get(), 0);
}

#[tokio::test]
async fn unbind_all_clears_every_binding() {
    let ctx = Context::default();
    let q = InputId(81);
    let count = Rc::new(Cell::new(0));

    let manual = Action::manual();
    let destroyed = Rc::new(Cell::new(false));
    let sub = {
        let destroyed = Rc::clone(&destroyed);
        manual.on_destroyed(move || destroyed.set(true))
    };

    ctx.bind(q, tally(&count)).unwrap();
    ctx.bind(&manual, tally(&count)).unwrap();

    ctx.unbind_all();
    assert!(!ctx.has(q));
    assert!(destroyed.get());

    ctx.dispatch(InputEvent::began(q));
    ctx.flush().await.unwrap();
    assert_eq!(count.get(), 0);
    drop(sub);
}

#[tokio::test]
async fn rebinding_the_same_action_fires_bound_once() {
    let ctx = Context::default();
    let count = Rc::new(Cell::new(0));
    let bound = Rc::new(Cell::new(0));
    let changed = Rc::new(Cell::new(0));

    let action = Action::simple(InputId(81));
    let sub = {
        let bound = Rc::clone(&bound);
        action.on_bound(move || bound.set(bound.get() + 1))
    };
    let changed_sub = {
        let changed = Rc::clone(&changed);
        action.on_changed(move || changed.set(changed.get() + 1))
    };

    ctx.bind(&action, tally(&count)).unwrap();
    ctx.bind(&action, tally(&count)).unwrap();

    // The second bind to the same dispatcher is a no-op on the action.
    assert_eq!(bound.get(), 1);
    assert_eq!(changed.get(), 1);
    drop(changed_sub);

    // Exactly one staged trigger per press after the double bind.
    ctx.dispatch(InputEvent::began(InputId(81)));
    ctx.flush().await.unwrap();
    assert_eq!(count.get(), 1);
    drop(sub);
}

#[tokio::test]
async fn drive_consumes_a_source_to_exhaustion() {
    let ctx = Context::default();
    let q = InputId(81);
    let count = Rc::new(Cell::new(0));

    ctx.bind(q, tally(&count)).unwrap();

    let (source, events) = ChannelSource::new();
    events.send(InputEvent::began(q)).unwrap();
    events.send(InputEvent::ended(q)).unwrap();
    events.send(InputEvent::began(q)).unwrap();
    drop(events);

    ctx.drive(source).await.unwrap();
    // All three events were immediately available, so they arbitrated as a
    // single batch with a single winning trigger.
    assert_eq!(count.get(), 1);
    assert!(ctx.is_held(q));
}
