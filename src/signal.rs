//! Lightweight observer primitive used by every action core.
//!
//! A [`Signal`] owns its subscriber list; connecting returns a [`Subscription`]
//! guard that disconnects on drop, so wiring between actions is torn down
//! automatically when the owning side goes away. Firing is reentrancy-safe:
//! callbacks may connect or disconnect (including on the signal currently
//! firing) without invalidating the in-flight delivery.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    alive: Rc<Cell<bool>>,
    callback: Callback<T>,
}

/// A single-threaded multicast signal.
///
/// Payloads are passed by reference; callbacks run synchronously, in
/// connection order, on the firing call stack.
pub struct Signal<T> {
    slots: RefCell<Vec<Slot<T>>>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
        }
    }

    /// Connect a callback. The connection lives until the returned
    /// [`Subscription`] is dropped (or [`Subscription::forget`] is called).
    pub fn connect(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.sweep();

        let alive = Rc::new(Cell::new(true));
        self.slots.borrow_mut().push(Slot {
            alive: Rc::clone(&alive),
            callback: Rc::new(callback),
        });

        Subscription { alive }
    }

    /// Deliver `payload` to every live subscriber.
    pub fn fire(&self, payload: &T) {
        // Snapshot under a short borrow so callbacks are free to connect or
        // disconnect while we iterate.
        let snapshot: Vec<(Rc<Cell<bool>>, Callback<T>)> = self
            .slots
            .borrow()
            .iter()
            .map(|slot| (Rc::clone(&slot.alive), Rc::clone(&slot.callback)))
            .collect();

        for (alive, callback) in snapshot {
            if alive.get() {
                callback(payload);
            }
        }

        self.sweep();
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots.borrow().iter().filter(|s| s.alive.get()).count()
    }

    /// Drop slots whose subscription guard is gone. Skipped silently when the
    /// list is borrowed by an outer delivery.
    fn sweep(&self) {
        if let Ok(mut slots) = self.slots.try_borrow_mut() {
            slots.retain(|slot| slot.alive.get());
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// RAII guard for a signal connection. Dropping it disconnects the callback.
#[derive(Debug)]
pub struct Subscription {
    alive: Rc<Cell<bool>>,
}

impl Subscription {
    /// Keep the connection alive for the lifetime of the signal.
    pub fn forget(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

/// Holds subscriptions until cleared, so wiring can be released in bulk when
/// an action is destroyed.
#[derive(Debug, Default)]
pub struct SubscriptionBin {
    subs: RefCell<Vec<Subscription>>,
}

impl SubscriptionBin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, sub: Subscription) {
        self.subs.borrow_mut().push(sub);
    }

    pub fn clear(&self) {
        self.subs.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_connection_order() {
        let signal = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let a = {
            let seen = Rc::clone(&seen);
            signal.connect(move |v: &u32| seen.borrow_mut().push(("a", *v)))
        };
        let b = {
            let seen = Rc::clone(&seen);
            signal.connect(move |v: &u32| seen.borrow_mut().push(("b", *v)))
        };

        signal.fire(&7);
        assert_eq!(&*seen.borrow(), &[("a", 7), ("b", 7)]);
        drop((a, b));
    }

    #[test]
    fn dropping_subscription_disconnects() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let sub = {
            let count = Rc::clone(&count);
            signal.connect(move |_: &()| count.set(count.get() + 1))
        };

        signal.fire(&());
        drop(sub);
        signal.fire(&());

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn disconnect_during_fire_is_safe() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));

        let sub_cell: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let first = {
            let sub_cell = Rc::clone(&sub_cell);
            signal.connect(move |_: &()| {
                // Disconnect the other subscriber mid-delivery.
                sub_cell.borrow_mut().take();
            })
        };
        let second = {
            let count = Rc::clone(&count);
            signal.connect(move |_: &()| count.set(count.get() + 1))
        };
        *sub_cell.borrow_mut() = Some(second);

        signal.fire(&());
        signal.fire(&());

        // The second subscriber was disconnected during the first delivery.
        assert_eq!(count.get(), 0);
        drop(first);
    }

    #[test]
    fn connect_during_fire_is_safe() {
        let signal = Rc::new(Signal::new());
        let count = Rc::new(Cell::new(0));

        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));
        let outer = {
            let inner_signal = Rc::clone(&signal);
            let count = Rc::clone(&count);
            let held = Rc::clone(&held);
            signal.connect(move |_: &()| {
                let count = Rc::clone(&count);
                held.borrow_mut()
                    .push(inner_signal.connect(move |_: &()| count.set(count.get() + 1)));
            })
        };

        signal.fire(&());
        assert_eq!(count.get(), 0);
        signal.fire(&());
        assert_eq!(count.get(), 1);
        drop(outer);
    }

    #[test]
    fn bin_clears_subscriptions() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0));
        let bin = SubscriptionBin::new();

        {
            let count = Rc::clone(&count);
            bin.add(signal.connect(move |_: &()| count.set(count.get() + 1)));
        }

        signal.fire(&());
        bin.clear();
        signal.fire(&());

        assert_eq!(count.get(), 1);
    }
}
