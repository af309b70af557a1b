//! Observable value cells
//!
//! A minimal publish-subscribe primitive used as the building block for all
//! server and client state. Kept framework-independent on purpose: an arena
//! of subscriber callbacks behind a lock, notified synchronously in
//! subscription order.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A shared mutable value. Cloning the handle shares the underlying cell.
pub struct Mutable<T> {
    value: Arc<RwLock<T>>,
}

impl<T: Clone> Mutable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Overwrite the current value.
    pub fn set(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T> Clone for Mutable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscribers<T> {
    entries: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

/// A mutable value that notifies subscribers on every `set`.
///
/// Notification is synchronous and runs in subscription order. `set` always
/// notifies, even when the new value equals the old one; de-duplication, where
/// required, is the caller's responsibility. The value lock is released before
/// callbacks run, so a subscriber may freely read, set, or subscribe.
pub struct Subscribable<T> {
    value: Arc<RwLock<T>>,
    subscribers: Arc<Subscribers<T>>,
}

impl<T: Clone> Subscribable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(Subscribers {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Overwrite the current value and notify every subscriber.
    pub fn set(&self, value: T) {
        *self.value.write() = value.clone();

        let snapshot: Vec<Callback<T>> = self
            .subscribers
            .entries
            .lock()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in snapshot {
            callback(&value);
        }
    }

    /// Register a change subscriber. The returned handle cancels exactly this
    /// subscription; dropping it without cancelling keeps the subscription
    /// alive.
    pub fn on_change(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .entries
            .lock()
            .push((id, Arc::new(callback)));

        let subscribers = Arc::downgrade(&self.subscribers);
        Subscription {
            cancel: Arc::new(move || {
                if let Some(subscribers) = subscribers.upgrade() {
                    subscribers
                        .entries
                        .lock()
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// A view of this cell exposing only `get` and `on_change`.
    pub fn read_only(&self) -> ReadOnly<T> {
        ReadOnly {
            inner: self.clone(),
        }
    }
}

impl<T> Clone for Subscribable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            subscribers: self.subscribers.clone(),
        }
    }
}

/// Handle for one registered subscriber.
pub struct Subscription {
    cancel: Arc<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Remove the subscriber. Calling this more than once is a no-op.
    pub fn cancel(&self) {
        (self.cancel)();
    }
}

/// Read-only view over a [`Subscribable`], preventing external mutation.
pub struct ReadOnly<T> {
    inner: Subscribable<T>,
}

impl<T: Clone> ReadOnly<T> {
    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn on_change(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        self.inner.on_change(callback)
    }
}

impl<T> Clone for ReadOnly<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_always_notifies() {
        let cell = Subscribable::new(1);
        let count = Arc::new(AtomicUsize::new(0));

        let observed = count.clone();
        let _sub = cell.on_change(move |_| {
            observed.fetch_add(1, Ordering::SeqCst);
        });

        cell.set(1);
        cell.set(1);
        cell.set(2);

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn test_notification_order_follows_subscription_order() {
        let cell = Subscribable::new(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            let _ = cell.on_change(move |_| order.lock().push(tag));
        }

        cell.set(1);

        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_cancel_removes_exactly_one_subscriber() {
        let cell = Subscribable::new(0);
        let count = Arc::new(AtomicUsize::new(0));

        let kept = count.clone();
        let _kept = cell.on_change(move |_| {
            kept.fetch_add(1, Ordering::SeqCst);
        });

        let cancelled = count.clone();
        let subscription = cell.on_change(move |_| {
            cancelled.fetch_add(1, Ordering::SeqCst);
        });

        subscription.cancel();
        subscription.cancel(); // idempotent

        cell.set(1);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_only_view_tracks_cell() {
        let cell = Subscribable::new("a".to_string());
        let view = cell.read_only();
        let seen = Arc::new(Mutex::new(None));

        let observed = seen.clone();
        let _sub = view.on_change(move |value: &String| {
            *observed.lock() = Some(value.clone());
        });

        cell.set("b".to_string());

        assert_eq!(view.get(), "b");
        assert_eq!(seen.lock().as_deref(), Some("b"));
    }

    #[test]
    fn test_subscriber_may_set_another_cell() {
        let source = Subscribable::new(0);
        let derived = Subscribable::new(0);

        let target = derived.clone();
        let _sub = source.on_change(move |value| target.set(value * 2));

        source.set(21);

        assert_eq!(derived.get(), 42);
    }

    #[test]
    fn test_mutable_handles_share_state() {
        let cell = Mutable::new(vec![1, 2]);
        let other = cell.clone();

        other.set(vec![3]);

        assert_eq!(cell.get(), vec![3]);
    }
}
