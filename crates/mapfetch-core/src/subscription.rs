//! Subscription registry: fan-out of events to any number of observers.
//!
//! Observers register a callback and get back an opaque
//! [`SubscriptionHandle`]. Handles come from a monotonic counter and are
//! never reused, so unsubscribing a stale handle is a harmless no-op.
//!
//! Delivery is synchronous and in subscription order. Each publish walks a
//! copy-on-write snapshot of the table, so a callback may unsubscribe
//! itself (or anyone else) mid-dispatch without affecting delivery of the
//! current event to the remaining observers.
//!
//! Callbacks run on the publisher's thread and must be fast: hand any real
//! work off elsewhere. No timeout is enforced.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;

/// Opaque identifier of one subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Raw slot number, for hosts that need an integer.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Observer callback.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

type Snapshot<E> = Arc<[(SubscriptionHandle, Callback<E>)]>;

struct Inner<E> {
    next_handle: u64,
    table: IndexMap<SubscriptionHandle, Callback<E>>,
    snapshot: Snapshot<E>,
}

impl<E> Inner<E> {
    fn rebuild_snapshot(&mut self) {
        self.snapshot = self
            .table
            .iter()
            .map(|(handle, cb)| (*handle, Arc::clone(cb)))
            .collect();
    }
}

/// Thread-safe publish/subscribe table.
pub struct SubscriptionRegistry<E> {
    inner: Mutex<Inner<E>>,
}

impl<E> SubscriptionRegistry<E> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_handle: 1,
                table: IndexMap::new(),
                snapshot: Arc::from(Vec::new()),
            }),
        }
    }

    /// Register a callback. Returns its handle.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = SubscriptionHandle(inner.next_handle);
        inner.next_handle += 1;
        inner.table.insert(handle, Arc::new(callback));
        inner.rebuild_snapshot();
        handle
    }

    /// Remove a subscription.
    ///
    /// Returns `false` if the handle was not registered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // shift_remove keeps delivery order stable for the others
        if inner.table.shift_remove(&handle).is_none() {
            return false;
        }
        inner.rebuild_snapshot();
        true
    }

    /// Deliver an event to every registered callback.
    ///
    /// The table lock is only held to clone the snapshot pointer; callbacks
    /// run without it.
    pub fn publish(&self, event: &E) {
        let snapshot = {
            let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(&inner.snapshot)
        };
        for (_, callback) in snapshot.iter() {
            callback(event);
        }
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .table
            .len()
    }

    /// Check whether nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for SubscriptionRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for SubscriptionRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscribers", &self.len())
            .finish()
    }
}
