//! Push-based change feeds.
//!
//! A [`FeedHub`] keeps callbacks grouped by topic (an account id) and hands
//! each published snapshot to every callback of that topic. Subscribing
//! returns a [`Subscription`] that removes the callback when dropped.
//!
//! Snapshots carry a version that the publisher takes in commit order.
//! Every listener has a one-slot mailbox and is drained by at most one
//! thread at a time, so it sees strictly increasing versions: a snapshot
//! older than one it already received is dropped. A publish that finds the
//! listener busy (another thread, or a write made from inside its own
//! callback) leaves the snapshot in the mailbox for the running drain.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Listener<S> {
    id: u64,
    topic: String,
    callback: Callback<S>,
    /// Version of the last snapshot handed to the callback
    seen: Option<u64>,
    /// Newest snapshot not yet delivered
    pending: Option<(u64, Arc<S>)>,
    /// Whether some thread is currently draining this listener
    draining: bool,
}

impl<S> Listener<S> {
    /// Keep `snapshot` if it is newer than anything seen or queued.
    fn offer(&mut self, version: u64, snapshot: &Arc<S>) {
        // A queued snapshot is always newer than the last one seen.
        let newest = self.pending.as_ref().map(|(v, _)| *v).or(self.seen);
        if newest.map_or(true, |newest| version > newest) {
            self.pending = Some((version, Arc::clone(snapshot)));
        }
    }
}

struct HubInner<S> {
    next_id: u64,
    listeners: Vec<Listener<S>>,
}

impl<S> HubInner<S> {
    fn listener_mut(&mut self, id: u64) -> Option<&mut Listener<S>> {
        self.listeners.iter_mut().find(|listener| listener.id == id)
    }
}

/// Topic-scoped fan-out of versioned snapshots of type `S`.
pub struct FeedHub<S> {
    inner: Arc<Mutex<HubInner<S>>>,
}

impl<S> Default for FeedHub<S> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_id: 1,
                listeners: Vec::new(),
            })),
        }
    }
}

impl<S: Send + Sync + 'static> FeedHub<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `topic`. It receives the next publish.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = self.register(topic, Arc::new(callback));
        self.subscription(id)
    }

    /// Register a callback, then deliver the snapshot returned by `load`.
    ///
    /// `load` runs after registration, so a write racing with the
    /// subscription is never missed: the callback gets whichever of the
    /// loaded snapshot and the published one is newer, and never both in
    /// the wrong order.
    pub fn subscribe_with<F, L, E>(&self, topic: &str, callback: F, load: L) -> Result<Subscription, E>
    where
        F: Fn(&S) + Send + Sync + 'static,
        L: FnOnce() -> Result<(u64, S), E>,
    {
        let id = self.register(topic, Arc::new(callback));
        let subscription = self.subscription(id);

        let (version, snapshot) = load()?;
        let snapshot = Arc::new(snapshot);
        if let Some(listener) = lock(&self.inner).listener_mut(id) {
            listener.offer(version, &snapshot);
        }
        self.drain(id);
        Ok(subscription)
    }

    /// Deliver `snapshot` to every callback registered for `topic`.
    ///
    /// Callbacks run without the hub lock held, so they may subscribe,
    /// unsubscribe or cause further publishes.
    pub fn publish(&self, topic: &str, version: u64, snapshot: S) {
        let snapshot = Arc::new(snapshot);
        let ids: Vec<u64> = {
            let mut inner = lock(&self.inner);
            inner
                .listeners
                .iter_mut()
                .filter(|listener| listener.topic == topic)
                .map(|listener| {
                    listener.offer(version, &snapshot);
                    listener.id
                })
                .collect()
        };

        tracing::debug!(topic, version, listeners = ids.len(), "publishing snapshot");
        for id in ids {
            self.drain(id);
        }
    }

    /// Number of callbacks registered for `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        lock(&self.inner)
            .listeners
            .iter()
            .filter(|listener| listener.topic == topic)
            .count()
    }

    fn register(&self, topic: &str, callback: Callback<S>) -> u64 {
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            topic: topic.to_string(),
            callback,
            seen: None,
            pending: None,
            draining: false,
        });
        id
    }

    fn subscription(&self, id: u64) -> Subscription {
        let weak: Weak<Mutex<HubInner<S>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.retain(|listener| listener.id != id);
            }
        })
    }

    /// Deliver queued snapshots to one listener until its mailbox is empty.
    ///
    /// Returns at once when another drain of the same listener is running;
    /// that drain picks up whatever was queued.
    fn drain(&self, id: u64) {
        {
            let mut inner = lock(&self.inner);
            match inner.listener_mut(id) {
                Some(listener) if !listener.draining => listener.draining = true,
                _ => return,
            }
        }
        let mut guard = DrainGuard {
            inner: &self.inner,
            id,
            armed: true,
        };

        loop {
            let next = {
                let mut inner = lock(&self.inner);
                let Some(listener) = inner.listener_mut(id) else {
                    guard.armed = false;
                    return;
                };
                match listener.pending.take() {
                    Some((version, snapshot)) => {
                        listener.seen = Some(version);
                        (Arc::clone(&listener.callback), snapshot)
                    }
                    None => {
                        listener.draining = false;
                        guard.armed = false;
                        return;
                    }
                }
            };

            let (callback, snapshot) = next;
            callback(&snapshot);
        }
    }
}

/// Clears the draining flag if a callback unwinds mid-drain.
struct DrainGuard<'a, S> {
    inner: &'a Mutex<HubInner<S>>,
    id: u64,
    armed: bool,
}

impl<S> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(listener) = lock(self.inner).listener_mut(self.id) {
                listener.draining = false;
            }
        }
    }
}

fn lock<S>(inner: &Mutex<HubInner<S>>) -> MutexGuard<'_, HubInner<S>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle for an active subscription. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Unsubscribe now.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
