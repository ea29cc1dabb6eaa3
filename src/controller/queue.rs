//! Deduplicating work queue with delayed requeue
//!
//! Keys admitted by the predicate filter wait here until a worker picks them
//! up. The queue holds at most one entry per key, and a key that has been
//! handed to a worker is not handed out again until the worker calls
//! [`WorkQueue::done`]. That in-flight marker is what serializes the
//! fetch-mutate-write cycle per key.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tokio::sync::Notify;
use tokio::time::Instant;

/// `(namespace, name)` pair identifying one watched pod. Queue dedup key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl From<&Pod> for ResourceKey {
    fn from(pod: &Pod) -> Self {
        Self {
            namespace: pod.namespace().unwrap_or_else(|| "default".to_string()),
            name: pod.name_any(),
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Default)]
struct QueueState {
    /// Keys waiting for dispatch, with the earliest instant each may be
    /// handed to a worker.
    pending: HashMap<ResourceKey, Instant>,
    /// Keys currently held by a worker.
    in_flight: HashSet<ResourceKey>,
    /// Dispatch count per key, kept while the key is pending or in flight.
    attempts: HashMap<ResourceKey, u32>,
}

/// Deduplicating delayed queue of pending reconciliation keys.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` eligible for dispatch immediately. A key that is already
    /// pending or in flight is left untouched.
    pub fn enqueue(&self, key: ResourceKey) {
        {
            let mut state = self.state.lock().expect("work queue lock poisoned");
            if state.pending.contains_key(&key) || state.in_flight.contains(&key) {
                return;
            }
            state.pending.insert(key, Instant::now());
        }
        self.notify.notify_waiters();
    }

    /// Schedule `key` for another dispatch no earlier than `now + delay`.
    ///
    /// Called by a worker that still holds the key in flight; the key stays
    /// undeliverable until that worker calls [`WorkQueue::done`] as well.
    pub fn requeue(&self, key: ResourceKey, delay: Duration) {
        {
            let mut state = self.state.lock().expect("work queue lock poisoned");
            state.pending.insert(key, Instant::now() + delay);
        }
        self.notify.notify_waiters();
    }

    /// Clear the in-flight marker for `key`. Called exactly once per
    /// dispatched item, whatever the reconcile outcome was.
    pub fn done(&self, key: &ResourceKey) {
        {
            let mut state = self.state.lock().expect("work queue lock poisoned");
            state.in_flight.remove(key);
            if !state.pending.contains_key(key) {
                state.attempts.remove(key);
            }
        }
        self.notify.notify_waiters();
    }

    /// Number of keys waiting for dispatch.
    pub fn len(&self) -> usize {
        let state = self.state.lock().expect("work queue lock poisoned");
        state.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until a key is ready, mark it in flight and hand it out together
    /// with its 1-based attempt number.
    pub async fn dequeue(&self) -> (ResourceKey, u32) {
        loop {
            // Register for wakeups before inspecting the state so that an
            // enqueue between the check and the await is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let deadline = {
                let mut state = self.state.lock().expect("work queue lock poisoned");
                let now = Instant::now();

                let ready = state
                    .pending
                    .iter()
                    .find(|(key, ready_at)| **ready_at <= now && !state.in_flight.contains(*key))
                    .map(|(key, _)| key.clone());

                if let Some(key) = ready {
                    state.pending.remove(&key);
                    state.in_flight.insert(key.clone());
                    let attempt = state.attempts.entry(key.clone()).or_insert(0);
                    *attempt += 1;
                    let attempt = *attempt;
                    return (key, attempt);
                }

                state
                    .pending
                    .iter()
                    .filter(|(key, _)| !state.in_flight.contains(*key))
                    .map(|(_, ready_at)| *ready_at)
                    .min()
            };

            match deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => notified.await,
            }
        }
    }
}
