//! Keyed work queue feeding the reconcile workers.
//!
//! A key is held at most once in the queue and handed to at most one worker
//! at a time. Keys added while being processed are parked as dirty and
//! re-queued when the worker reports them done, so no change is lost and no
//! key is reconciled concurrently with itself.

use std::{
    collections::{HashSet, VecDeque},
    hash::Hash,
    sync::Arc,
    time::Duration,
};

use tokio::{
    sync::{Mutex, Notify},
    time::sleep,
};

struct QueueState<K> {
    queue: VecDeque<K>,
    queued: HashSet<K>,
    processing: HashSet<K>,
    dirty: HashSet<K>,
    shut_down: bool,
}

impl<K> Default for QueueState<K> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            processing: HashSet::new(),
            dirty: HashSet::new(),
            shut_down: false,
        }
    }
}

impl<K: Clone + Eq + Hash> QueueState<K> {
    /// Returns `true` when a waiting worker should be woken.
    fn enqueue(&mut self, key: K) -> bool {
        if self.shut_down {
            return false;
        }
        if self.processing.contains(&key) {
            self.dirty.insert(key);
            return false;
        }
        if !self.queued.insert(key.clone()) {
            return false;
        }
        self.queue.push_back(key);
        true
    }
}

/// Deduplicating FIFO of keys awaiting reconciliation.
pub struct WorkQueue<K> {
    state: Mutex<QueueState<K>>,
    notify: Notify,
}

impl<K> Default for WorkQueue<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }
}

impl<K> WorkQueue<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `key`. No-op when it is already waiting.
    pub async fn add(&self, key: K) {
        let wake = self.state.lock().await.enqueue(key);
        if wake {
            self.notify.notify_one();
        }
    }

    /// Schedule `key` once `delay` has elapsed.
    pub fn add_after(self: &Arc<Self>, key: K, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            sleep(delay).await;
            queue.add(key).await;
        });
    }

    /// Wait for the next key and mark it as being processed.
    ///
    /// Returns `None` once the queue is shut down.
    pub async fn next(&self) -> Option<K> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.shut_down {
                    return None;
                }
                if let Some(key) = state.queue.pop_front() {
                    state.queued.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
            }

            notified.await;
        }
    }

    /// Release `key` after processing, re-queueing it if it changed meanwhile.
    pub async fn done(&self, key: K) {
        let wake = {
            let mut state = self.state.lock().await;
            state.processing.remove(&key);
            state.dirty.remove(&key) && state.enqueue(key)
        };
        if wake {
            self.notify.notify_one();
        }
    }

    /// Stop handing out keys and wake every waiting worker.
    pub async fn shutdown(&self) {
        self.state.lock().await.shut_down = true;
        self.notify.notify_waiters();
    }

    /// Keys waiting to be handed out.
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Whether no key is waiting.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
