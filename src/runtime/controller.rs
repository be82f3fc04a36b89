use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use tokio::{sync::watch, task::JoinHandle};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::{debug, error, info, warn};

use crate::dao::{
    models::{DynamicObject, Kind, LabelSelector, ObjectKey},
    object_store::{ObjectStore, WatchEvent},
    storage::StorageResult,
};

use super::{Reconciler, backoff::Backoff, queue::WorkQueue};

/// Maps a changed object to the keys that must be reconciled because of it.
pub type KeyMapper = Arc<dyn Fn(&DynamicObject) -> Vec<ObjectKey> + Send + Sync>;

const DEFAULT_WORKERS: usize = 2;

/// Feeds watch events for one primary kind (plus any watched kinds) into a
/// work queue and runs a pool of workers over it.
pub struct Controller<R: Reconciler> {
    name: &'static str,
    kind: Kind,
    store: Arc<dyn ObjectStore>,
    reconciler: Arc<R>,
    mappers: Vec<(Kind, KeyMapper)>,
    workers: usize,
    backoff: Arc<Backoff<ObjectKey>>,
    queue: Arc<WorkQueue<ObjectKey>>,
}

impl<R: Reconciler> Controller<R> {
    /// Controller reconciling objects of `kind`, each event for such an object
    /// enqueueing its own key.
    pub fn new(name: &'static str, kind: Kind, store: Arc<dyn ObjectStore>, reconciler: R) -> Self {
        let own: KeyMapper = Arc::new(|object: &DynamicObject| vec![object.key()]);
        Self {
            name,
            kind,
            store,
            reconciler: Arc::new(reconciler),
            mappers: vec![(kind, own)],
            workers: DEFAULT_WORKERS,
            backoff: Arc::new(Backoff::default()),
            queue: Arc::new(WorkQueue::new()),
        }
    }

    /// Also react to changes of `kind`, reconciling the keys `mapper` yields.
    pub fn watches<F>(mut self, kind: Kind, mapper: F) -> Self
    where
        F: Fn(&DynamicObject) -> Vec<ObjectKey> + Send + Sync + 'static,
    {
        self.mappers.push((kind, Arc::new(mapper)));
        self
    }

    /// Number of concurrent workers, at least one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Retry delay bounds for failed reconciliations.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.backoff = Arc::new(Backoff::new(initial, max));
        self
    }

    /// Keys to reconcile because of `event`.
    pub fn map_event(&self, event: &WatchEvent) -> Vec<ObjectKey> {
        let kind = event.object.kind();
        self.mappers
            .iter()
            .filter(|(watched, _)| *watched == kind)
            .flat_map(|(_, mapper)| mapper(&event.object))
            .collect()
    }

    /// Enqueue every stored object of the primary kind.
    async fn resync(&self) -> StorageResult<usize> {
        let keys: Vec<ObjectKey> = match self.kind {
            Kind::Game => self
                .store
                .list_games(None)
                .await?
                .iter()
                .map(|game| game.key())
                .collect(),
            Kind::Guess => self
                .store
                .list_guesses(None, LabelSelector::new())
                .await?
                .iter()
                .map(|guess| guess.key())
                .collect(),
            Kind::Phrase => Vec::new(),
        };

        let count = keys.len();
        for key in keys {
            self.queue.add(key).await;
        }
        Ok(count)
    }

    /// Run until `shutdown` flips to `true` or its sender goes away.
    ///
    /// In-flight reconciliations finish before this returns.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let name = self.name;
        // Subscribe before listing so nothing written in between is missed.
        let mut events = BroadcastStream::new(self.store.watch());

        match self.resync().await {
            Ok(count) => info!(controller = name, count, "initial resync queued objects"),
            Err(err) => warn!(controller = name, error = %err, "initial resync failed"),
        }

        let handles: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|worker| {
                tokio::spawn(work(
                    name,
                    worker,
                    Arc::clone(&self.reconciler),
                    Arc::clone(&self.queue),
                    Arc::clone(&self.backoff),
                ))
            })
            .collect();
        info!(controller = name, workers = handles.len(), "controller started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                event = events.next() => match event {
                    Some(Ok(event)) => {
                        for key in self.map_event(&event) {
                            self.queue.add(key).await;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(controller = name, skipped, "watch stream lagged; resyncing");
                        if let Err(err) = self.resync().await {
                            warn!(controller = name, error = %err, "resync failed");
                        }
                    }
                    None => {
                        error!(controller = name, "watch stream closed");
                        break;
                    }
                },
            }
        }

        self.queue.shutdown().await;
        for handle in handles {
            if let Err(err) = handle.await {
                error!(controller = name, error = %err, "worker task failed");
            }
        }
        info!(controller = name, "controller stopped");
    }
}

async fn work<R: Reconciler>(
    name: &'static str,
    worker: usize,
    reconciler: Arc<R>,
    queue: Arc<WorkQueue<ObjectKey>>,
    backoff: Arc<Backoff<ObjectKey>>,
) {
    while let Some(key) = queue.next().await {
        match reconciler.reconcile(key.clone()).await {
            Ok(action) => {
                backoff.forget(&key);
                if let Some(delay) = action.requeue_after() {
                    queue.add_after(key.clone(), delay);
                }
            }
            Err(err) => {
                let delay = backoff.next_delay(key.clone());
                if R::is_conflict(&err) {
                    debug!(controller = name, worker, object = %key, ?delay, "write conflict; retrying");
                } else {
                    warn!(controller = name, worker, object = %key, ?delay, error = %err, "reconcile failed; retrying");
                }
                queue.add_after(key.clone(), delay);
            }
        }
        queue.done(key).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        controller::{ReconcileError, guess_to_game},
        dao::{
            models::{Game, Guess},
            object_store::{EventType, MemoryStore},
            storage::StorageError,
        },
        runtime::Action,
    };

    /// Counts calls and fails the first `failures` of them.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
        failures: usize,
    }

    impl Reconciler for Counting {
        type Error = ReconcileError;

        fn reconcile(&self, key: ObjectKey) -> BoxFuture<'_, Result<Action, Self::Error>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if call < self.failures {
                    return Err(StorageError::conflict(Kind::Game, key).into());
                }
                Ok(Action::await_change())
            })
        }
    }

    fn controller(store: Arc<dyn ObjectStore>, reconciler: Counting) -> Controller<Counting> {
        Controller::new("test", Kind::Game, store, reconciler)
            .backoff(Duration::from_millis(10), Duration::from_millis(50))
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        timeout(Duration::from_secs(2), async {
            while !check() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn events_map_through_registered_mappers() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let controller = controller(store, Counting::default()).watches(Kind::Guess, guess_to_game);

        let guess = WatchEvent::new(
            EventType::Added,
            DynamicObject::Guess(Guess::new("ns", "x", "g1", "a")),
        );
        let game = WatchEvent::new(EventType::Modified, DynamicObject::Game(Game::new("ns", "g2")));

        assert_eq!(controller.map_event(&guess), vec![ObjectKey::new("ns", "g1")]);
        assert_eq!(controller.map_event(&game), vec![ObjectKey::new("ns", "g2")]);
    }

    #[test]
    fn unwatched_kinds_map_to_nothing() {
        let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
        let controller = controller(store, Counting::default());
        let guess = WatchEvent::new(
            EventType::Added,
            DynamicObject::Guess(Guess::new("ns", "x", "g1", "a")),
        );

        assert!(controller.map_event(&guess).is_empty());
    }

    #[tokio::test]
    async fn existing_objects_are_reconciled_on_start() {
        let store = Arc::new(MemoryStore::new());
        store.create_game(Game::new("ns", "g1")).await.unwrap();
        let controller = controller(store, Counting::default());
        let reconciler = Arc::clone(&controller.reconciler);
        let (tx, rx) = watch::channel(false);

        let running = tokio::spawn(controller.run(rx));
        eventually(|| reconciler.calls.load(Ordering::SeqCst) >= 1).await;

        tx.send(true).unwrap();
        timeout(Duration::from_secs(2), running).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn failures_are_retried_until_success() {
        let store = Arc::new(MemoryStore::new());
        store.create_game(Game::new("ns", "g1")).await.unwrap();
        let controller = controller(
            store,
            Counting {
                failures: 2,
                ..Counting::default()
            },
        );
        let reconciler = Arc::clone(&controller.reconciler);
        let (tx, rx) = watch::channel(false);
        let running = tokio::spawn(controller.run(rx));

        eventually(|| reconciler.calls.load(Ordering::SeqCst) >= 3).await;

        sleep(Duration::from_millis(100)).await;
        assert_eq!(reconciler.calls.load(Ordering::SeqCst), 3);

        drop(tx);
        timeout(Duration::from_secs(2), running).await.unwrap().unwrap();
    }
}
