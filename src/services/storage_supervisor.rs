use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::dao::{object_store::ObjectStore, storage::StorageError};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Keep calling `connect` with exponential backoff until a store answers its
/// health check.
pub async fn connect_with_retry<F, Fut>(mut connect: F) -> Arc<dyn ObjectStore>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Arc<dyn ObjectStore>, StorageError>>,
{
    let mut delay = INITIAL_DELAY;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let result = match connect().await {
            Ok(store) => store.health_check().await.map(|()| store),
            Err(err) => Err(err),
        };

        match result {
            Ok(store) => {
                info!(attempt, "storage connection established");
                return store;
            }
            Err(err) => {
                warn!(attempt, error = %err, ?delay, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}
