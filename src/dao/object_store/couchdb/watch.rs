//! Follows the CouchDB `_changes` feed and republishes it as [`WatchEvent`]s.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, from_value};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, warn};

use crate::dao::{
    models::{DynamicObject, Game, Guess, Kind, Phrase, Resource},
    object_store::{EventType, WatchEvent},
};

use super::{
    error::{CouchDaoError, CouchResult},
    models::{ChangeRow, ChangesResponse, CouchDocument, doc_kind},
    store::CouchObjectStore,
};

const CHANGES: &str = "_changes";
const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Start following the feed from the current sequence. The task lives as long
/// as the process.
pub(super) fn spawn(store: CouchObjectStore, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(run(store, timeout))
}

async fn run(store: CouchObjectStore, timeout: Duration) {
    let mut since = "now".to_string();
    let mut delay = INITIAL_DELAY;

    loop {
        match poll(&store, &since, timeout).await {
            Ok(batch) => {
                delay = INITIAL_DELAY;
                for row in &batch.results {
                    match decode_change(row) {
                        Some(event) => store.publish(event),
                        None => debug!(doc_id = %row.id, "skipping foreign change"),
                    }
                }
                since = batch.resume_token();
            }
            Err(err) => {
                warn!(error = %err, "CouchDB changes feed request failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

async fn poll(
    store: &CouchObjectStore,
    since: &str,
    timeout: Duration,
) -> CouchResult<ChangesResponse> {
    let query = [
        ("feed", "longpoll".to_string()),
        ("include_docs", "true".to_string()),
        ("since", since.to_string()),
        ("timeout", timeout.as_millis().to_string()),
    ];

    let response = store
        .request(Method::GET, CHANGES)
        .query(&query)
        .send()
        .await
        .map_err(|source| CouchDaoError::RequestSend {
            path: CHANGES.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        return Err(CouchDaoError::RequestStatus {
            path: CHANGES.to_string(),
            status: response.status(),
        });
    }

    response
        .json::<ChangesResponse>()
        .await
        .map_err(|source| CouchDaoError::DecodeResponse {
            path: CHANGES.to_string(),
            source,
        })
}

/// Translate one feed row. Rows for documents this store does not own, or
/// without a body, yield `None`.
fn decode_change(row: &ChangeRow) -> Option<WatchEvent> {
    let kind = doc_kind(&row.id)?;
    let doc = row.doc.clone()?;
    let object = match kind {
        Kind::Game => decode::<Game>(doc)?,
        Kind::Guess => decode::<Guess>(doc)?,
        Kind::Phrase => decode::<Phrase>(doc)?,
    };

    let event_type = if row.deleted {
        EventType::Deleted
    } else if row
        .changes
        .first()
        .is_some_and(|change| change.rev.starts_with("1-"))
    {
        EventType::Added
    } else {
        EventType::Modified
    };

    Some(WatchEvent::new(event_type, object))
}

fn decode<T: Resource>(doc: Value) -> Option<DynamicObject> {
    from_value::<CouchDocument<T>>(doc)
        .map(|doc| doc.into_resource().into_dynamic())
        .ok()
}
