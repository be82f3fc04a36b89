use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde_json::from_value;
use tokio::sync::broadcast;
use tracing::info;

use crate::dao::{
    models::{Game, Guess, LabelSelector, ObjectKey, Phrase, Resource},
    object_store::{
        ObjectStore, PatchOptions, WatchEvent,
        semantics::{
            DeleteOutcome, WriteOutcome, merge_game_patch, merge_game_update, merge_guess_update,
            plan_delete, plan_write, prepare_create,
        },
    },
    storage::{StorageError, StorageResult},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{AllDocsResponse, CouchDocument, END_SUFFIX, PutResponse, doc_id, doc_prefix},
    watch,
};

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Outcome of a document write that CouchDB may reject on revision mismatch.
enum PutOutcome {
    Stored(String),
    Conflict,
}

/// Object store persisting every kind as a CouchDB document.
#[derive(Clone)]
pub struct CouchObjectStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
    events: broadcast::Sender<WatchEvent>,
}

impl CouchObjectStore {
    /// Establish a connection to CouchDB, ensure the database exists and start
    /// following its changes feed.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let store = Self {
            client,
            base_url,
            database,
            auth,
            events,
        };

        store.ensure_database().await?;
        watch::spawn(store.clone(), config.changes_timeout);
        info!(database = %store.database, "connected to CouchDB");
        Ok(store)
    }

    pub(super) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    pub(super) fn publish(&self, event: WatchEvent) {
        let _ = self.events.send(event);
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseCreate {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T: Resource>(&self, key: &ObjectKey) -> CouchResult<Option<T>> {
        let doc_id = doc_id(T::KIND, key);
        let response = self
            .request(Method::GET, &doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchDocument<T>>()
                .await
                .map(|doc| Some(doc.into_resource()))
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id,
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id,
                status: other,
            }),
        }
    }

    async fn put_document<T: Resource>(
        &self,
        document: &CouchDocument<T>,
    ) -> CouchResult<PutOutcome> {
        let response = self
            .request(Method::PUT, &document.id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: document.id.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::CONFLICT => Ok(PutOutcome::Conflict),
            status if status.is_success() => response
                .json::<PutResponse>()
                .await
                .map(|put| PutOutcome::Stored(put.rev))
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: document.id.clone(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: document.id.clone(),
                status: other,
            }),
        }
    }

    async fn list_documents<T: Resource>(&self, prefix: &str) -> CouchResult<Vec<T>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut documents = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed: CouchDocument<T> =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: row.id.clone(),
                        source,
                    })?;
                documents.push(parsed.into_resource());
            }
        }

        Ok(documents)
    }

    async fn get<T: Resource>(&self, key: ObjectKey) -> StorageResult<Option<T>> {
        self.get_document(&key).await.map_err(Into::into)
    }

    async fn create<T: Resource>(&self, object: T) -> StorageResult<T> {
        let key = object.metadata().key();
        let mut created = prepare_create(object);
        let document = CouchDocument::from_resource(created.clone(), None);
        match self.put_document(&document).await? {
            PutOutcome::Conflict => Err(StorageError::already_exists(T::KIND, key)),
            PutOutcome::Stored(rev) => {
                created.metadata_mut().resource_version = Some(rev);
                Ok(created)
            }
        }
    }

    async fn write<T, M>(&self, incoming: T, merge: M) -> StorageResult<T>
    where
        T: Resource,
        M: FnOnce(&T, T) -> T,
    {
        let key = incoming.metadata().key();
        let version = incoming.metadata().resource_version.clone();
        let stored = self
            .get_document::<T>(&key)
            .await?
            .ok_or_else(|| StorageError::not_found(T::KIND, key.clone()))?;
        let current_rev = stored.metadata().resource_version.clone();

        let next = merge(&stored, incoming);
        let (document, mut next) = match plan_write(&stored, version.as_deref(), next)? {
            WriteOutcome::Unchanged => return Ok(stored),
            WriteOutcome::Store(next) => {
                (CouchDocument::from_resource(next.clone(), current_rev), next)
            }
            WriteOutcome::Remove(next) => {
                (CouchDocument::tombstone(next.clone(), current_rev), next)
            }
        };

        match self.put_document(&document).await? {
            PutOutcome::Conflict => Err(StorageError::conflict(T::KIND, key)),
            PutOutcome::Stored(rev) => {
                next.metadata_mut().resource_version = Some(rev);
                Ok(next)
            }
        }
    }

    async fn delete<T: Resource>(&self, key: ObjectKey) -> StorageResult<()> {
        let stored = self
            .get_document::<T>(&key)
            .await?
            .ok_or_else(|| StorageError::not_found(T::KIND, key.clone()))?;
        let current_rev = stored.metadata().resource_version.clone();

        let document = match plan_delete(&stored) {
            DeleteOutcome::AlreadyDeleting => return Ok(()),
            DeleteOutcome::Remove => CouchDocument::tombstone(stored, current_rev),
            DeleteOutcome::MarkDeleting(marked) => {
                CouchDocument::from_resource(marked, current_rev)
            }
        };

        match self.put_document(&document).await? {
            PutOutcome::Conflict => Err(StorageError::conflict(T::KIND, key)),
            PutOutcome::Stored(_) => Ok(()),
        }
    }

    async fn list<T: Resource>(&self, namespace: Option<&str>) -> StorageResult<Vec<T>> {
        let prefix = doc_prefix(T::KIND, namespace);
        self.list_documents(&prefix).await.map_err(Into::into)
    }
}

impl ObjectStore for CouchObjectStore {
    fn get_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Game>>> {
        let store = self.clone();
        Box::pin(async move { store.get(key).await })
    }

    fn get_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Guess>>> {
        let store = self.clone();
        Box::pin(async move { store.get(key).await })
    }

    fn get_phrase(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<Option<Phrase>>> {
        let store = self.clone();
        Box::pin(async move { store.get(key).await })
    }

    fn list_games(
        &self,
        namespace: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<Game>>> {
        let store = self.clone();
        Box::pin(async move { store.list(namespace.as_deref()).await })
    }

    fn list_guesses(
        &self,
        namespace: Option<String>,
        selector: LabelSelector,
    ) -> BoxFuture<'static, StorageResult<Vec<Guess>>> {
        let store = self.clone();
        Box::pin(async move {
            let guesses: Vec<Guess> = store.list(namespace.as_deref()).await?;
            Ok(guesses
                .into_iter()
                .filter(|guess| selector.matches(&guess.metadata.labels))
                .collect())
        })
    }

    fn create_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        let store = self.clone();
        Box::pin(async move { store.create(game).await })
    }

    fn create_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        let store = self.clone();
        Box::pin(async move { store.create(guess).await })
    }

    fn create_phrase(&self, phrase: Phrase) -> BoxFuture<'static, StorageResult<Phrase>> {
        let store = self.clone();
        Box::pin(async move { store.create(phrase).await })
    }

    fn update_game(&self, game: Game) -> BoxFuture<'static, StorageResult<Game>> {
        let store = self.clone();
        Box::pin(async move { store.write(game, merge_game_update).await })
    }

    fn patch_game(
        &self,
        game: Game,
        options: PatchOptions,
    ) -> BoxFuture<'static, StorageResult<Game>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .write(game, |stored, incoming| {
                    merge_game_patch(stored, incoming, options)
                })
                .await
        })
    }

    fn update_guess(&self, guess: Guess) -> BoxFuture<'static, StorageResult<Guess>> {
        let store = self.clone();
        Box::pin(async move { store.write(guess, merge_guess_update).await })
    }

    fn delete_game(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete::<Game>(key).await })
    }

    fn delete_guess(&self, key: ObjectKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete::<Guess>(key).await })
    }

    fn watch(&self) -> broadcast::Receiver<WatchEvent> {
        self.events.subscribe()
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let mut builder = store.client.get(&url);
            if let Some((ref user, ref pass)) = store.auth {
                builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
            }

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }
}
