//! nullgame-controller binary entrypoint wiring the object store, the
//! reconciliation controllers and the REST API.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nullgame_controller::{
    config::AppConfig,
    controller::{GameReconciler, GuessReconciler, guess_to_game},
    dao::{
        models::Kind,
        object_store::{MemoryStore, ObjectStore},
    },
    routes,
    runtime::Controller,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let store = select_store().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let games = Controller::new(
        "game",
        Kind::Game,
        store.clone(),
        GameReconciler::new(store.clone(), config.reconciler()),
    )
    .watches(Kind::Guess, guess_to_game)
    .workers(config.workers)
    .backoff(config.retry_initial_delay, config.retry_max_delay);

    let guesses = Controller::new(
        "guess-labeler",
        Kind::Guess,
        store.clone(),
        GuessReconciler::new(store.clone()),
    )
    .workers(config.workers)
    .backoff(config.retry_initial_delay, config.retry_max_delay);

    let controllers = [
        tokio::spawn(games.run(shutdown_rx.clone())),
        tokio::spawn(guesses.run(shutdown_rx)),
    ];

    // Build the HTTP router once the shared state is ready.
    let app = build_router(AppState::new(store, config.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    info!("server stopped; shutting down controllers");
    let _ = shutdown_tx.send(true);
    for handle in controllers {
        handle.await.context("joining controller task")?;
    }

    Ok(())
}

/// CouchDB when `COUCH_BASE_URL` and `COUCH_DB` are set, memory otherwise.
async fn select_store() -> Arc<dyn ObjectStore> {
    if let Some(store) = couch_store().await {
        return store;
    }
    info!("no CouchDB configured; using the in-memory object store");
    Arc::new(MemoryStore::new())
}

#[cfg(feature = "couch-store")]
async fn couch_store() -> Option<Arc<dyn ObjectStore>> {
    use nullgame_controller::{
        dao::{
            object_store::couchdb::{CouchConfig, CouchObjectStore},
            storage::StorageError,
        },
        services::storage_supervisor::connect_with_retry,
    };

    let config = match CouchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            info!(reason = %err, "CouchDB store not selected");
            return None;
        }
    };

    let store = connect_with_retry(|| {
        let config = config.clone();
        async move {
            let store = CouchObjectStore::connect(config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ObjectStore>)
        }
    })
    .await;
    Some(store)
}

#[cfg(not(feature = "couch-store"))]
async fn couch_store() -> Option<Arc<dyn ObjectStore>> {
    None
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
