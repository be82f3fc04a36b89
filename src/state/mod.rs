//! State shared by the HTTP handlers.

use std::sync::Arc;

use crate::{config::AppConfig, dao::object_store::ObjectStore};

/// Handle cloned into every handler.
pub type SharedState = Arc<AppState>;

/// State shared by every HTTP handler.
pub struct AppState {
    store: Arc<dyn ObjectStore>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(store: Arc<dyn ObjectStore>, config: AppConfig) -> SharedState {
        Arc::new(Self { store, config })
    }

    /// Object store the API reads and writes.
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
