mod config;
mod error;
mod models;
mod store;
mod watch;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchObjectStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}
