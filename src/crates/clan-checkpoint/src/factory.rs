//! Open a checkpoint store by backend name
//!
//! Lets configuration files choose a backend without the caller naming a
//! concrete type:
//!
//! | `kind`              | Backend                    | `connection`                     |
//! |---------------------|----------------------------|----------------------------------|
//! | `memory`            | [`InMemoryCheckpointStore`] | ignored                          |
//! | `sqlite`, `sqlite3` | [`SqliteCheckpointStore`]   | database path, or `:memory:`     |
//!
//! ```rust
//! use clan_checkpoint::factory::open_store;
//!
//! let store = open_store("sqlite3", ":memory:").unwrap();
//! assert!(open_store("postgres", "postgres://localhost").is_err());
//! # drop(store);
//! ```

use crate::{
    error::{CheckpointError, Result},
    memory::InMemoryCheckpointStore,
    sqlite::SqliteCheckpointStore,
    traits::CheckpointStore,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SQLITE_IN_MEMORY: &str = ":memory:";

/// Declarative description of a checkpoint backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend name (`memory`, `sqlite`, `sqlite3`)
    pub kind: String,

    /// Backend-specific connection string
    #[serde(default)]
    pub connection: String,
}

impl StoreConfig {
    pub fn new(kind: impl Into<String>, connection: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            connection: connection.into(),
        }
    }

    /// Open the described store
    pub fn open(&self) -> Result<Arc<dyn CheckpointStore>> {
        open_store(&self.kind, &self.connection)
    }
}

/// Open a checkpoint store from a backend name and connection string
pub fn open_store(kind: &str, connection: &str) -> Result<Arc<dyn CheckpointStore>> {
    match kind {
        "memory" => Ok(Arc::new(InMemoryCheckpointStore::new())),
        "sqlite" | "sqlite3" => {
            if connection.is_empty() {
                return Err(CheckpointError::Invalid(
                    "sqlite checkpointer requires a database path".to_string(),
                ));
            }
            let store = if connection == SQLITE_IN_MEMORY {
                SqliteCheckpointStore::open_in_memory()?
            } else {
                SqliteCheckpointStore::open(connection)?
            };
            Ok(Arc::new(store))
        }
        other => Err(CheckpointError::UnknownBackend(other.to_string())),
    }
}
