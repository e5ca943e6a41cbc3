//! Alert persistence
//!
//! This module provides a trait-based abstraction over the document store
//! that holds alert records.
//!
//! ## Design
//!
//! - **Trait-based**: `AlertStore` allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Atomic dedup**: `insert_if_absent` is the only create path and closes
//!   the race between two writers seeing "no open alert" at the same time
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database with a partial unique index
//! - **In-Memory**: No persistence, for testing or throwaway runs
//!
//! ## Usage
//!
//! ```no_run
//! use network_monitoring::storage::{AlertStore, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./alerts.db").await?;
//!     println!("{:?}", backend.get_stats().await?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

use std::sync::Arc;

pub use backend::{AlertQuery, AlertStats, AlertStore, HealthStatus, InsertOutcome};
pub use error::{StorageError, StorageResult};

use crate::config::StorageConfig;

/// Open the alert store described by the configuration
pub async fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn AlertStore>> {
    match config {
        StorageConfig::None => {
            tracing::info!("using in-memory alert store, alerts will not survive a restart");
            Ok(Arc::new(memory::MemoryBackend::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { path } => Err(StorageError::Open(format!(
            "cannot open {}: built without the storage-sqlite feature",
            path.display()
        ))),
    }
}
