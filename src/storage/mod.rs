//! Storage boundary for the repositories.
//!
//! Everything a repository persists goes through [`StorageAdapter`]: bulk
//! read/write per record kind, per-id task operations, wipe, and
//! export/import of the full state. The trait is async because the remote
//! backend is; callers never assume synchronous completion.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{StorageConfig, StorageKind};
use crate::error::Result;
use crate::snapshot::Snapshot;
use crate::types::{Context, Task, View};

pub use local::LocalStore;
pub use remote::RemoteStore;

/// Capability interface every repository persists through.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// One-time setup (open checks, reachability probe). Idempotent.
    async fn init(&self) -> Result<()>;

    // Tasks
    async fn get_tasks(&self) -> Result<Vec<Task>>;
    async fn save_tasks(&self, tasks: &[Task]) -> Result<()>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>>;
    async fn create_task(&self, task: &Task) -> Result<()>;
    async fn update_task(&self, task: &Task) -> Result<()>;
    async fn delete_task(&self, id: &str) -> Result<()>;

    // Contexts
    async fn get_contexts(&self) -> Result<Vec<Context>>;
    async fn save_contexts(&self, contexts: &[Context]) -> Result<()>;

    // Settings (raw record so unknown keys pass through untouched)
    async fn get_settings(&self) -> Result<Value>;
    async fn save_settings(&self, settings: &Value) -> Result<()>;

    // Views
    async fn get_views(&self) -> Result<Vec<View>>;
    async fn save_views(&self, views: &[View]) -> Result<()>;

    /// Remove all persisted state for every record kind.
    async fn clear_all(&self) -> Result<()>;

    /// Bundle the full persisted state into a snapshot.
    async fn export_all(&self) -> Result<Snapshot>;

    /// Overwrite persisted state with the snapshot's non-null sections.
    async fn import_all(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Select and open the configured backend.
///
/// Called once at process start; repositories receive the returned adapter
/// as a constructor argument rather than reaching for a shared global.
pub fn open_adapter(config: &StorageConfig) -> Result<Arc<dyn StorageAdapter>> {
    match config.kind {
        StorageKind::Local => Ok(Arc::new(LocalStore::open(&config.db_path)?)),
        StorageKind::Remote => Ok(Arc::new(RemoteStore::new(
            config.api_base_url.clone(),
            config.api_token.clone(),
        ))),
    }
}
