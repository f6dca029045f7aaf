//! taskdeck: a hierarchical task-organization engine.
//!
//! Tasks form an outline (parents, ordered children), carry contexts,
//! priorities, and scheduling attributes, and are queried through derived
//! views (active, overdue, review-due, goals). Four repositories own the
//! collections and persist them through a pluggable storage contract.

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod merge;
pub mod repo;
pub mod snapshot;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use repo::{ContextRepository, SettingsRepository, TaskRepository, ViewRepository};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use storage::{StorageAdapter, open_adapter};
