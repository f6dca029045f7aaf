//! Local storage backend.
//!
//! A single SQLite table acts as a key-value store: one row per record kind,
//! value JSON-serialized. Running out of disk surfaces as
//! [`Error::QuotaExceeded`] rather than a generic storage failure.

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::StorageAdapter;
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use crate::types::{Context, Task, View};

const KIND_TASKS: &str = "tasks";
const KIND_CONTEXTS: &str = "contexts";
const KIND_SETTINGS: &str = "settings";
const KIND_VIEWS: &str = "views";

/// SQLite-backed key-value store, one entry per record kind.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(Error::storage)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;",
        )?;
        Self::from_conn(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                 kind TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn read_kind<T: DeserializeOwned>(&self, kind: &str) -> Result<Option<T>> {
        let conn = self.conn.lock().unwrap();
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM records WHERE kind = ?1",
                params![kind],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(json) => {
                let value = serde_json::from_str(&json).map_err(Error::storage)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write_kind<T: Serialize + ?Sized>(&self, kind: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(Error::storage)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO records (kind, value) VALUES (?1, ?2)
             ON CONFLICT(kind) DO UPDATE SET value = excluded.value",
            params![kind, json],
        )?;
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for LocalStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn get_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read_kind(KIND_TASKS)?.unwrap_or_default())
    }

    async fn save_tasks(&self, tasks: &[Task]) -> Result<()> {
        self.write_kind(KIND_TASKS, tasks)
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        let tasks = self.get_tasks().await?;
        Ok(tasks.into_iter().find(|t| t.id == id))
    }

    async fn create_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.get_tasks().await?;
        tasks.push(task.clone());
        self.save_tasks(&tasks).await
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let mut tasks = self.get_tasks().await?;
        let slot = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| Error::TaskNotFound(task.id.clone()))?;
        *slot = task.clone();
        self.save_tasks(&tasks).await
    }

    async fn delete_task(&self, id: &str) -> Result<()> {
        let mut tasks = self.get_tasks().await?;
        tasks.retain(|t| t.id != id);
        self.save_tasks(&tasks).await
    }

    async fn get_contexts(&self) -> Result<Vec<Context>> {
        Ok(self.read_kind(KIND_CONTEXTS)?.unwrap_or_default())
    }

    async fn save_contexts(&self, contexts: &[Context]) -> Result<()> {
        self.write_kind(KIND_CONTEXTS, contexts)
    }

    async fn get_settings(&self) -> Result<Value> {
        Ok(self
            .read_kind(KIND_SETTINGS)?
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    async fn save_settings(&self, settings: &Value) -> Result<()> {
        self.write_kind(KIND_SETTINGS, settings)
    }

    async fn get_views(&self) -> Result<Vec<View>> {
        Ok(self.read_kind(KIND_VIEWS)?.unwrap_or_default())
    }

    async fn save_views(&self, views: &[View]) -> Result<()> {
        self.write_kind(KIND_VIEWS, views)
    }

    async fn clear_all(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM records", [])?;
        Ok(())
    }

    async fn export_all(&self) -> Result<Snapshot> {
        Ok(Snapshot::new(
            self.get_tasks().await?,
            self.get_contexts().await?,
            self.get_settings().await?,
            self.get_views().await?,
        ))
    }

    async fn import_all(&self, snapshot: &Snapshot) -> Result<()> {
        self.save_tasks(&snapshot.tasks).await?;
        if let Some(contexts) = &snapshot.contexts {
            self.save_contexts(contexts).await?;
        }
        if let Some(settings) = &snapshot.settings {
            self.save_settings(settings).await?;
        }
        if let Some(views) = &snapshot.views {
            self.save_views(views).await?;
        }
        Ok(())
    }
}
