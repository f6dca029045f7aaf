//! Context repository: tag-like contexts plus the active-filter set.
//!
//! Unlike tasks, contexts keep no `child_ids` back-pointer; children are
//! found by scanning for a matching `parent_id`.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ids;
use crate::storage::StorageAdapter;
use crate::types::{Context, ContextInput, ContextPatch};

/// The default seed set, created on demand (never automatically).
const DEFAULT_CONTEXTS: &[(&str, &str, &str)] = &[
    ("@Work", "briefcase", "#4A90E2"),
    ("@Home", "home", "#7ED321"),
    ("@Computer", "laptop", "#9B9B9B"),
    ("@Phone", "phone", "#F5A623"),
    ("@Errands", "shopping-cart", "#D0021B"),
];

/// Owner of the context collection.
pub struct ContextRepository {
    storage: Arc<dyn StorageAdapter>,
    contexts: Vec<Context>,
    active_context_ids: Vec<String>,
    last_error: Option<String>,
}

impl ContextRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            contexts: Vec::new(),
            active_context_ids: Vec::new(),
            last_error: None,
        }
    }

    /// Fetch the full collection; a read failure falls back to empty and is
    /// recorded, not propagated.
    pub async fn load(&mut self) {
        match self.storage.get_contexts().await {
            Ok(contexts) => {
                self.contexts = contexts;
                self.last_error = None;
            }
            Err(e) => {
                warn!("failed to load contexts: {e}");
                self.last_error = Some(e.to_string());
                self.contexts = Vec::new();
            }
        }
    }

    pub async fn create(&mut self, input: ContextInput) -> Result<Context> {
        let now = Utc::now();
        let context = Context {
            id: ids::context_id(),
            name: input.name.unwrap_or_else(|| "New Context".to_string()),
            icon: input.icon,
            color: input.color,
            parent_id: input.parent_id,
            schedule: input.schedule,
            created_at: now,
            modified_at: now,
        };

        let mut next = self.contexts.clone();
        next.push(context.clone());
        self.persist(&next).await?;
        self.contexts = next;
        debug!(id = %context.id, "created context");
        Ok(context)
    }

    pub async fn update(&mut self, id: &str, patch: ContextPatch) -> Result<Context> {
        let index = self
            .contexts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::ContextNotFound(id.to_string()))?;

        let mut next = self.contexts.clone();
        patch.apply(&mut next[index]);
        next[index].modified_at = Utc::now();

        self.persist(&next).await?;
        self.contexts = next;
        Ok(self.contexts[index].clone())
    }

    /// Delete a context; no-op when absent. The id is also dropped from the
    /// active set.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        if !self.contexts.iter().any(|c| c.id == id) {
            return Ok(());
        }
        let next: Vec<Context> = self
            .contexts
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        self.persist(&next).await?;
        self.contexts = next;
        self.active_context_ids.retain(|cid| cid != id);
        Ok(())
    }

    /// Seed the default context set. Persisted in one write.
    pub async fn create_default_contexts(&mut self) -> Result<Vec<Context>> {
        let now = Utc::now();
        let seeded: Vec<Context> = DEFAULT_CONTEXTS
            .iter()
            .map(|(name, icon, color)| Context {
                id: ids::context_id(),
                name: (*name).to_string(),
                icon: Some((*icon).to_string()),
                color: Some((*color).to_string()),
                parent_id: None,
                schedule: None,
                created_at: now,
                modified_at: now,
            })
            .collect();

        let mut next = self.contexts.clone();
        next.extend(seeded.iter().cloned());
        self.persist(&next).await?;
        self.contexts = next;
        Ok(seeded)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    pub fn get(&self, id: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.id == id)
    }

    pub fn root_contexts(&self) -> Vec<&Context> {
        self.contexts
            .iter()
            .filter(|c| c.parent_id.is_none())
            .collect()
    }

    /// Children found by scan; there is no back-pointer list to consult.
    pub fn children_of(&self, parent_id: &str) -> Vec<&Context> {
        self.contexts
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(parent_id))
            .collect()
    }

    /// Whether the context is currently open. The schedule field is stored
    /// but not evaluated: every existing context reports open.
    pub fn is_context_open(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Contexts currently open per [`is_context_open`].
    ///
    /// [`is_context_open`]: ContextRepository::is_context_open
    pub fn available_contexts(&self) -> Vec<&Context> {
        self.contexts
            .iter()
            .filter(|c| self.is_context_open(&c.id))
            .collect()
    }

    // -------------------------------------------------------------------------
    // Active-filter set (selection state, never persisted)
    // -------------------------------------------------------------------------

    pub fn active_context_ids(&self) -> &[String] {
        &self.active_context_ids
    }

    /// The active contexts that still resolve to a record.
    pub fn active_contexts(&self) -> Vec<&Context> {
        self.active_context_ids
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Toggle one id's membership in the active set.
    pub fn toggle_context(&mut self, id: &str) {
        if let Some(index) = self.active_context_ids.iter().position(|cid| cid == id) {
            self.active_context_ids.remove(index);
        } else {
            self.active_context_ids.push(id.to_string());
        }
    }

    /// Replace the active set wholesale (duplicates collapse).
    pub fn set_active_contexts(&mut self, ids: Vec<String>) {
        let mut deduped = Vec::with_capacity(ids.len());
        for id in ids {
            if !deduped.contains(&id) {
                deduped.push(id);
            }
        }
        self.active_context_ids = deduped;
    }

    pub fn clear_active_contexts(&mut self) {
        self.active_context_ids.clear();
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn persist(&mut self, next: &[Context]) -> Result<()> {
        if let Err(e) = self.storage.save_contexts(next).await {
            warn!("failed to persist contexts: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        Ok(())
    }
}
