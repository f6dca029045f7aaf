//! View repository: saved filter/sort/group configurations.
//!
//! The first load of an empty collection seeds six built-in views. Built-ins
//! can be edited but never deleted.

use chrono::Utc;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ids;
use crate::storage::StorageAdapter;
use crate::types::{Grouping, SortDirection, Sorting, View, ViewInput, ViewPatch};

/// Owner of the view collection.
pub struct ViewRepository {
    storage: Arc<dyn StorageAdapter>,
    views: Vec<View>,
    current_view_id: Option<String>,
    last_error: Option<String>,
}

impl ViewRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            views: Vec::new(),
            current_view_id: None,
            last_error: None,
        }
    }

    /// Fetch the collection; seed the built-ins when it comes back empty.
    ///
    /// Seeding is idempotent — a non-empty collection is never re-seeded.
    /// After load, an unset current view falls to the first entry.
    pub async fn load(&mut self) -> Result<()> {
        match self.storage.get_views().await {
            Ok(views) => {
                self.views = views;
                self.last_error = None;
            }
            Err(e) => {
                warn!("failed to load views: {e}");
                self.last_error = Some(e.to_string());
                self.views = Vec::new();
            }
        }

        if self.views.is_empty() {
            self.seed_built_ins().await?;
        }
        if self.current_view_id.is_none() {
            self.current_view_id = self.views.first().map(|v| v.id.clone());
        }
        Ok(())
    }

    pub async fn create(&mut self, input: ViewInput) -> Result<View> {
        let now = Utc::now();
        let view = View {
            id: ids::view_id(),
            name: input.name.unwrap_or_else(|| "New View".to_string()),
            kind: input.kind.unwrap_or_else(|| "custom".to_string()),
            is_built_in: input.is_built_in,
            filters: input.filters,
            sorting: input.sorting.unwrap_or_default(),
            grouping: input.grouping,
            columns: input.columns,
            show_completed: input.show_completed.unwrap_or(true),
            show_hierarchy: input.show_hierarchy.unwrap_or(true),
            created_at: now,
            modified_at: now,
        };

        let mut next = self.views.clone();
        next.push(view.clone());
        self.persist(&next).await?;
        self.views = next;
        debug!(id = %view.id, name = %view.name, "created view");
        Ok(view)
    }

    pub async fn update(&mut self, id: &str, patch: ViewPatch) -> Result<View> {
        let index = self
            .views
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| Error::ViewNotFound(id.to_string()))?;

        let mut next = self.views.clone();
        patch.apply(&mut next[index]);
        next[index].modified_at = Utc::now();

        self.persist(&next).await?;
        self.views = next;
        Ok(self.views[index].clone())
    }

    /// Delete a view; no-op when absent. Built-ins are protected, checked
    /// before any persistence. Deleting the current view moves the pointer
    /// to the first remaining one.
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        let Some(view) = self.get(id) else {
            return Ok(());
        };
        if view.is_built_in {
            return Err(Error::BuiltInProtected(view.name.clone()));
        }

        let next: Vec<View> = self.views.iter().filter(|v| v.id != id).cloned().collect();
        self.persist(&next).await?;
        self.views = next;

        if self.current_view_id.as_deref() == Some(id) {
            self.current_view_id = self.views.first().map(|v| v.id.clone());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn get(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    pub fn built_in_views(&self) -> Vec<&View> {
        self.views.iter().filter(|v| v.is_built_in).collect()
    }

    pub fn custom_views(&self) -> Vec<&View> {
        self.views.iter().filter(|v| !v.is_built_in).collect()
    }

    pub fn set_current_view(&mut self, id: impl Into<String>) {
        self.current_view_id = Some(id.into());
    }

    /// The active view, if the pointer resolves.
    pub fn current_view(&self) -> Option<&View> {
        self.current_view_id.as_deref().and_then(|id| self.get(id))
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    async fn seed_built_ins(&mut self) -> Result<()> {
        info!("seeding built-in views");
        for input in built_in_definitions() {
            self.create(input).await?;
        }
        Ok(())
    }

    async fn persist(&mut self, next: &[View]) -> Result<()> {
        if let Err(e) = self.storage.save_views(next).await {
            warn!("failed to persist views: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        Ok(())
    }
}

fn filter_map(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| (*n).to_string()).collect()
}

/// The six views shipped with every installation.
fn built_in_definitions() -> Vec<ViewInput> {
    vec![
        ViewInput {
            name: Some("All Tasks".to_string()),
            kind: Some("outline".to_string()),
            is_built_in: true,
            filters: BTreeMap::new(),
            sorting: Some(Sorting::new("order", SortDirection::Asc)),
            grouping: None,
            columns: columns(&["title", "dueDate", "importance", "contexts"]),
            show_completed: Some(true),
            show_hierarchy: Some(true),
        },
        ViewInput {
            name: Some("To-Do".to_string()),
            kind: Some("todo".to_string()),
            is_built_in: true,
            filters: filter_map(&[("isCompleted", json!(false))]),
            sorting: Some(Sorting::new("computedScore", SortDirection::Desc)),
            grouping: None,
            columns: columns(&["title", "dueDate", "importance", "urgency"]),
            show_completed: Some(false),
            show_hierarchy: Some(false),
        },
        ViewInput {
            name: Some("Inbox".to_string()),
            kind: Some("inbox".to_string()),
            is_built_in: true,
            filters: filter_map(&[("isInInbox", json!(true))]),
            sorting: Some(Sorting::new("createdAt", SortDirection::Desc)),
            grouping: None,
            columns: columns(&["title", "createdAt"]),
            show_completed: Some(false),
            show_hierarchy: Some(false),
        },
        ViewInput {
            name: Some("Active Actions".to_string()),
            kind: Some("active".to_string()),
            is_built_in: true,
            filters: filter_map(&[("isActive", json!(true)), ("isCompleted", json!(false))]),
            sorting: Some(Sorting::new("computedScore", SortDirection::Desc)),
            grouping: None,
            columns: columns(&["title", "dueDate", "importance"]),
            show_completed: Some(false),
            show_hierarchy: Some(false),
        },
        ViewInput {
            name: Some("Goals".to_string()),
            kind: Some("goals".to_string()),
            is_built_in: true,
            filters: filter_map(&[("hasGoalType", json!(true))]),
            sorting: Some(Sorting::new("importance", SortDirection::Desc)),
            grouping: Some(Grouping {
                field: "goalType".to_string(),
            }),
            columns: columns(&["title", "goalType", "dueDate"]),
            show_completed: Some(false),
            show_hierarchy: Some(true),
        },
        ViewInput {
            name: Some("Review".to_string()),
            kind: Some("review".to_string()),
            is_built_in: true,
            filters: filter_map(&[("needsReview", json!(true))]),
            sorting: Some(Sorting::new("lastReviewed", SortDirection::Asc)),
            grouping: None,
            columns: columns(&["title", "lastReviewed", "reviewPeriod"]),
            show_completed: Some(false),
            show_hierarchy: Some(true),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;

    async fn repo() -> ViewRepository {
        let storage = Arc::new(LocalStore::open_in_memory().unwrap());
        let mut repo = ViewRepository::new(storage);
        repo.load().await.unwrap();
        repo
    }

    #[tokio::test]
    async fn first_load_seeds_six_built_ins() {
        let repo = repo().await;
        assert_eq!(repo.views().len(), 6);
        assert_eq!(repo.built_in_views().len(), 6);
        assert!(repo.custom_views().is_empty());

        let names: Vec<&str> = repo.views().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "All Tasks",
                "To-Do",
                "Inbox",
                "Active Actions",
                "Goals",
                "Review"
            ]
        );
    }

    #[tokio::test]
    async fn seed_literals_match_the_shipped_definitions() {
        let repo = repo().await;

        let todo = repo.views().iter().find(|v| v.name == "To-Do").unwrap();
        assert_eq!(todo.kind, "todo");
        assert_eq!(todo.filters.get("isCompleted"), Some(&json!(false)));
        assert_eq!(todo.sorting.field, "computedScore");
        assert_eq!(todo.sorting.direction, SortDirection::Desc);
        assert!(!todo.show_completed);
        assert!(!todo.show_hierarchy);

        let goals = repo.views().iter().find(|v| v.name == "Goals").unwrap();
        assert_eq!(goals.grouping.as_ref().unwrap().field, "goalType");
        assert!(goals.show_hierarchy);

        let review = repo.views().iter().find(|v| v.name == "Review").unwrap();
        assert_eq!(review.sorting.field, "lastReviewed");
        assert_eq!(review.sorting.direction, SortDirection::Asc);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let storage = Arc::new(LocalStore::open_in_memory().unwrap());
        let mut repo = ViewRepository::new(Arc::clone(&storage) as Arc<dyn StorageAdapter>);
        repo.load().await.unwrap();
        assert_eq!(repo.views().len(), 6);

        // A second loader over the same storage sees a populated collection.
        let mut again = ViewRepository::new(storage);
        again.load().await.unwrap();
        assert_eq!(again.views().len(), 6);
    }

    #[tokio::test]
    async fn current_view_defaults_to_first() {
        let repo = repo().await;
        assert_eq!(repo.current_view().unwrap().name, "All Tasks");
    }

    #[tokio::test]
    async fn built_in_delete_is_rejected_and_collection_unchanged() {
        let mut repo = repo().await;
        let inbox_id = repo
            .views()
            .iter()
            .find(|v| v.name == "Inbox")
            .unwrap()
            .id
            .clone();

        let err = repo.delete(&inbox_id).await.unwrap_err();
        assert!(matches!(err, Error::BuiltInProtected(_)));
        assert_eq!(repo.views().len(), 6);
        assert!(repo.get(&inbox_id).is_some());
    }

    #[tokio::test]
    async fn custom_view_lifecycle() {
        let mut repo = repo().await;
        let view = repo
            .create(ViewInput {
                name: Some("Next 7 Days".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(view.kind, "custom");
        assert!(!view.is_built_in);
        assert_eq!(view.sorting, Sorting::default());
        assert!(view.show_completed && view.show_hierarchy);

        let updated = repo
            .update(
                &view.id,
                ViewPatch {
                    id: Some("view_hijack".to_string()),
                    name: Some("This Week".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, view.id);
        assert_eq!(updated.name, "This Week");

        repo.delete(&view.id).await.unwrap();
        assert!(repo.get(&view.id).is_none());
        assert_eq!(repo.views().len(), 6);
    }

    #[tokio::test]
    async fn deleting_current_view_moves_pointer_to_first() {
        let mut repo = repo().await;
        let view = repo
            .create(ViewInput {
                name: Some("Scratch".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.set_current_view(view.id.clone());
        assert_eq!(repo.current_view().unwrap().id, view.id);

        repo.delete(&view.id).await.unwrap();
        assert_eq!(repo.current_view().unwrap().name, "All Tasks");
    }

    #[tokio::test]
    async fn update_unknown_view_fails() {
        let mut repo = repo().await;
        let err = repo
            .update("view_ghost", ViewPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ViewNotFound(_)));
    }
}
