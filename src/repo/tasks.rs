//! Task repository: hierarchy maintenance, CRUD, and derived-state queries.

use chrono::{DateTime, NaiveTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ids;
use crate::snapshot::Snapshot;
use crate::storage::StorageAdapter;
use crate::types::{PRIORITY_DEFAULT, Task, TaskInput, TaskPatch};

/// Scoring function installed via [`TaskRepository::set_score_fn`].
pub type ScoreFn = Box<dyn Fn(&Task) -> f64 + Send + Sync>;

/// Owner of the task collection.
pub struct TaskRepository {
    storage: Arc<dyn StorageAdapter>,
    tasks: Vec<Task>,
    selected_task_id: Option<String>,
    last_error: Option<String>,
    score_fn: Option<ScoreFn>,
}

impl TaskRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            tasks: Vec::new(),
            selected_task_id: None,
            last_error: None,
            score_fn: None,
        }
    }

    /// Fetch the full collection from storage. A read failure is non-fatal:
    /// the collection falls back to empty and the error is recorded.
    pub async fn load(&mut self) {
        match self.storage.get_tasks().await {
            Ok(tasks) => {
                self.tasks = tasks;
                self.last_error = None;
            }
            Err(e) => {
                warn!("failed to load tasks: {e}");
                self.last_error = Some(e.to_string());
                self.tasks = Vec::new();
            }
        }
    }

    /// Create a task with the documented defaults and persist the mutated
    /// collection. When a parent is set, the new id is appended to the
    /// parent's `child_ids` in the same write.
    pub async fn create(&mut self, input: TaskInput) -> Result<Task> {
        let now = Utc::now();
        let order = input
            .order
            .unwrap_or_else(|| self.next_order(input.parent_id.as_deref()));

        let task = Task {
            id: ids::task_id(),
            title: input.title.unwrap_or_else(|| "New Task".to_string()),
            notes: input.notes.unwrap_or_default(),
            parent_id: input.parent_id,
            child_ids: Vec::new(),
            order,
            kind: input.kind.unwrap_or_else(|| "task".to_string()),
            goal_type: input.goal_type,
            tags: input.tags,
            flags: input.flags,
            is_starred: input.is_starred,
            start_date: input.start_date,
            start_time: input.start_time,
            due_date: input.due_date,
            due_time: input.due_time,
            completed_date: None,
            recurrence: input.recurrence,
            importance: input.importance.unwrap_or(PRIORITY_DEFAULT),
            urgency: input.urgency.unwrap_or(PRIORITY_DEFAULT),
            computed_score: 0.0,
            review_period: input.review_period,
            last_reviewed: None,
            is_completed: false,
            is_active: false,
            project_progress: 0,
            depends_on: input.depends_on,
            contexts: input.contexts,
            is_in_inbox: input.is_in_inbox,
            color: input.color,
            created_at: now,
            modified_at: now,
        };

        let mut next = self.tasks.clone();
        if let Some(parent_id) = &task.parent_id {
            // A dangling parent id is tolerated: weak reference semantics.
            if let Some(parent) = next.iter_mut().find(|t| &t.id == parent_id) {
                if !parent.child_ids.contains(&task.id) {
                    parent.child_ids.push(task.id.clone());
                    parent.modified_at = now;
                }
            }
        }
        next.push(task.clone());

        self.persist(&next).await?;
        self.tasks = next;
        debug!(id = %task.id, "created task");
        Ok(task)
    }

    /// Shallow-merge a patch over the stored record. The id is immutable:
    /// a patch carrying one is ignored. `modified_at` is always refreshed.
    pub async fn update(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        let mut next = self.tasks.clone();
        patch.apply(&mut next[index]);
        next[index].modified_at = Utc::now();

        self.persist(&next).await?;
        self.tasks = next;
        Ok(self.tasks[index].clone())
    }

    /// Delete a task; no-op when the id is absent.
    ///
    /// With `cascade` every transitive descendant goes too (collected with a
    /// work-list, not recursion). Without it, children survive with their
    /// `parent_id` left dangling — a surfaced inconsistency, not auto-repaired.
    pub async fn delete(&mut self, id: &str, cascade: bool) -> Result<()> {
        let Some(target) = self.get(id).cloned() else {
            return Ok(());
        };

        let mut doomed: HashSet<String> = HashSet::new();
        doomed.insert(target.id.clone());
        if cascade {
            let mut stack = target.child_ids.clone();
            while let Some(child_id) = stack.pop() {
                if !doomed.insert(child_id.clone()) {
                    continue;
                }
                if let Some(child) = self.get(&child_id) {
                    stack.extend(child.child_ids.iter().cloned());
                }
            }
        }

        let mut next: Vec<Task> = self
            .tasks
            .iter()
            .filter(|t| !doomed.contains(&t.id))
            .cloned()
            .collect();

        if let Some(parent_id) = &target.parent_id {
            if let Some(parent) = next.iter_mut().find(|t| &t.id == parent_id) {
                parent.child_ids.retain(|cid| cid != id);
                parent.modified_at = Utc::now();
            }
        }

        self.persist(&next).await?;
        self.tasks = next;
        if self
            .selected_task_id
            .as_ref()
            .is_some_and(|sel| doomed.contains(sel))
        {
            self.selected_task_id = None;
        }
        debug!(id, cascade, removed = doomed.len(), "deleted task");
        Ok(())
    }

    /// Flip completion; `completed_date` is set exactly when completion
    /// toggles on and cleared when it toggles off.
    pub async fn toggle_complete(&mut self, id: &str) -> Result<Task> {
        let task = self
            .get(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
        let completing = !task.is_completed;
        let patch = TaskPatch {
            is_completed: Some(completing),
            completed_date: Some(completing.then(Utc::now)),
            ..Default::default()
        };
        self.update(id, patch).await
    }

    /// Stamp `last_reviewed` with the current instant.
    pub async fn mark_reviewed(&mut self, id: &str) -> Result<Task> {
        let patch = TaskPatch {
            last_reviewed: Some(Some(Utc::now())),
            ..Default::default()
        };
        self.update(id, patch).await
    }

    // -------------------------------------------------------------------------
    // Derived queries (pure functions over the in-memory collection)
    // -------------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks with no parent.
    pub fn root_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.parent_id.is_none()).collect()
    }

    /// Children of a task, ascending by `order`.
    pub fn children_of(&self, parent_id: &str) -> Vec<&Task> {
        let mut children: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|t| t.parent_id.as_deref() == Some(parent_id))
            .collect();
        children.sort_by_key(|t| t.order);
        children
    }

    /// Not completed and already startable. `depends_on` is deliberately not
    /// consulted; dependency gating is a separate future rule.
    pub fn active_tasks(&self) -> Vec<&Task> {
        let now = Utc::now();
        self.tasks
            .iter()
            .filter(|t| !t.is_completed && Self::has_started(t, now))
            .collect()
    }

    /// Root tasks still sitting in the inbox.
    pub fn inbox_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.parent_id.is_none() && t.is_in_inbox)
            .collect()
    }

    /// Not completed and past the due date.
    pub fn overdue_tasks(&self) -> Vec<&Task> {
        let now = Utc::now();
        self.tasks
            .iter()
            .filter(|t| {
                !t.is_completed
                    && t.due_date
                        .is_some_and(|due| due.and_time(NaiveTime::MIN).and_utc() < now)
            })
            .collect()
    }

    /// Tasks marked as goals.
    pub fn goal_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.goal_type.is_some()).collect()
    }

    /// Tasks whose review interval has elapsed (or that were never reviewed).
    pub fn review_tasks(&self) -> Vec<&Task> {
        let now = Utc::now();
        self.tasks
            .iter()
            .filter(|t| match t.review_period {
                None => false,
                Some(period) => match t.last_reviewed {
                    None => true,
                    Some(last) => (now - last).num_days() >= period,
                },
            })
            .collect()
    }

    fn has_started(task: &Task, now: DateTime<Utc>) -> bool {
        match task.start_date {
            Some(date) => date.and_time(NaiveTime::MIN).and_utc() <= now,
            None => true,
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn select(&mut self, id: impl Into<String>) {
        self.selected_task_id = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_task_id = None;
    }

    /// The currently focused task, if the selection resolves.
    pub fn selected_task(&self) -> Option<&Task> {
        self.selected_task_id.as_deref().and_then(|id| self.get(id))
    }

    // -------------------------------------------------------------------------
    // Scores
    // -------------------------------------------------------------------------

    /// Install a scoring function consumed by [`recompute_scores`].
    ///
    /// [`recompute_scores`]: TaskRepository::recompute_scores
    pub fn set_score_fn(&mut self, score_fn: ScoreFn) {
        self.score_fn = Some(score_fn);
    }

    /// Recompute `computed_score` for every task and persist. Without an
    /// installed scoring function this is a no-op: scores stay at their
    /// stored values.
    pub async fn recompute_scores(&mut self) -> Result<()> {
        let Some(score_fn) = &self.score_fn else {
            return Ok(());
        };
        let mut next = self.tasks.clone();
        for task in &mut next {
            task.computed_score = score_fn(task);
        }
        self.persist(&next).await?;
        self.tasks = next;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Export / import / wipe
    // -------------------------------------------------------------------------

    /// Bulk export of the full persisted state.
    pub async fn export_all(&mut self) -> Result<Snapshot> {
        match self.storage.export_all().await {
            Ok(snapshot) => {
                self.last_error = None;
                Ok(snapshot)
            }
            Err(e) => {
                warn!("export failed: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Validate and import a snapshot payload, then reload from storage.
    pub async fn import_all(&mut self, payload: Value) -> Result<()> {
        let snapshot = Snapshot::from_value(payload)?;
        if let Err(e) = self.storage.import_all(&snapshot).await {
            warn!("import failed: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        self.load().await;
        Ok(())
    }

    /// Wipe all persisted state and the in-memory collection.
    pub async fn clear_all(&mut self) -> Result<()> {
        if let Err(e) = self.storage.clear_all().await {
            warn!("clear failed: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        self.tasks.clear();
        self.selected_task_id = None;
        Ok(())
    }

    /// Human-readable message of the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn next_order(&self, parent_id: Option<&str>) -> i64 {
        self.tasks
            .iter()
            .filter(|t| t.parent_id.as_deref() == parent_id)
            .map(|t| t.order)
            .max()
            .map_or(0, |max| max + 1)
    }

    async fn persist(&mut self, next: &[Task]) -> Result<()> {
        if let Err(e) = self.storage.save_tasks(next).await {
            warn!("failed to persist tasks: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        Ok(())
    }
}
