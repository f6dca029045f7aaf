//! Core entity types: tasks, contexts, views, settings.
//!
//! All entities serialize camelCase so exports are interchangeable with the
//! wire format the remote backend speaks.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Default priority weight for both importance and urgency.
pub const PRIORITY_DEFAULT: i64 = 100;

/// A single periodic repetition rule. Stored and round-tripped; the engine
/// only ever inspects presence/absence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub every: u32,
    pub unit: RecurrenceUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceUnit {
    Day,
    Week,
    Month,
}

/// A task in the outline hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub notes: String,

    // Hierarchy
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    pub order: i64,

    // Classification
    #[serde(rename = "type")]
    pub kind: String,
    pub goal_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub is_starred: bool,

    // Scheduling
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub completed_date: Option<DateTime<Utc>>,
    pub recurrence: Option<Recurrence>,

    // Priority
    pub importance: i64,
    pub urgency: i64,
    #[serde(default)]
    pub computed_score: f64,

    // Review & goals
    pub review_period: Option<i64>,
    pub last_reviewed: Option<DateTime<Utc>>,

    // Status
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub project_progress: u8,

    // Dependencies (declared only; activation never consults them)
    #[serde(default)]
    pub depends_on: Vec<String>,

    // Organization
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub is_in_inbox: bool,
    pub color: Option<String>,

    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Creation payload for a task. Absent fields take the documented defaults.
#[derive(Debug, Clone, Default)]
pub struct TaskInput {
    pub title: Option<String>,
    pub notes: Option<String>,
    pub parent_id: Option<String>,
    /// Explicit sibling rank; computed from siblings when absent.
    pub order: Option<i64>,
    pub kind: Option<String>,
    pub importance: Option<i64>,
    pub urgency: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub contexts: Vec<String>,
    pub tags: Vec<String>,
    pub flags: Vec<String>,
    pub is_starred: bool,
    pub is_in_inbox: bool,
    pub color: Option<String>,
    pub goal_type: Option<String>,
    pub review_period: Option<i64>,
    pub recurrence: Option<Recurrence>,
    pub depends_on: Vec<String>,
}

/// Partial update for a task.
///
/// `Some(x)` sets a field; `None` leaves it alone. Nullable fields are
/// double-wrapped: `Some(None)` clears, `Some(Some(x))` sets. The `id` field
/// is accepted and ignored — stored ids are immutable.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub id: Option<String>,
    pub title: Option<String>,
    pub notes: Option<String>,
    pub parent_id: Option<Option<String>>,
    pub child_ids: Option<Vec<String>>,
    pub order: Option<i64>,
    pub kind: Option<String>,
    pub goal_type: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub flags: Option<Vec<String>>,
    pub is_starred: Option<bool>,
    pub start_date: Option<Option<NaiveDate>>,
    pub start_time: Option<Option<NaiveTime>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
    pub completed_date: Option<Option<DateTime<Utc>>>,
    pub recurrence: Option<Option<Recurrence>>,
    pub importance: Option<i64>,
    pub urgency: Option<i64>,
    pub computed_score: Option<f64>,
    pub review_period: Option<Option<i64>>,
    pub last_reviewed: Option<Option<DateTime<Utc>>>,
    pub is_completed: Option<bool>,
    pub is_active: Option<bool>,
    pub project_progress: Option<u8>,
    pub depends_on: Option<Vec<String>>,
    pub contexts: Option<Vec<String>>,
    pub is_in_inbox: Option<bool>,
    pub color: Option<Option<String>>,
}

impl TaskPatch {
    /// Shallow-merge this patch into `task`. The stored id always wins.
    pub fn apply(self, task: &mut Task) {
        if let Some(v) = self.title {
            task.title = v;
        }
        if let Some(v) = self.notes {
            task.notes = v;
        }
        if let Some(v) = self.parent_id {
            task.parent_id = v;
        }
        if let Some(v) = self.child_ids {
            task.child_ids = v;
        }
        if let Some(v) = self.order {
            task.order = v;
        }
        if let Some(v) = self.kind {
            task.kind = v;
        }
        if let Some(v) = self.goal_type {
            task.goal_type = v;
        }
        if let Some(v) = self.tags {
            task.tags = v;
        }
        if let Some(v) = self.flags {
            task.flags = v;
        }
        if let Some(v) = self.is_starred {
            task.is_starred = v;
        }
        if let Some(v) = self.start_date {
            task.start_date = v;
        }
        if let Some(v) = self.start_time {
            task.start_time = v;
        }
        if let Some(v) = self.due_date {
            task.due_date = v;
        }
        if let Some(v) = self.due_time {
            task.due_time = v;
        }
        if let Some(v) = self.completed_date {
            task.completed_date = v;
        }
        if let Some(v) = self.recurrence {
            task.recurrence = v;
        }
        if let Some(v) = self.importance {
            task.importance = v;
        }
        if let Some(v) = self.urgency {
            task.urgency = v;
        }
        if let Some(v) = self.computed_score {
            task.computed_score = v;
        }
        if let Some(v) = self.review_period {
            task.review_period = v;
        }
        if let Some(v) = self.last_reviewed {
            task.last_reviewed = v;
        }
        if let Some(v) = self.is_completed {
            task.is_completed = v;
        }
        if let Some(v) = self.is_active {
            task.is_active = v;
        }
        if let Some(v) = self.project_progress {
            task.project_progress = v;
        }
        if let Some(v) = self.depends_on {
            task.depends_on = v;
        }
        if let Some(v) = self.contexts {
            task.contexts = v;
        }
        if let Some(v) = self.is_in_inbox {
            task.is_in_inbox = v;
        }
        if let Some(v) = self.color {
            task.color = v;
        }
    }
}

/// Weekly open window for a context. Data only — the engine never evaluates
/// it (contexts report open regardless).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Days of week the context is open, 0 = Monday.
    pub days: Vec<u8>,
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

/// A tag-like context (location, tool, energy level) tasks can reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Weak parent reference; children are found by scanning, no back-pointer
    /// list is maintained.
    pub parent_id: Option<String>,
    pub schedule: Option<Schedule>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Creation payload for a context.
#[derive(Debug, Clone, Default)]
pub struct ContextInput {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<String>,
    pub schedule: Option<Schedule>,
}

/// Partial update for a context. Same merge rules as [`TaskPatch`].
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub schedule: Option<Option<Schedule>>,
}

impl ContextPatch {
    pub fn apply(self, context: &mut Context) {
        if let Some(v) = self.name {
            context.name = v;
        }
        if let Some(v) = self.icon {
            context.icon = v;
        }
        if let Some(v) = self.color {
            context.color = v;
        }
        if let Some(v) = self.parent_id {
            context.parent_id = v;
        }
        if let Some(v) = self.schedule {
            context.schedule = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification for a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sorting {
    pub field: String,
    pub direction: SortDirection,
}

impl Sorting {
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
        }
    }
}

impl Default for Sorting {
    fn default() -> Self {
        Self::new("order", SortDirection::Asc)
    }
}

/// Group-by specification for a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub field: String,
}

/// A named, reusable filter/sort/group configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_built_in: bool,
    /// Predicate-name -> criterion, open-ended (e.g. `isCompleted: false`,
    /// `needsReview: true`).
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    pub sorting: Sorting,
    pub grouping: Option<Grouping>,
    #[serde(default)]
    pub columns: Vec<String>,
    pub show_completed: bool,
    pub show_hierarchy: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

/// Creation payload for a view.
#[derive(Debug, Clone, Default)]
pub struct ViewInput {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub is_built_in: bool,
    pub filters: BTreeMap<String, Value>,
    pub sorting: Option<Sorting>,
    pub grouping: Option<Grouping>,
    pub columns: Vec<String>,
    pub show_completed: Option<bool>,
    pub show_hierarchy: Option<bool>,
}

/// Partial update for a view. Same merge rules as [`TaskPatch`]; the
/// `is_built_in` flag is deliberately not patchable.
#[derive(Debug, Clone, Default)]
pub struct ViewPatch {
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub filters: Option<BTreeMap<String, Value>>,
    pub sorting: Option<Sorting>,
    pub grouping: Option<Option<Grouping>>,
    pub columns: Option<Vec<String>>,
    pub show_completed: Option<bool>,
    pub show_hierarchy: Option<bool>,
}

impl ViewPatch {
    pub fn apply(self, view: &mut View) {
        if let Some(v) = self.name {
            view.name = v;
        }
        if let Some(v) = self.kind {
            view.kind = v;
        }
        if let Some(v) = self.filters {
            view.filters = v;
        }
        if let Some(v) = self.sorting {
            view.sorting = v;
        }
        if let Some(v) = self.grouping {
            view.grouping = v;
        }
        if let Some(v) = self.columns {
            view.columns = v;
        }
        if let Some(v) = self.show_completed {
            view.show_completed = v;
        }
        if let Some(v) = self.show_hierarchy {
            view.show_hierarchy = v;
        }
    }
}

/// The single flat settings record.
///
/// Unknown stored keys land in `extra` and survive a save/load round trip,
/// so a newer installation never destroys keys it does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    // Appearance
    pub theme: String,
    pub font_size: String,
    pub compact_mode: bool,

    // Behavior
    pub auto_save: bool,
    pub confirm_delete: bool,
    pub show_completed_tasks: bool,

    // Notifications
    pub enable_notifications: bool,
    pub notify_on_due_date: bool,
    /// Hours before the due date.
    pub notify_before_due_date: i64,

    // Quick add
    pub quick_add_position: String,
    pub quick_add_default_context: Option<String>,

    // Views
    pub default_view: String,
    pub remember_last_view: bool,

    // Storage
    pub storage_type: String,

    // Advanced
    pub debug_mode: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            font_size: "medium".to_string(),
            compact_mode: false,
            auto_save: true,
            confirm_delete: true,
            show_completed_tasks: true,
            enable_notifications: false,
            notify_on_due_date: true,
            notify_before_due_date: 24,
            quick_add_position: "top".to_string(),
            quick_add_default_context: None,
            default_view: "outline".to_string(),
            remember_last_view: true,
            storage_type: "localStorage".to_string(),
            debug_mode: false,
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_task() -> Task {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        Task {
            id: "task_1".to_string(),
            title: "Write report".to_string(),
            notes: String::new(),
            parent_id: None,
            child_ids: vec![],
            order: 0,
            kind: "task".to_string(),
            goal_type: None,
            tags: vec![],
            flags: vec![],
            is_starred: false,
            start_date: None,
            start_time: None,
            due_date: None,
            due_time: None,
            completed_date: None,
            recurrence: None,
            importance: PRIORITY_DEFAULT,
            urgency: PRIORITY_DEFAULT,
            computed_score: 0.0,
            review_period: None,
            last_reviewed: None,
            is_completed: false,
            is_active: false,
            project_progress: 0,
            depends_on: vec![],
            contexts: vec![],
            is_in_inbox: false,
            color: None,
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn patch_sets_and_clears_nullable_fields() {
        let mut task = sample_task();
        TaskPatch {
            goal_type: Some(Some("yearly".to_string())),
            due_date: Some(Some(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())),
            ..Default::default()
        }
        .apply(&mut task);
        assert_eq!(task.goal_type.as_deref(), Some("yearly"));

        TaskPatch {
            goal_type: Some(None),
            ..Default::default()
        }
        .apply(&mut task);
        assert_eq!(task.goal_type, None);
        // Untouched fields stay put
        assert!(task.due_date.is_some());
    }

    #[test]
    fn patch_never_touches_id() {
        let mut task = sample_task();
        TaskPatch {
            id: Some("task_other".to_string()),
            title: Some("Renamed".to_string()),
            ..Default::default()
        }
        .apply(&mut task);
        assert_eq!(task.id, "task_1");
        assert_eq!(task.title, "Renamed");
    }

    #[test]
    fn task_serializes_camel_case() {
        let task = sample_task();
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("parentId").is_some());
        assert!(value.get("isCompleted").is_some());
        assert_eq!(value["type"], "task");
        assert!(value.get("parent_id").is_none());
    }

    #[test]
    fn settings_round_trip_preserves_unknown_keys() {
        let stored = serde_json::json!({
            "theme": "dark",
            "someFutureKey": {"nested": true}
        });
        let merged = crate::merge::deep_merge(
            serde_json::to_value(Settings::default()).unwrap(),
            stored,
        );
        let settings: Settings = serde_json::from_value(merged).unwrap();
        assert_eq!(settings.theme, "dark");
        // Missing keys fall back to defaults
        assert!(settings.auto_save);

        let back = serde_json::to_value(&settings).unwrap();
        assert_eq!(back["someFutureKey"], serde_json::json!({"nested": true}));
    }

    #[test]
    fn default_sorting_is_order_ascending() {
        let sorting = Sorting::default();
        assert_eq!(sorting.field, "order");
        assert_eq!(sorting.direction, SortDirection::Asc);
    }
}
