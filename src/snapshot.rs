//! Export/import envelope.
//!
//! A snapshot is the full persisted state of one installation: every record
//! kind plus a version marker and export timestamp. The settings section is
//! kept as raw JSON so unknown keys survive a round trip through a snapshot
//! taken by a different build.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{Context, Task, View};

/// Version marker written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contexts: Option<Vec<Context>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<View>>,
}

impl Snapshot {
    /// Build a snapshot of the given collections, stamped now.
    pub fn new(
        tasks: Vec<Task>,
        contexts: Vec<Context>,
        settings: Value,
        views: Vec<View>,
    ) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            export_date: Utc::now(),
            tasks,
            contexts: Some(contexts),
            settings: Some(settings),
            views: Some(views),
        }
    }

    /// Parse and validate an import payload.
    ///
    /// The version marker and the tasks array are mandatory; everything else
    /// is optional. Violations surface as [`Error::InvalidFormat`] before any
    /// persistence happens.
    pub fn from_value(payload: Value) -> Result<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| Error::InvalidFormat("payload is not an object".to_string()))?;

        if !obj.get("version").is_some_and(|v| v.is_string()) {
            return Err(Error::InvalidFormat("missing version marker".to_string()));
        }
        if !obj.get("tasks").is_some_and(|v| v.is_array()) {
            return Err(Error::InvalidFormat("missing tasks array".to_string()));
        }

        serde_json::from_value(payload).map_err(|e| Error::InvalidFormat(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_version() {
        let err = Snapshot::from_value(json!({"tasks": []})).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn rejects_missing_tasks() {
        let err =
            Snapshot::from_value(json!({"version": "1.0", "contexts": []})).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn rejects_non_object_payload() {
        let err = Snapshot::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn accepts_minimal_payload() {
        let snap = Snapshot::from_value(json!({
            "version": "1.0",
            "exportDate": "2024-03-01T12:00:00Z",
            "tasks": []
        }))
        .unwrap();
        assert_eq!(snap.version, "1.0");
        assert!(snap.tasks.is_empty());
        assert!(snap.contexts.is_none());
    }
}
