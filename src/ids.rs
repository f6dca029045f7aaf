//! Collision-resistant string identifiers for all entity kinds.
//!
//! Ids carry a kind prefix so a raw id in a log line or an export file is
//! self-describing: `task_67e55044...`, `view_9f86d081...`.

use uuid::Uuid;

/// Generate a new id with the given kind prefix.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

pub fn task_id() -> String {
    new_id("task")
}

pub fn context_id() -> String {
    new_id("context")
}

pub fn view_id() -> String {
    new_id("view")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_kind_prefix() {
        assert!(task_id().starts_with("task_"));
        assert!(context_id().starts_with("context_"));
        assert!(view_id().starts_with("view_"));
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| task_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
