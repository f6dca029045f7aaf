//! Integration tests for the repositories over a real local store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use taskdeck::repo::{ContextRepository, SettingsRepository, TaskRepository, ViewRepository};
use taskdeck::storage::{LocalStore, StorageAdapter};
use taskdeck::types::{TaskInput, TaskPatch};

fn setup_store() -> Arc<dyn StorageAdapter> {
    Arc::new(LocalStore::open_in_memory().expect("in-memory store"))
}

async fn task_repo(storage: &Arc<dyn StorageAdapter>) -> TaskRepository {
    let mut repo = TaskRepository::new(Arc::clone(storage));
    repo.load().await;
    repo
}

fn titled(title: &str) -> TaskInput {
    TaskInput {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

mod hierarchy_tests {
    use super::*;

    #[tokio::test]
    async fn parent_and_child_stay_consistent() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;

        let a = repo.create(titled("A")).await.unwrap();
        let b = repo
            .create(TaskInput {
                parent_id: Some(a.id.clone()),
                ..titled("B")
            })
            .await
            .unwrap();

        let a_loaded = repo.get(&a.id).unwrap();
        assert_eq!(a_loaded.child_ids, vec![b.id.clone()]);
        assert_eq!(b.order, 0);

        // Root query excludes the child
        let roots: Vec<&str> = repo.root_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, vec![a.id.as_str()]);
    }

    #[tokio::test]
    async fn detach_delete_surfaces_dangling_parent() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;

        let a = repo.create(titled("A")).await.unwrap();
        let b = repo
            .create(TaskInput {
                parent_id: Some(a.id.clone()),
                ..titled("B")
            })
            .await
            .unwrap();

        repo.delete(&a.id, false).await.unwrap();

        assert!(repo.get(&a.id).is_none());
        let b = repo.get(&b.id).unwrap();
        // Deliberately not repaired: the dangling reference is surfaced.
        assert_eq!(b.parent_id.as_deref(), Some(a.id.as_str()));
    }

    #[tokio::test]
    async fn cascade_delete_survives_a_reload() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;

        let a = repo.create(titled("A")).await.unwrap();
        for i in 0..3 {
            let child = repo
                .create(TaskInput {
                    parent_id: Some(a.id.clone()),
                    ..titled(&format!("child {i}"))
                })
                .await
                .unwrap();
            repo.create(TaskInput {
                parent_id: Some(child.id.clone()),
                ..titled(&format!("grandchild {i}"))
            })
            .await
            .unwrap();
        }
        assert_eq!(repo.tasks().len(), 7);

        repo.delete(&a.id, true).await.unwrap();
        assert!(repo.tasks().is_empty());

        // The deletion is durable, not just in-memory
        let mut fresh = task_repo(&storage).await;
        fresh.load().await;
        assert!(fresh.tasks().is_empty());
    }

    #[tokio::test]
    async fn sibling_order_is_scoped_per_parent() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;

        let p1 = repo.create(titled("p1")).await.unwrap();
        let p2 = repo.create(titled("p2")).await.unwrap();
        assert_eq!((p1.order, p2.order), (0, 1));

        let c1 = repo
            .create(TaskInput {
                parent_id: Some(p1.id.clone()),
                ..titled("c1")
            })
            .await
            .unwrap();
        let c2 = repo
            .create(TaskInput {
                parent_id: Some(p1.id.clone()),
                ..titled("c2")
            })
            .await
            .unwrap();
        assert_eq!((c1.order, c2.order), (0, 1));

        let ordered: Vec<&str> = repo
            .children_of(&p1.id)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ordered, vec![c1.id.as_str(), c2.id.as_str()]);
    }
}

mod task_state_tests {
    use super::*;

    #[tokio::test]
    async fn toggle_complete_twice_restores_prior_state() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;
        let task = repo.create(titled("t")).await.unwrap();

        let once = repo.toggle_complete(&task.id).await.unwrap();
        assert!(once.is_completed && once.completed_date.is_some());

        let twice = repo.toggle_complete(&task.id).await.unwrap();
        assert_eq!(twice.is_completed, task.is_completed);
        assert_eq!(twice.completed_date, task.completed_date);
    }

    #[tokio::test]
    async fn stored_id_survives_an_id_overwrite_attempt() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;
        let task = repo.create(titled("t")).await.unwrap();

        let updated = repo
            .update(
                &task.id,
                TaskPatch {
                    id: Some("task_other".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, task.id);
        assert!(repo.get("task_other").is_none());
    }

    #[tokio::test]
    async fn overdue_clears_after_completion() {
        let storage = setup_store();
        let mut repo = task_repo(&storage).await;

        let yesterday = Utc::now().date_naive() - Duration::days(1);
        let task = repo
            .create(TaskInput {
                due_date: Some(yesterday),
                ..titled("late")
            })
            .await
            .unwrap();

        assert_eq!(repo.overdue_tasks().len(), 1);
        repo.toggle_complete(&task.id).await.unwrap();
        assert!(repo.overdue_tasks().is_empty());
    }
}

mod view_tests {
    use super::*;

    #[tokio::test]
    async fn seeding_happens_once_per_storage() {
        let storage = setup_store();

        let mut views = ViewRepository::new(Arc::clone(&storage));
        views.load().await.unwrap();
        assert_eq!(views.views().len(), 6);

        // Loading again (same or fresh repository) never re-seeds.
        views.load().await.unwrap();
        assert_eq!(views.views().len(), 6);

        let mut fresh = ViewRepository::new(Arc::clone(&storage));
        fresh.load().await.unwrap();
        assert_eq!(fresh.views().len(), 6);
    }

    #[tokio::test]
    async fn every_built_in_resists_deletion() {
        let storage = setup_store();
        let mut views = ViewRepository::new(Arc::clone(&storage));
        views.load().await.unwrap();

        let ids: Vec<String> = views.views().iter().map(|v| v.id.clone()).collect();
        for id in ids {
            let err = views.delete(&id).await.unwrap_err();
            assert!(matches!(err, taskdeck::Error::BuiltInProtected(_)));
        }
        assert_eq!(views.views().len(), 6);
    }
}

mod settings_tests {
    use super::*;

    #[tokio::test]
    async fn disabled_autosave_defers_until_explicit_save() {
        let storage = setup_store();
        let mut settings = SettingsRepository::new(Arc::clone(&storage));
        settings.load().await;

        settings
            .update_setting("autoSave", json!(false))
            .await
            .unwrap();
        settings
            .update_setting("theme", json!("dark"))
            .await
            .unwrap();

        // In-memory record reflects the change...
        assert_eq!(settings.settings().theme, "dark");
        // ...but storage does not, until an explicit save.
        let stored = storage.get_settings().await.unwrap();
        assert_ne!(stored.get("theme"), Some(&json!("dark")));

        settings.save().await.unwrap();
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["theme"], json!("dark"));
    }
}

mod cross_repository_tests {
    use super::*;
    use taskdeck::types::ContextInput;

    #[tokio::test]
    async fn task_context_references_are_weak() {
        let storage = setup_store();
        let mut contexts = ContextRepository::new(Arc::clone(&storage));
        contexts.load().await;
        let ctx = contexts
            .create(ContextInput {
                name: Some("@Work".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut tasks = task_repo(&storage).await;
        let task = tasks
            .create(TaskInput {
                contexts: vec![ctx.id.clone()],
                ..titled("t")
            })
            .await
            .unwrap();

        // Deleting the context never touches the task's reference list.
        contexts.delete(&ctx.id).await.unwrap();
        tasks.load().await;
        assert_eq!(tasks.get(&task.id).unwrap().contexts, vec![ctx.id]);
    }
}
