//! Settings repository: one flat record merged over defaults.

use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::error::{Error, Result};
use crate::merge::deep_merge;
use crate::storage::StorageAdapter;
use crate::types::Settings;

/// Owner of the settings record.
pub struct SettingsRepository {
    storage: Arc<dyn StorageAdapter>,
    settings: Settings,
    last_error: Option<String>,
}

impl SettingsRepository {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            settings: Settings::default(),
            last_error: None,
        }
    }

    /// Load the stored record and lay it over the defaults. Unknown stored
    /// keys are preserved; missing keys fall back to their defaults. A read
    /// failure keeps the defaults and records the error.
    pub async fn load(&mut self) {
        let stored = match self.storage.get_settings().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("failed to load settings: {e}");
                self.last_error = Some(e.to_string());
                return;
            }
        };

        match Self::merge_over_defaults(stored) {
            Ok(settings) => {
                self.settings = settings;
                self.last_error = None;
            }
            Err(e) => {
                warn!("stored settings unreadable, keeping defaults: {e}");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Persist the current record explicitly.
    pub async fn save(&mut self) -> Result<()> {
        let record = Self::to_record(&self.settings)?;
        self.persist(&record).await
    }

    /// Update one key. Persists only when `auto_save` was set before this
    /// mutation was applied.
    pub async fn update_setting(&mut self, key: &str, value: Value) -> Result<()> {
        let auto_save = self.settings.auto_save;

        let mut record = Self::to_record(&self.settings)?;
        if let Some(map) = record.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        let next: Settings =
            serde_json::from_value(record.clone()).map_err(|e| Error::InvalidFormat(e.to_string()))?;

        if auto_save {
            self.persist(&record).await?;
        }
        self.settings = next;
        Ok(())
    }

    /// Update several keys at once; same autosave rule as
    /// [`update_setting`].
    ///
    /// [`update_setting`]: SettingsRepository::update_setting
    pub async fn update_settings(&mut self, partial: Value) -> Result<()> {
        let auto_save = self.settings.auto_save;

        let record = deep_merge(Self::to_record(&self.settings)?, partial);
        let next: Settings =
            serde_json::from_value(record.clone()).map_err(|e| Error::InvalidFormat(e.to_string()))?;

        if auto_save {
            self.persist(&record).await?;
        }
        self.settings = next;
        Ok(())
    }

    /// Restore the full default record. Always persists, regardless of the
    /// autosave flag.
    pub async fn reset(&mut self) -> Result<()> {
        let defaults = Settings::default();
        let record = Self::to_record(&defaults)?;
        self.persist(&record).await?;
        self.settings = defaults;
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up one key of the record by name (known or unknown).
    pub fn get(&self, key: &str) -> Option<Value> {
        let record = serde_json::to_value(&self.settings).ok()?;
        record.get(key).cloned()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn merge_over_defaults(stored: Value) -> Result<Settings> {
        let defaults = Self::to_record(&Settings::default())?;
        let merged = deep_merge(defaults, stored);
        serde_json::from_value(merged).map_err(|e| Error::InvalidFormat(e.to_string()))
    }

    fn to_record(settings: &Settings) -> Result<Value> {
        serde_json::to_value(settings).map_err(Error::storage)
    }

    async fn persist(&mut self, record: &Value) -> Result<()> {
        if let Err(e) = self.storage.save_settings(record).await {
            warn!("failed to persist settings: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        self.last_error = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;
    use serde_json::json;

    async fn repo_with_store() -> (SettingsRepository, Arc<LocalStore>) {
        let storage = Arc::new(LocalStore::open_in_memory().unwrap());
        let mut repo = SettingsRepository::new(Arc::clone(&storage) as Arc<dyn StorageAdapter>);
        repo.load().await;
        (repo, storage)
    }

    #[tokio::test]
    async fn load_on_empty_store_yields_defaults() {
        let (repo, _) = repo_with_store().await;
        let s = repo.settings();
        assert_eq!(s.theme, "light");
        assert!(s.auto_save);
        assert_eq!(s.notify_before_due_date, 24);
        assert_eq!(s.storage_type, "localStorage");
    }

    #[tokio::test]
    async fn autosave_on_persists_updates() {
        let (mut repo, storage) = repo_with_store().await;
        repo.update_setting("theme", json!("dark")).await.unwrap();

        assert_eq!(repo.settings().theme, "dark");
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["theme"], "dark");
    }

    #[tokio::test]
    async fn autosave_off_defers_persistence_until_save() {
        let (mut repo, storage) = repo_with_store().await;
        repo.update_setting("autoSave", json!(false)).await.unwrap();

        repo.update_setting("theme", json!("dark")).await.unwrap();
        assert_eq!(repo.settings().theme, "dark");
        // Not yet durable
        let stored = storage.get_settings().await.unwrap();
        assert_ne!(stored.get("theme"), Some(&json!("dark")));

        repo.save().await.unwrap();
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["theme"], "dark");
    }

    #[tokio::test]
    async fn autosave_flag_is_read_before_the_mutation() {
        let (mut repo, storage) = repo_with_store().await;

        // Turning autosave off: the flag was on when the call started, so
        // this call itself still persists.
        repo.update_setting("autoSave", json!(false)).await.unwrap();
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["autoSave"], json!(false));

        // Turning it back on: the flag was off, so nothing persists yet.
        repo.update_setting("autoSave", json!(true)).await.unwrap();
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["autoSave"], json!(false));
    }

    #[tokio::test]
    async fn bulk_update_merges_shallowly() {
        let (mut repo, _) = repo_with_store().await;
        repo.update_settings(json!({"theme": "dark", "fontSize": "large"}))
            .await
            .unwrap();

        assert_eq!(repo.settings().theme, "dark");
        assert_eq!(repo.settings().font_size, "large");
        // Untouched keys keep their defaults
        assert!(repo.settings().confirm_delete);
    }

    #[tokio::test]
    async fn unknown_keys_survive_load_and_save() {
        let (_, storage) = repo_with_store().await;
        storage
            .save_settings(&json!({"theme": "dark", "futureKey": 42}))
            .await
            .unwrap();

        let mut repo = SettingsRepository::new(storage.clone() as Arc<dyn StorageAdapter>);
        repo.load().await;
        assert_eq!(repo.settings().theme, "dark");
        assert_eq!(repo.get("futureKey"), Some(json!(42)));

        repo.save().await.unwrap();
        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["futureKey"], 42);
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_always_persists() {
        let (mut repo, storage) = repo_with_store().await;
        repo.update_setting("autoSave", json!(false)).await.unwrap();
        repo.update_setting("theme", json!("dark")).await.unwrap();

        repo.reset().await.unwrap();
        assert_eq!(repo.settings().theme, "light");
        assert!(repo.settings().auto_save);

        let stored = storage.get_settings().await.unwrap();
        assert_eq!(stored["theme"], "light");
    }

    #[tokio::test]
    async fn rejects_type_confused_value() {
        let (mut repo, _) = repo_with_store().await;
        let err = repo
            .update_setting("theme", json!(["not", "a", "string"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }
}
