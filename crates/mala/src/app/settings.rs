//! Settings load, update, backup, and reset workflows.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::app::{AppEvent, AppServices};
use crate::domain::settings::{
    self, AppSettings, BackupDocument, ImportError, LEGACY_JAP_COUNT_KEY, LEGACY_TAP_COUNT_KEY,
    SettingKey,
};

/// Manages user-configurable application settings.
pub struct SettingsManager {
    pub settings: AppSettings,
}

impl SettingsManager {
    /// Creates a settings manager and loads persisted values from the store.
    pub async fn new(services: &AppServices) -> Self {
        Self {
            settings: load_settings(services).await,
        }
    }

    /// Re-reads every key and wholesale replaces the in-memory settings.
    pub async fn reload(&mut self, services: &AppServices) {
        self.settings = load_settings(services).await;
    }

    /// Validates, applies, and persists one settings value.
    ///
    /// The key's legacy aliases are double-written so older builds keep
    /// reading fresh values, then the cross-context change signal is raised.
    ///
    /// # Errors
    /// Returns an error when the value is invalid for the key or the store
    /// write fails; an invalid value leaves the in-memory settings untouched.
    pub async fn update(
        &mut self,
        services: &AppServices,
        key: SettingKey,
        raw_value: &str,
    ) -> Result<(), String> {
        self.settings.try_apply_value(key, raw_value)?;
        self.persist_key(services, key).await?;
        services.notify_store_changed();
        services.emit_app_event(AppEvent::SettingsChanged);

        Ok(())
    }

    /// Persists every settings key and its aliases.
    ///
    /// # Errors
    /// Returns an error when a store write fails.
    pub async fn save_all(&self, services: &AppServices) -> Result<(), String> {
        for key in SettingKey::ALL {
            self.persist_key(services, key).await?;
        }
        services.notify_store_changed();

        Ok(())
    }

    /// Serializes the full backup document: settings, legacy counters, and
    /// an export timestamp.
    ///
    /// # Errors
    /// Returns an error when the legacy counters cannot be read or the
    /// document cannot be serialized.
    pub async fn export(&self, services: &AppServices) -> Result<String, String> {
        let document = BackupDocument {
            settings: self.settings.clone(),
            tap_count: services.db().get_setting(LEGACY_TAP_COUNT_KEY).await?,
            jap_count: services.db().get_setting(LEGACY_JAP_COUNT_KEY).await?,
            export_date: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .map_err(|err| format!("Failed to format export timestamp: {err}"))?,
        };

        serde_json::to_string_pretty(&document)
            .map_err(|err| format!("Failed to serialize backup: {err}"))
    }

    /// Replaces settings and legacy counters wholesale from a backup
    /// document.
    ///
    /// Parsing fully succeeds before any key is written, so a malformed
    /// document never partially applies.
    ///
    /// # Errors
    /// Returns an [`ImportError`] when the document cannot be parsed or the
    /// restored keys cannot be written.
    pub async fn import(&mut self, services: &AppServices, raw: &str) -> Result<(), ImportError> {
        let document = settings::parse_backup_document(raw)?;

        self.settings = document.settings;
        self.save_all(services).await.map_err(ImportError::Storage)?;

        if let Some(tap_count) = &document.tap_count {
            services
                .db()
                .upsert_setting(LEGACY_TAP_COUNT_KEY, tap_count)
                .await
                .map_err(ImportError::Storage)?;
        }
        if let Some(jap_count) = &document.jap_count {
            services
                .db()
                .upsert_setting(LEGACY_JAP_COUNT_KEY, jap_count)
                .await
                .map_err(ImportError::Storage)?;
        }

        services.notify_store_changed();
        services.emit_app_event(AppEvent::SettingsChanged);

        Ok(())
    }

    /// Deletes every settings key, alias, and legacy counter, restoring
    /// in-memory defaults.
    ///
    /// Callers are responsible for confirming this destructive operation
    /// with the user first.
    ///
    /// # Errors
    /// Returns an error when a store delete fails.
    pub async fn reset_all(&mut self, services: &AppServices) -> Result<(), String> {
        for key in SettingKey::ALL {
            services.db().delete_setting(key.as_str()).await?;
            for alias in key.legacy_aliases() {
                services.db().delete_setting(alias).await?;
            }
        }
        services.db().delete_setting(LEGACY_TAP_COUNT_KEY).await?;
        services.db().delete_setting(LEGACY_JAP_COUNT_KEY).await?;

        self.settings = AppSettings::default();
        services.notify_store_changed();
        services.emit_app_event(AppEvent::SettingsChanged);

        Ok(())
    }

    async fn persist_key(&self, services: &AppServices, key: SettingKey) -> Result<(), String> {
        let value = self.settings.value_json(key).to_string();

        services.db().upsert_setting(key.as_str(), &value).await?;
        for alias in key.legacy_aliases() {
            services.db().upsert_setting(alias, &value).await?;
        }

        Ok(())
    }
}

/// Reads every key from the store, falling back per key to its default.
async fn load_settings(services: &AppServices) -> AppSettings {
    let mut settings = AppSettings::default();

    for key in SettingKey::ALL {
        let stored = services.db().get_setting(key.as_str()).await.unwrap_or(None);
        settings.apply_stored_value(key, stored.as_deref());
    }

    settings
}
