//! App-layer composition root: event bus, service container, and the
//! managers that implement the session synchronization engine.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::settings::{ImportError, SettingKey};
use crate::infra::db::Database;
use crate::infra::identity::IdentityProvider;
use crate::infra::remote::RemoteStore;

mod counter;
mod repository;
mod service;
mod settings;
mod watcher;

pub use counter::CounterController;
pub use repository::{RemoteWriteStatus, SessionRepository};
pub use service::AppServices;
pub use settings::SettingsManager;
pub use watcher::{SETTINGS_REFRESH_INTERVAL, SettingsWatcher};

/// Returns the mala home directory (`~/.mala`).
pub fn mala_home() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        return home_dir.join(".mala");
    }

    PathBuf::from(".mala")
}

/// User-facing feedback events emitted by counter and settings workflows.
///
/// Producers only emit; consumers (a toast surface, a haptic gate) decide
/// how to present them. Emission never blocks or fails a state transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppEvent {
    /// Indicates today's tap total changed.
    CountChanged { japs: u32, taps: u32 },
    /// Indicates a full cycle of 108 taps was just completed.
    CycleCompleted { japs: u32 },
    /// Indicates the daily goal was crossed for the first time today.
    GoalReached { goal: u32 },
    /// Indicates the settings object was replaced from the store.
    SettingsChanged,
}

/// Wires the managers over one service container and owns the event bus.
pub struct App {
    pub counter: CounterController,
    pub repository: SessionRepository,
    pub settings: SettingsManager,
    pub watcher: SettingsWatcher,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    services: AppServices,
}

impl App {
    /// Builds the app state: loads settings, performs the initial remote
    /// session load (best-effort), and addresses the counter to today.
    pub async fn new(
        db: Database,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let services = AppServices::new(db, event_tx, identity, remote);

        let settings = SettingsManager::new(&services).await;
        let mut repository = SessionRepository::new();
        if let Err(error) = repository.load(&services).await {
            tracing::warn!(%error, "initial remote session load failed; starting from local state");
        }
        let counter =
            CounterController::new(&repository, &services, settings.settings.daily_target).await;
        let watcher = SettingsWatcher::new(&services);

        Self {
            counter,
            repository,
            settings,
            watcher,
            event_rx,
            services,
        }
    }

    /// Records one tap for today.
    ///
    /// # Errors
    /// Returns an error when the local write fails.
    pub async fn tap(&mut self) -> Result<(), String> {
        self.counter
            .increment(&mut self.repository, &self.services)
            .await
    }

    /// Removes the most recent tap; a no-op at zero.
    ///
    /// # Errors
    /// Returns an error when the local write fails.
    pub async fn undo(&mut self) -> Result<(), String> {
        self.counter
            .decrement(&mut self.repository, &self.services)
            .await
    }

    /// Resets today's count to zero, writing the cleared state through.
    ///
    /// # Errors
    /// Returns an error when the local write fails.
    pub async fn reset_today(&mut self) -> Result<(), String> {
        self.counter
            .reset(&mut self.repository, &self.services)
            .await
    }

    /// Refreshes the session collection from the remote store.
    ///
    /// # Errors
    /// Returns a non-fatal error when the remote load fails; the in-memory
    /// collection keeps its last-known records.
    pub async fn refresh_sessions(&mut self) -> Result<(), String> {
        self.repository.load(&self.services).await
    }

    /// Reads one settings value as its JSON encoding.
    pub fn setting_value(&self, key: SettingKey) -> String {
        self.settings.settings.value_json(key).to_string()
    }

    /// Validates and persists one settings value.
    ///
    /// # Errors
    /// Returns an error when the value is invalid or the store write fails.
    pub async fn set_setting(&mut self, key: SettingKey, raw_value: &str) -> Result<(), String> {
        self.settings.update(&self.services, key, raw_value).await?;
        self.counter.set_goal(self.settings.settings.daily_target);

        Ok(())
    }

    /// Serializes the full backup document.
    ///
    /// # Errors
    /// Returns an error when the backup cannot be assembled.
    pub async fn export_backup(&self) -> Result<String, String> {
        self.settings.export(&self.services).await
    }

    /// Restores settings and legacy counters from a backup document.
    ///
    /// # Errors
    /// Returns an [`ImportError`] when the document is malformed or cannot
    /// be stored; a malformed document applies nothing.
    pub async fn import_backup(&mut self, raw: &str) -> Result<(), ImportError> {
        self.settings.import(&self.services, raw).await?;
        self.counter.set_goal(self.settings.settings.daily_target);

        Ok(())
    }

    /// Deletes every stored key and restores defaults.
    ///
    /// Callers must confirm this destructive operation with the user first.
    ///
    /// # Errors
    /// Returns an error when a store delete fails.
    pub async fn reset_all_data(&mut self) -> Result<(), String> {
        self.settings.reset_all(&self.services).await?;
        self.counter.set_goal(self.settings.settings.daily_target);

        Ok(())
    }

    /// Runs one watcher pass, refreshing settings when due.
    pub async fn poll_watcher(&mut self) -> bool {
        self.watcher
            .refresh_if_needed(&mut self.settings, &mut self.counter, &self.services)
            .await
    }

    /// Dequeues the next feedback event without waiting.
    pub fn try_next_event(&mut self) -> Option<AppEvent> {
        self.event_rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::identity::StaticIdentityProvider;
    use crate::infra::remote::MockRemoteStore;

    async fn local_only_app() -> App {
        let db = Database::open_in_memory()
            .await
            .expect("failed to open in-memory db");

        App::new(
            db,
            Arc::new(MockRemoteStore::new()),
            Arc::new(StaticIdentityProvider::new(None)),
        )
        .await
    }

    #[test]
    fn mala_home_ends_with_dot_mala() {
        // Arrange & Act
        let home = mala_home();

        // Assert
        assert!(home.ends_with(".mala"));
    }

    #[tokio::test]
    async fn test_tap_updates_counter_and_emits_count_changed() {
        // Arrange
        let mut app = local_only_app().await;

        // Act
        app.tap().await.expect("failed to tap");

        // Assert
        assert_eq!(app.counter.taps(), 1);
        assert_eq!(app.try_next_event(), Some(AppEvent::CountChanged {
            japs: 0,
            taps: 1
        }));
    }

    #[tokio::test]
    async fn test_set_setting_republishes_goal_to_counter() {
        // Arrange
        let mut app = local_only_app().await;

        // Act
        app.set_setting(SettingKey::DailyTarget, "7")
            .await
            .expect("failed to set setting");

        // Assert
        assert_eq!(app.counter.goal(), 7);
        assert_eq!(app.setting_value(SettingKey::DailyTarget), "7");
    }

    #[tokio::test]
    async fn test_reset_all_data_restores_default_goal() {
        // Arrange
        let mut app = local_only_app().await;
        app.set_setting(SettingKey::DailyTarget, "7")
            .await
            .expect("failed to set setting");

        // Act
        app.reset_all_data().await.expect("failed to reset all");

        // Assert
        assert_eq!(app.counter.goal(), 5);
    }
}
