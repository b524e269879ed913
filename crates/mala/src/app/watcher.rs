//! Cross-context settings refresh: change signal plus a bounded poll.

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::app::{AppEvent, AppServices, CounterController, SettingsManager};

/// Interval of the unconditional settings re-read.
///
/// Same-context writes do not always raise the change signal, so polling is
/// the deliberate correctness backstop rather than a workaround.
pub const SETTINGS_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Keeps this context eventually consistent with configuration changes made
/// elsewhere, without a push channel.
pub struct SettingsWatcher {
    change_rx: broadcast::Receiver<()>,
    refresh_deadline: Instant,
}

impl SettingsWatcher {
    /// Subscribes to the change signal and arms the poll deadline.
    pub fn new(services: &AppServices) -> Self {
        Self {
            change_rx: services.subscribe_store_changes(),
            refresh_deadline: Instant::now() + SETTINGS_REFRESH_INTERVAL,
        }
    }

    /// Re-reads all settings when a change signal arrived or the poll
    /// deadline passed.
    ///
    /// Each refresh fully replaces the in-memory settings object and
    /// republishes the daily goal to the counter; there is no field-level
    /// diffing. Returns whether a refresh ran.
    pub async fn refresh_if_needed(
        &mut self,
        settings: &mut SettingsManager,
        counter: &mut CounterController,
        services: &AppServices,
    ) -> bool {
        if !self.drain_change_signals() && !self.is_refresh_due() {
            return false;
        }

        self.refresh_deadline = Instant::now() + SETTINGS_REFRESH_INTERVAL;

        settings.reload(services).await;
        counter.set_goal(settings.settings.daily_target);
        services.emit_app_event(AppEvent::SettingsChanged);

        true
    }

    /// Returns `true` when the periodic settings re-read should run.
    fn is_refresh_due(&self) -> bool {
        Instant::now() >= self.refresh_deadline
    }

    /// Consumes queued change signals, reporting whether any arrived.
    ///
    /// A lagged receiver means signals were dropped, which still implies a
    /// change happened.
    fn drain_change_signals(&mut self) -> bool {
        let mut changed = false;

        loop {
            match self.change_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Lagged(_)) => changed = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        changed
    }
}
