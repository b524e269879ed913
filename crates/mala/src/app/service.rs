//! Shared app dependency container for managers and the watcher.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::app::AppEvent;
use crate::infra::db::Database;
use crate::infra::identity::IdentityProvider;
use crate::infra::remote::RemoteStore;

/// Capacity of the no-payload cross-context change channel.
///
/// Receivers treat a lagged read the same as a change, so a small buffer is
/// enough.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Shared app dependencies used by managers and the watcher.
pub struct AppServices {
    change_tx: broadcast::Sender<()>,
    db: Database,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    identity: Arc<dyn IdentityProvider>,
    remote: Arc<dyn RemoteStore>,
}

impl AppServices {
    /// Creates a shared service container.
    pub fn new(
        db: Database,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        identity: Arc<dyn IdentityProvider>,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            change_tx,
            db,
            event_tx,
            identity,
            remote,
        }
    }

    /// Returns the local durable store handle.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Enqueues an app event onto the internal event bus.
    pub fn emit_app_event(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Returns the identity collaborator.
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        Arc::clone(&self.identity)
    }

    /// Returns the remote session store boundary.
    pub fn remote_store(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.remote)
    }

    /// Raises the no-payload cross-context change signal.
    ///
    /// Every key-value write is followed by this signal so other contexts
    /// refresh promptly instead of waiting for the next poll tick.
    pub fn notify_store_changed(&self) {
        let _ = self.change_tx.send(());
    }

    /// Subscribes to the cross-context change signal.
    pub fn subscribe_store_changes(&self) -> broadcast::Receiver<()> {
        self.change_tx.subscribe()
    }
}
