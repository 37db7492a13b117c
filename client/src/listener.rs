//! Applies realtime notifications to the live store.

use medals_engine::{CounterKinds, RemoteEvent};
use tokio::sync::mpsc;

use crate::hub::Notification;
use crate::store_handle::StoreHandle;

/// Folds hub notifications into the store, one at a time, in arrival order.
#[derive(Debug, Clone)]
pub struct EventListener {
    store: StoreHandle,
    kinds: CounterKinds,
}

impl EventListener {
    pub fn new(store: StoreHandle, kinds: CounterKinds) -> Self {
        Self { store, kinds }
    }

    /// Apply one notification. Returns whether the store changed.
    ///
    /// Notifications that do not decode are logged and dropped.
    pub fn handle(&self, notification: &Notification) -> bool {
        let event = match RemoteEvent::decode(
            &notification.target,
            &notification.arguments,
            &self.kinds,
        ) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    hub_target = %notification.target,
                    error = %e,
                    "Dropping malformed event"
                );
                return false;
            }
        };

        match &event {
            RemoteEvent::Add(entity) => tracing::info!("Add: {}", entity.name),
            RemoteEvent::Delete(id) => tracing::info!("Delete id: {}", id),
            RemoteEvent::Patch(entity) => tracing::info!("Patch: {}", entity.name),
        }

        self.store.apply_remote(event)
    }

    /// Consume notifications until the transport closes the channel.
    pub async fn run(self, mut rx: mpsc::Receiver<Notification>) {
        while let Some(notification) = rx.recv().await {
            self.handle(&notification);
        }
        tracing::info!("Notification stream closed");
    }
}
