//! Session facade for a medal board.
//!
//! [`MedalBoard`] owns the live store and wires the commit coordinator and
//! the event listener to it. A presentation layer only needs this type:
//! read the entities and total, subscribe to changes, drain alerts and
//! forward user actions to the `on_*` methods.

use std::sync::Arc;

use medals_engine::{aggregate, reconcile, BoardView, CounterKinds, Entity, EntityId, EntityStore};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::commit::{Alert, CommitCoordinator, CommitOutcome, CommitRecord};
use crate::error::Result;
use crate::hub::EventTransport;
use crate::listener::EventListener;
use crate::persistence::Persistence;
use crate::store_handle::StoreHandle;

/// One client session against a shared board.
pub struct MedalBoard {
    store: StoreHandle,
    kinds: CounterKinds,
    persistence: Arc<dyn Persistence>,
    commits: CommitCoordinator,
}

impl MedalBoard {
    /// Create an empty board and the receiver for its alerts.
    pub fn new(
        kinds: CounterKinds,
        persistence: Arc<dyn Persistence>,
    ) -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let store = StoreHandle::default();
        let (commits, alerts) =
            CommitCoordinator::new(store.clone(), persistence.clone(), kinds.clone());
        (
            Self {
                store,
                kinds,
                persistence,
                commits,
            },
            alerts,
        )
    }

    /// Fetch every entity and fold it into the store.
    ///
    /// Entities the service returns without the full set of counters are
    /// skipped, as are ids a remote event touched while the fetch was in
    /// flight. Returns how many entities were loaded.
    pub async fn load(&self) -> Result<usize> {
        let mark = self.store.remote_mark();
        let dtos = self.persistence.fetch_all().await?;

        let mut loaded = Vec::with_capacity(dtos.len());
        for dto in &dtos {
            match dto.to_entity(&self.kinds) {
                Ok(entity) => loaded.push(entity),
                Err(e) => tracing::warn!(entity_id = dto.id, error = %e, "Skipping entity"),
            }
        }

        let mut count = 0;
        self.store.update_since(mark, |store, touched| {
            loaded
                .into_iter()
                .filter(|entity| !touched.contains(entity.id))
                .fold(store.clone(), |s, entity| {
                    count += 1;
                    reconcile::apply_remote_add(&s, entity)
                })
        });
        tracing::info!(count, "Board loaded");
        Ok(count)
    }

    /// Start `transport` and apply its notifications until it closes.
    pub async fn connect<T>(&self, transport: &T) -> Result<JoinHandle<()>>
    where
        T: EventTransport + ?Sized,
    {
        let rx = transport.start().await?;
        tracing::info!("Connected!");

        let listener = EventListener::new(self.store.clone(), self.kinds.clone());
        Ok(tokio::spawn(listener.run(rx)))
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    pub fn kinds(&self) -> &CounterKinds {
        &self.kinds
    }

    /// Entities in display order.
    pub fn entities(&self) -> Vec<Entity> {
        self.store.read(|s| s.entities().to_vec())
    }

    /// Sum of displayed values.
    pub fn total(&self) -> i64 {
        self.store.read(aggregate::total)
    }

    pub fn view(&self) -> BoardView {
        self.store.read(|s| BoardView::of(s, &self.kinds))
    }

    /// Receiver woken on every store change.
    pub fn subscribe(&self) -> watch::Receiver<EntityStore> {
        self.store.subscribe()
    }

    pub fn in_flight(&self) -> Vec<CommitRecord> {
        self.commits.in_flight()
    }

    pub async fn on_add(&self, name: &str) -> CommitOutcome {
        self.commits.add(name).await
    }

    pub async fn on_delete(&self, id: EntityId) -> CommitOutcome {
        self.commits.delete(id).await
    }

    pub async fn on_save(&self, id: EntityId) -> CommitOutcome {
        self.commits.save(id).await
    }

    /// Discard unsaved edits on entity `id`.
    pub fn on_reset(&self, id: EntityId) -> Result<()> {
        self.store
            .try_update(|s| reconcile::apply_local_reset(s, id).map(|next| (next, ())))?;
        Ok(())
    }

    pub fn on_increment(&self, id: EntityId, counter: &str) -> Result<()> {
        self.apply_delta(id, counter, 1)
    }

    pub fn on_decrement(&self, id: EntityId, counter: &str) -> Result<()> {
        self.apply_delta(id, counter, -1)
    }

    fn apply_delta(&self, id: EntityId, counter: &str, delta: i64) -> Result<()> {
        self.store.try_update(|s| {
            reconcile::apply_local_delta(s, id, counter, delta).map(|next| (next, ()))
        })?;
        Ok(())
    }
}
