//! Live access to the current entity store.
//!
//! All transitions run under one writer lock and are published through a
//! `watch` sender, so they never interleave and subscribers see each new
//! value. Async continuations hold a [`StoreHandle`], never an
//! [`EntityStore`] value: whatever they do after resuming is computed from
//! the store as it is at that moment.
//!
//! The handle also journals which ids remote events have touched. A
//! continuation takes a [`RemoteMark`] before it suspends and, on resume,
//! can ask which ids the remote stream has spoken for since then.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use medals_engine::{reconcile, EntityId, EntityStore, RemoteEvent};
use tokio::sync::watch;

/// Position in the remote event journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RemoteMark(u64);

#[derive(Debug, Default)]
struct Journal {
    seq: u64,
    /// Sequence number of the latest remote event per id
    touched: HashMap<EntityId, u64>,
}

/// Ids touched by remote events after a [`RemoteMark`].
pub struct TouchedSince<'a> {
    journal: &'a Journal,
    mark: RemoteMark,
}

impl TouchedSince<'_> {
    pub fn contains(&self, id: EntityId) -> bool {
        self.journal
            .touched
            .get(&id)
            .is_some_and(|seq| *seq > self.mark.0)
    }
}

/// Shared handle to the live store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: Arc<watch::Sender<EntityStore>>,
    journal: Arc<Mutex<Journal>>,
}

impl StoreHandle {
    /// Create a handle holding `store`.
    pub fn new(store: EntityStore) -> Self {
        let (tx, _rx) = watch::channel(store);
        Self {
            tx: Arc::new(tx),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Clone of the current store.
    pub fn current(&self) -> EntityStore {
        self.tx.borrow().clone()
    }

    /// Read from the current store without cloning it.
    ///
    /// The closure must not block; the store is locked while it runs.
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&EntityStore) -> R,
    {
        f(&self.tx.borrow())
    }

    /// Receiver notified whenever a transition changes the store.
    pub fn subscribe(&self) -> watch::Receiver<EntityStore> {
        self.tx.subscribe()
    }

    /// Run a transition against the live store.
    ///
    /// Returns whether the store changed; subscribers are only woken when it did.
    pub fn update<F>(&self, transition: F) -> bool
    where
        F: FnOnce(&EntityStore) -> EntityStore,
    {
        let _journal = self.lock_journal();
        let next = self.read(transition);
        self.publish(next)
    }

    /// Run a fallible transition that also yields a value.
    ///
    /// On error the store is left as it was.
    pub fn try_update<T, E, F>(&self, transition: F) -> Result<T, E>
    where
        F: FnOnce(&EntityStore) -> Result<(EntityStore, T), E>,
    {
        let _journal = self.lock_journal();
        let (next, value) = self.read(transition)?;
        self.publish(next);
        Ok(value)
    }

    /// Fold a remote event into the store and journal the id it targets.
    pub fn apply_remote(&self, event: RemoteEvent) -> bool {
        let mut journal = self.lock_journal();
        journal.seq += 1;
        let seq = journal.seq;
        journal.touched.insert(event.entity_id(), seq);

        let next = self.read(|s| reconcile::apply_remote(s, event));
        self.publish(next)
    }

    /// Current end of the remote event journal.
    pub fn remote_mark(&self) -> RemoteMark {
        RemoteMark(self.lock_journal().seq)
    }

    /// Run a transition that can see which ids remote events touched
    /// after `mark`. No remote event lands while it runs.
    pub fn update_since<F>(&self, mark: RemoteMark, transition: F) -> bool
    where
        F: FnOnce(&EntityStore, &TouchedSince<'_>) -> EntityStore,
    {
        let journal = self.lock_journal();
        let touched = TouchedSince {
            journal: &journal,
            mark,
        };
        let next = self.read(|s| transition(s, &touched));
        self.publish(next)
    }

    fn lock_journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, next: EntityStore) -> bool {
        self.tx.send_if_modified(|store| {
            if next == *store {
                false
            } else {
                *store = next;
                true
            }
        })
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::new(EntityStore::new())
    }
}
