//! Optimistic commits against the persistence service.
//!
//! Every user action that must be persisted goes through the same steps:
//! capture what is needed to undo it, apply the optimistic transition,
//! call persistence, then either keep the result or roll back exactly what
//! the action touched. A `NotFound` answer means the server already lost
//! the entity and is accepted silently; any other failure rolls back and
//! raises an [`Alert`].
//!
//! Continuations go back through the [`StoreHandle`], so remote events that
//! landed while a call was in flight are never overwritten.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use medals_engine::{reconcile, CounterKinds, Entity, EntityId};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::persistence::Persistence;
use crate::store_handle::StoreHandle;

/// Identifier of one commit.
pub type CommitId = Uuid;

/// What a commit persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitKind {
    Add,
    Delete,
    Save,
}

impl CommitKind {
    /// Message shown to the user when this kind of commit fails.
    pub fn failure_message(&self) -> &'static str {
        match self {
            CommitKind::Add => "An error occurred while adding",
            CommitKind::Delete => "An error occurred while deleting",
            CommitKind::Save => "An error occurred while updating",
        }
    }
}

/// Lifecycle of a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPhase {
    Idle,
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

/// How a commit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    /// Persistence accepted the change
    Confirmed,
    /// Persistence answered `NotFound`; the local change stands
    AlreadyGone,
    /// Persistence failed; the optimistic change was undone
    RolledBack,
    /// Nothing to persist
    Skipped,
    /// The entity is not in the store
    Missing,
    /// The entity has no server id yet
    Pending,
}

impl CommitOutcome {
    /// Terminal phase for outcomes that went through persistence.
    pub fn phase(&self) -> CommitPhase {
        match self {
            CommitOutcome::Confirmed | CommitOutcome::AlreadyGone => CommitPhase::Confirmed,
            CommitOutcome::RolledBack => CommitPhase::RolledBack,
            CommitOutcome::Skipped | CommitOutcome::Missing | CommitOutcome::Pending => {
                CommitPhase::Idle
            }
        }
    }
}

/// A commit waiting for persistence.
#[derive(Debug, Clone, Serialize)]
pub struct CommitRecord {
    pub id: CommitId,
    pub kind: CommitKind,
    pub entity_id: EntityId,
    pub phase: CommitPhase,
    pub started_at: DateTime<Utc>,
}

/// User-visible failure notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: CommitKind,
    pub entity_id: EntityId,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

/// Provisional ids are negative until the server assigns a real one.
pub fn is_provisional(id: EntityId) -> bool {
    id < 0
}

/// Runs commits and tracks the ones in flight.
pub struct CommitCoordinator {
    store: StoreHandle,
    persistence: Arc<dyn Persistence>,
    kinds: CounterKinds,
    alerts: mpsc::UnboundedSender<Alert>,
    inflight: DashMap<CommitId, CommitRecord>,
    next_provisional: AtomicI64,
}

impl CommitCoordinator {
    /// Create a coordinator and the receiving end of its alert stream.
    pub fn new(
        store: StoreHandle,
        persistence: Arc<dyn Persistence>,
        kinds: CounterKinds,
    ) -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (alerts, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            store,
            persistence,
            kinds,
            alerts,
            inflight: DashMap::new(),
            next_provisional: AtomicI64::new(-1),
        };
        (coordinator, rx)
    }

    /// Commits currently waiting for persistence, oldest first.
    pub fn in_flight(&self) -> Vec<CommitRecord> {
        let mut records: Vec<_> = self.inflight.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.started_at);
        records
    }

    /// Create an entity named `name`.
    ///
    /// A provisional entity with all counters at zero shows up immediately
    /// and takes the server id once the create call returns. If remote
    /// events for that id arrived while the call was in flight, they win
    /// and the provisional entity is simply dropped.
    pub async fn add(&self, name: &str) -> CommitOutcome {
        let name = name.trim();
        if name.is_empty() {
            tracing::warn!("Ignoring add with a blank name");
            return CommitOutcome::Skipped;
        }

        let provisional_id = self.next_provisional.fetch_sub(1, Ordering::Relaxed);
        let provisional = Entity::zeroed(provisional_id, name, &self.kinds);
        if let Err(e) = self
            .store
            .try_update(|s| s.insert(provisional).map(|next| (next, ())))
        {
            tracing::warn!(entity_id = provisional_id, error = %e, "Provisional insert rejected");
            return CommitOutcome::Skipped;
        }

        let commit_id = self.begin(CommitKind::Add, provisional_id);
        let mark = self.store.remote_mark();

        let outcome = match self.persistence.create(name).await {
            Ok(dto) => {
                match dto.to_entity(&self.kinds) {
                    Ok(confirmed) => {
                        tracing::debug!(
                            provisional_id,
                            entity_id = confirmed.id,
                            "Create confirmed"
                        );
                        // Remote events for the new id already decided its state.
                        self.store.update_since(mark, |s, touched| {
                            if touched.contains(confirmed.id) {
                                reconcile::drop_provisional(s, provisional_id)
                            } else {
                                reconcile::confirm_add(s, provisional_id, confirmed)
                            }
                        });
                    }
                    Err(e) => {
                        // The server has the entity; its add event will bring it in.
                        tracing::warn!(
                            provisional_id,
                            error = %e,
                            "Create returned an unreadable entity"
                        );
                        self.store
                            .update(|s| reconcile::drop_provisional(s, provisional_id));
                    }
                }
                CommitOutcome::Confirmed
            }
            Err(e) => {
                self.store
                    .update(|s| reconcile::drop_provisional(s, provisional_id));
                self.raise(CommitKind::Add, provisional_id, &e);
                CommitOutcome::RolledBack
            }
        };

        self.finish(commit_id, outcome)
    }

    /// Delete entity `id`.
    pub async fn delete(&self, id: EntityId) -> CommitOutcome {
        if let Some(outcome) = self.precheck(CommitKind::Delete, id) {
            return outcome;
        }

        let removed = match self.store.try_update(|s| reconcile::stage_delete(s, id)) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::debug!(entity_id = id, error = %e, "Delete skipped");
                return CommitOutcome::Missing;
            }
        };

        let commit_id = self.begin(CommitKind::Delete, id);

        let outcome = match self.persistence.delete(id).await {
            Ok(()) => CommitOutcome::Confirmed,
            Err(PersistenceError::NotFound) => {
                tracing::debug!(
                    entity_id = id,
                    "The record does not exist - it may have already been deleted"
                );
                CommitOutcome::AlreadyGone
            }
            Err(e) => {
                self.store
                    .update(|s| reconcile::restore_removed(s, &removed));
                self.raise(CommitKind::Delete, id, &e);
                CommitOutcome::RolledBack
            }
        };

        self.finish(commit_id, outcome)
    }

    /// Persist the unsaved counter values of entity `id`.
    pub async fn save(&self, id: EntityId) -> CommitOutcome {
        if let Some(outcome) = self.precheck(CommitKind::Save, id) {
            return outcome;
        }

        let changes = self.store.read(|s| reconcile::compute_save_diff(s, id));
        if changes.is_empty() {
            tracing::debug!(entity_id = id, "Nothing to save");
            return CommitOutcome::Skipped;
        }

        let undo = match self
            .store
            .try_update(|s| reconcile::stage_save(s, id, &changes))
        {
            Ok(undo) => undo,
            Err(e) => {
                tracing::debug!(entity_id = id, error = %e, "Save skipped");
                return CommitOutcome::Missing;
            }
        };

        let commit_id = self.begin(CommitKind::Save, id);

        let outcome = match self.persistence.patch(id, &changes).await {
            Ok(()) => CommitOutcome::Confirmed,
            Err(PersistenceError::NotFound) => {
                tracing::debug!(
                    entity_id = id,
                    "The record does not exist - it may have already been deleted"
                );
                CommitOutcome::AlreadyGone
            }
            Err(e) => {
                self.store.update(|s| reconcile::undo_stage_save(s, &undo));
                self.raise(CommitKind::Save, id, &e);
                CommitOutcome::RolledBack
            }
        };

        self.finish(commit_id, outcome)
    }

    /// Outcome for ids that cannot be committed right now.
    fn precheck(&self, kind: CommitKind, id: EntityId) -> Option<CommitOutcome> {
        if !self.store.read(|s| s.contains(id)) {
            tracing::debug!(entity_id = id, ?kind, "Entity not in store");
            return Some(CommitOutcome::Missing);
        }
        if is_provisional(id) {
            tracing::info!(entity_id = id, ?kind, "Entity is not created yet, try again shortly");
            return Some(CommitOutcome::Pending);
        }
        None
    }

    fn begin(&self, kind: CommitKind, entity_id: EntityId) -> CommitId {
        let id = Uuid::new_v4();
        self.inflight.insert(
            id,
            CommitRecord {
                id,
                kind,
                entity_id,
                phase: CommitPhase::OptimisticallyApplied,
                started_at: Utc::now(),
            },
        );
        tracing::debug!(commit_id = %id, ?kind, entity_id, "Commit started");
        id
    }

    fn finish(&self, commit_id: CommitId, outcome: CommitOutcome) -> CommitOutcome {
        if let Some((_, record)) = self.inflight.remove(&commit_id) {
            let elapsed_ms = (Utc::now() - record.started_at).num_milliseconds();
            tracing::debug!(
                commit_id = %commit_id,
                kind = ?record.kind,
                entity_id = record.entity_id,
                phase = ?outcome.phase(),
                elapsed_ms,
                "Commit finished"
            );
        }
        outcome
    }

    fn raise(&self, kind: CommitKind, entity_id: EntityId, error: &PersistenceError) {
        tracing::error!(entity_id, ?kind, error = %error, "Commit rolled back");

        let alert = Alert {
            kind,
            entity_id,
            message: kind.failure_message().to_string(),
            raised_at: Utc::now(),
        };
        if self.alerts.send(alert).is_err() {
            tracing::debug!("Alert receiver dropped");
        }
    }
}
