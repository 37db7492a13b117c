//! Undo records and the presentation snapshot.
//!
//! Optimistic commits do not keep a copy of the whole store for rollback.
//! They keep an undo record describing only what they touched, so a failed
//! commit cannot clobber changes that landed while its call was in flight.

use crate::{aggregate, CounterKinds, CounterName, Entity, EntityId, EntityStore};
use serde::{Deserialize, Serialize};

/// Counter values before and after a staged save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedCounter {
    pub name: CounterName,
    /// Saved value before staging
    pub before: i64,
    /// Value the save staged as saved
    pub staged: i64,
}

/// Undo record for a staged save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveUndo {
    pub id: EntityId,
    pub counters: Vec<StagedCounter>,
}

/// Undo record for an optimistic removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedEntity {
    /// Position the entity held before removal
    pub index: usize,
    pub entity: Entity,
}

/// Per-kind total of displayed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterTotal {
    pub name: CounterName,
    pub total: i64,
}

/// What the view layer renders: entities plus derived totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub entities: Vec<Entity>,
    pub total: i64,
    pub counter_totals: Vec<CounterTotal>,
    /// Ids with unsaved edits
    pub dirty: Vec<EntityId>,
}

impl BoardView {
    /// Derive a view from the current store.
    pub fn of(store: &EntityStore, kinds: &CounterKinds) -> Self {
        Self {
            entities: store.entities().to_vec(),
            total: aggregate::total(store),
            counter_totals: aggregate::counter_totals(store, kinds)
                .into_iter()
                .map(|(name, total)| CounterTotal { name, total })
                .collect(),
            dirty: store.dirty_ids(),
        }
    }

    /// Serialize for a view layer that speaks JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
