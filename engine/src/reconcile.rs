//! Reconciliation: pure transitions from one store value to the next.
//!
//! Remote events are folded in without touching unsaved edits on other
//! entities. A remote patch is last-writer-wins at entity granularity: it
//! replaces both displayed and saved values of every counter, discarding
//! any unsaved local edit on that entity.
//!
//! Remote transitions never fail. Events for unknown ids are absorbed, and
//! duplicate deliveries converge to the same store.
//!
//! Local transitions report [`Error::EntityNotFound`] or
//! [`Error::UnknownCounter`] so the caller can decide how loudly to ignore
//! a stale action.

use crate::{
    error::Result, ChangeRecord, Entity, EntityId, EntityStore, Error, RemoteEvent, RemovedEntity,
    SaveUndo, StagedCounter,
};

/// Fold a decoded remote event into the store.
pub fn apply_remote(store: &EntityStore, event: RemoteEvent) -> EntityStore {
    match event {
        RemoteEvent::Add(entity) => apply_remote_add(store, entity),
        RemoteEvent::Delete(id) => apply_remote_delete(store, id),
        RemoteEvent::Patch(entity) => apply_remote_patch(store, entity),
    }
}

/// Add a remotely created entity, replacing any copy with the same id.
pub fn apply_remote_add(store: &EntityStore, entity: Entity) -> EntityStore {
    let entity = settle(entity);
    let id = entity.id;
    if store.contains(id) {
        store.replace_by_id(id, entity).unwrap_or_else(|_| store.clone())
    } else {
        store.insert(entity).unwrap_or_else(|_| store.clone())
    }
}

/// Remove a remotely deleted entity. Unknown ids are a no-op.
pub fn apply_remote_delete(store: &EntityStore, id: EntityId) -> EntityStore {
    store.remove_by_id(id).unwrap_or_else(|_| store.clone())
}

/// Overwrite an entity's counters with remotely patched values.
///
/// A patch for an unknown id is dropped: its add event may still be in
/// flight, and an add is never synthesized from a patch.
pub fn apply_remote_patch(store: &EntityStore, patched: Entity) -> EntityStore {
    let patched = settle(patched);
    store
        .update_entity(patched.id, |entity| {
            entity.counters = patched.counters;
            Ok(())
        })
        .unwrap_or_else(|_| store.clone())
}

/// Add `delta` to one counter's displayed value.
pub fn apply_local_delta(
    store: &EntityStore,
    id: EntityId,
    counter: &str,
    delta: i64,
) -> Result<EntityStore> {
    store.update_entity(id, |entity| {
        let dual = entity
            .counter_mut(counter)
            .ok_or_else(|| Error::UnknownCounter(counter.to_string()))?;
        dual.displayed = dual.displayed.saturating_add(delta);
        Ok(())
    })
}

/// Discard unsaved edits: displayed = saved for every counter.
pub fn apply_local_reset(store: &EntityStore, id: EntityId) -> Result<EntityStore> {
    store.update_entity(id, |entity| {
        for counter in &mut entity.counters {
            counter.value.displayed = counter.value.saved;
        }
        Ok(())
    })
}

/// One `replace` change per dirty counter, in counter order.
///
/// Empty when nothing is dirty or the entity is unknown.
pub fn compute_save_diff(store: &EntityStore, id: EntityId) -> Vec<ChangeRecord> {
    store
        .get(id)
        .map(|entity| {
            entity
                .counters
                .iter()
                .filter(|c| c.value.is_dirty())
                .map(|c| ChangeRecord::replace(c.name.clone(), c.value.displayed))
                .collect()
        })
        .unwrap_or_default()
}

/// Optimistic save: mark each changed counter's value as saved.
///
/// Returns the new store and the undo record for the touched counters.
pub fn stage_save(
    store: &EntityStore,
    id: EntityId,
    changes: &[ChangeRecord],
) -> Result<(EntityStore, SaveUndo)> {
    let mut staged = Vec::with_capacity(changes.len());
    let next = store.update_entity(id, |entity| {
        for change in changes {
            let dual = entity
                .counter_mut(&change.path)
                .ok_or_else(|| Error::UnknownCounter(change.path.clone()))?;
            staged.push(StagedCounter {
                name: change.path.clone(),
                before: dual.saved,
                staged: change.value,
            });
            dual.saved = change.value;
        }
        Ok(())
    })?;

    Ok((
        next,
        SaveUndo {
            id,
            counters: staged,
        },
    ))
}

/// Roll back a staged save on the counters it touched.
///
/// Each counter still holding its staged value returns to the value saved
/// before the commit. The displayed value only follows when it was not
/// edited after staging, so increments made during the call stay visible as
/// unsaved edits. Counters overwritten by a remote patch in the meantime
/// keep the remote value.
pub fn undo_stage_save(store: &EntityStore, undo: &SaveUndo) -> EntityStore {
    store
        .update_entity(undo.id, |entity| {
            for staged in &undo.counters {
                if let Some(dual) = entity.counter_mut(&staged.name) {
                    if dual.saved == staged.staged {
                        dual.saved = staged.before;
                        if dual.displayed == staged.staged {
                            dual.displayed = staged.before;
                        }
                    }
                }
            }
            Ok(())
        })
        .unwrap_or_else(|_| store.clone())
}

/// Optimistic delete: remove the entity and remember where it was.
pub fn stage_delete(store: &EntityStore, id: EntityId) -> Result<(EntityStore, RemovedEntity)> {
    let index = store.position(id).ok_or(Error::EntityNotFound(id))?;
    let entity = store.entities()[index].clone();
    let next = store.remove_by_id(id)?;
    Ok((next, RemovedEntity { index, entity }))
}

/// Put an optimistically removed entity back at its former position.
///
/// If an entity with that id has reappeared meanwhile, it is kept as is.
pub fn restore_removed(store: &EntityStore, removed: &RemovedEntity) -> EntityStore {
    store
        .insert_at(removed.index, removed.entity.clone())
        .unwrap_or_else(|_| store.clone())
}

/// Swap a provisional entity for its server-confirmed counterpart.
///
/// Unsaved edits made to the provisional entity while the create call was
/// in flight are carried over as displayed values. When the remote add for
/// the confirmed id already arrived, the provisional entity is dropped and
/// the remote copy kept, so the id appears once.
pub fn confirm_add(store: &EntityStore, provisional_id: EntityId, confirmed: Entity) -> EntityStore {
    let mut confirmed = settle(confirmed);

    if store.contains(confirmed.id) {
        return drop_provisional(store, provisional_id);
    }

    match store.get(provisional_id) {
        Some(provisional) => {
            for counter in &provisional.counters {
                if counter.value.is_dirty() {
                    if let Some(dual) = confirmed.counter_mut(&counter.name) {
                        dual.displayed = counter.value.displayed;
                    }
                }
            }
            store
                .replace_by_id(provisional_id, confirmed)
                .unwrap_or_else(|_| store.clone())
        }
        None => store.insert(confirmed).unwrap_or_else(|_| store.clone()),
    }
}

/// Remove a provisional entity whose create call failed.
pub fn drop_provisional(store: &EntityStore, provisional_id: EntityId) -> EntityStore {
    store
        .remove_by_id(provisional_id)
        .unwrap_or_else(|_| store.clone())
}

/// Force displayed == saved on every counter of an incoming entity.
fn settle(mut entity: Entity) -> Entity {
    for counter in &mut entity.counters {
        counter.value.displayed = counter.value.saved;
    }
    entity
}
