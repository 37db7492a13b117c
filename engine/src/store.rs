//! Store - the ordered entity container.
//!
//! Every structural operation returns a new store value and leaves the
//! receiver untouched, so any earlier value can serve as an undo point.
//! Operations on an unknown id report [`Error::EntityNotFound`]; callers
//! that race with deletes treat it as a no-op.

use crate::{error::Result, CounterKinds, Entity, EntityDto, EntityId, Error};
use serde::{Deserialize, Serialize};

/// Ordered sequence of entities, unique by id, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityStore {
    entities: Vec<Entity>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entities: Vec::new(),
        }
    }

    /// Build a store from entities, checking id uniqueness and counter completeness.
    pub fn from_entities(entities: Vec<Entity>, kinds: &CounterKinds) -> Result<Self> {
        let mut store = Self::new();
        for entity in entities {
            entity.check_complete(kinds)?;
            store = store.insert(entity)?;
        }
        Ok(store)
    }

    /// Seed a store from the persistence service's listing.
    pub fn from_dtos(dtos: &[EntityDto], kinds: &CounterKinds) -> Result<Self> {
        let entities = dtos
            .iter()
            .map(|dto| dto.to_entity(kinds))
            .collect::<Result<Vec<_>>>()?;
        Self::from_entities(entities, kinds)
    }

    /// All entities in order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get an entity by id.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Index of an entity in the sequence.
    pub fn position(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Append an entity.
    pub fn insert(&self, entity: Entity) -> Result<Self> {
        let len = self.entities.len();
        self.insert_at(len, entity)
    }

    /// Insert an entity at `index`, clamped to the end of the sequence.
    pub fn insert_at(&self, index: usize, entity: Entity) -> Result<Self> {
        if self.contains(entity.id) {
            return Err(Error::DuplicateEntity(entity.id));
        }
        let mut entities = self.entities.clone();
        let index = index.min(entities.len());
        entities.insert(index, entity);
        Ok(Self { entities })
    }

    /// Remove an entity by id.
    pub fn remove_by_id(&self, id: EntityId) -> Result<Self> {
        let index = self.position(id).ok_or(Error::EntityNotFound(id))?;
        let mut entities = self.entities.clone();
        entities.remove(index);
        Ok(Self { entities })
    }

    /// Replace the entity at `id`'s position.
    ///
    /// The replacement may carry a different id (a provisional entity taking
    /// its server id), as long as that id is not used by another entity.
    pub fn replace_by_id(&self, id: EntityId, entity: Entity) -> Result<Self> {
        let index = self.position(id).ok_or(Error::EntityNotFound(id))?;
        if entity.id != id && self.contains(entity.id) {
            return Err(Error::DuplicateEntity(entity.id));
        }
        let mut entities = self.entities.clone();
        entities[index] = entity;
        Ok(Self { entities })
    }

    /// Set one counter's displayed value.
    pub fn update_counter_displayed(&self, id: EntityId, counter: &str, value: i64) -> Result<Self> {
        self.update_entity(id, |entity| {
            let dual = entity
                .counter_mut(counter)
                .ok_or_else(|| Error::UnknownCounter(counter.to_string()))?;
            dual.displayed = value;
            Ok(())
        })
    }

    /// Apply an in-place edit to a copy of one entity.
    pub(crate) fn update_entity<F>(&self, id: EntityId, edit: F) -> Result<Self>
    where
        F: FnOnce(&mut Entity) -> Result<()>,
    {
        let index = self.position(id).ok_or(Error::EntityNotFound(id))?;
        let mut entities = self.entities.clone();
        edit(&mut entities[index])?;
        Ok(Self { entities })
    }

    /// Ids of entities carrying unsaved edits.
    pub fn dirty_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|e| e.is_dirty())
            .map(|e| e.id)
            .collect()
    }
}
