//! Entity types: counters with dual values and the flat wire form.

use crate::{error::Result, CounterKinds, CounterName, EntityId, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A counter value as shown locally and as last confirmed persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualValue {
    /// Value shown and edited locally
    pub displayed: i64,
    /// Last value confirmed persisted
    pub saved: i64,
}

impl DualValue {
    /// A clean value: displayed and saved agree.
    pub fn settled(value: i64) -> Self {
        Self {
            displayed: value,
            saved: value,
        }
    }

    /// Whether the displayed value carries an unsaved edit.
    pub fn is_dirty(&self) -> bool {
        self.displayed != self.saved
    }
}

/// One named counter on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counter {
    pub name: CounterName,
    #[serde(flatten)]
    pub value: DualValue,
}

/// A tracked entity (a country) with its counters in configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Identifier assigned by the persistence service (negative while provisional)
    pub id: EntityId,
    /// Display name, immutable
    pub name: String,
    /// One counter per configured kind
    pub counters: Vec<Counter>,
}

impl Entity {
    /// Create an entity with every counter settled at zero.
    pub fn zeroed(id: EntityId, name: impl Into<String>, kinds: &CounterKinds) -> Self {
        Self {
            id,
            name: name.into(),
            counters: kinds
                .iter()
                .map(|k| Counter {
                    name: k.to_string(),
                    value: DualValue::default(),
                })
                .collect(),
        }
    }

    /// Create an entity from settled counter values, in the order given.
    pub fn settled<I, S>(id: EntityId, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<CounterName>,
    {
        Self {
            id,
            name: name.into(),
            counters: values
                .into_iter()
                .map(|(k, v)| Counter {
                    name: k.into(),
                    value: DualValue::settled(v),
                })
                .collect(),
        }
    }

    /// Get a counter by name.
    pub fn counter(&self, name: &str) -> Option<&DualValue> {
        self.counters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.value)
    }

    /// Get a mutable counter by name.
    pub fn counter_mut(&mut self, name: &str) -> Option<&mut DualValue> {
        self.counters
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| &mut c.value)
    }

    /// Whether any counter carries an unsaved edit.
    pub fn is_dirty(&self) -> bool {
        self.counters.iter().any(|c| c.value.is_dirty())
    }

    /// Sum of displayed values across this entity's counters, saturating.
    pub fn displayed_total(&self) -> i64 {
        self.counters
            .iter()
            .map(|c| c.value.displayed)
            .fold(0, i64::saturating_add)
    }

    /// Check that every configured kind is present.
    pub fn check_complete(&self, kinds: &CounterKinds) -> Result<()> {
        for kind in kinds.iter() {
            if self.counter(kind).is_none() {
                return Err(Error::IncompleteCounters {
                    id: self.id,
                    missing: kind.to_string(),
                });
            }
        }
        for counter in &self.counters {
            kinds.require(&counter.name)?;
        }
        Ok(())
    }

    /// Flat wire form using saved values.
    pub fn to_dto(&self) -> EntityDto {
        EntityDto {
            id: self.id,
            name: self.name.clone(),
            counts: self
                .counters
                .iter()
                .map(|c| (c.name.clone(), serde_json::Value::from(c.value.saved)))
                .collect(),
        }
    }
}

/// Flat entity as exchanged with the persistence service and the hub:
/// `{"id": 1, "name": "Norway", "gold": 16, "silver": 8, "bronze": 13}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDto {
    pub id: EntityId,
    pub name: String,
    /// One field per counter kind; unrelated fields are carried along.
    #[serde(flatten)]
    pub counts: BTreeMap<String, serde_json::Value>,
}

impl EntityDto {
    /// Build a settled entity, taking one integer field per configured kind.
    pub fn to_entity(&self, kinds: &CounterKinds) -> Result<Entity> {
        let mut counters = Vec::with_capacity(kinds.len());
        for kind in kinds.iter() {
            let value = self
                .counts
                .get(kind)
                .ok_or_else(|| {
                    Error::MalformedEvent(format!("entity {} has no '{}' field", self.id, kind))
                })?
                .as_i64()
                .ok_or_else(|| {
                    Error::MalformedEvent(format!(
                        "entity {} field '{}' is not an integer",
                        self.id, kind
                    ))
                })?;
            counters.push(Counter {
                name: kind.to_string(),
                value: DualValue::settled(value),
            });
        }

        Ok(Entity {
            id: self.id,
            name: self.name.clone(),
            counters,
        })
    }
}
