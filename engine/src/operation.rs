//! Change and event types.
//!
//! Local edits leave the engine as [`ChangeRecord`]s (JSON Patch `replace`
//! entries); remote notifications enter it as [`RemoteEvent`]s.

use crate::{error::Result, CounterKinds, CounterName, Entity, EntityDto, EntityId, Error};
use serde::{Deserialize, Serialize};

/// Hub target carrying a created entity.
pub const TARGET_ADD: &str = "ReceiveAddMessage";
/// Hub target carrying a deleted entity id.
pub const TARGET_DELETE: &str = "ReceiveDeleteMessage";
/// Hub target carrying a patched entity.
pub const TARGET_PATCH: &str = "ReceivePatchMessage";

/// Patch operation kind. Only `replace` is ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
}

/// One field change sent to the persistence service.
///
/// Serializes as `{"op": "replace", "path": "gold", "value": 5}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub op: PatchOp,
    /// Counter name
    pub path: CounterName,
    /// New persisted value
    pub value: i64,
}

impl ChangeRecord {
    /// Create a `replace` change for a counter.
    pub fn replace(path: impl Into<CounterName>, value: i64) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value,
        }
    }
}

/// A decoded real-time notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    Add(Entity),
    Delete(EntityId),
    Patch(Entity),
}

impl RemoteEvent {
    /// Decode a hub invocation (`target` plus positional `arguments`).
    ///
    /// Unknown targets, missing arguments and payloads that do not carry
    /// every configured counter are reported as [`Error::MalformedEvent`].
    pub fn decode(
        target: &str,
        arguments: &[serde_json::Value],
        kinds: &CounterKinds,
    ) -> Result<Self> {
        let first = arguments
            .first()
            .ok_or_else(|| Error::MalformedEvent(format!("{target}: no arguments")))?;

        match target {
            TARGET_ADD => Ok(RemoteEvent::Add(decode_entity(target, first, kinds)?)),
            TARGET_PATCH => Ok(RemoteEvent::Patch(decode_entity(target, first, kinds)?)),
            TARGET_DELETE => first.as_i64().map(RemoteEvent::Delete).ok_or_else(|| {
                Error::MalformedEvent(format!("{target}: id is not an integer: {first}"))
            }),
            other => Err(Error::MalformedEvent(format!("unknown target: {other}"))),
        }
    }

    /// Id of the entity this event targets.
    pub fn entity_id(&self) -> EntityId {
        match self {
            RemoteEvent::Add(e) | RemoteEvent::Patch(e) => e.id,
            RemoteEvent::Delete(id) => *id,
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            RemoteEvent::Add(_) => "add",
            RemoteEvent::Delete(_) => "delete",
            RemoteEvent::Patch(_) => "patch",
        }
    }
}

fn decode_entity(target: &str, value: &serde_json::Value, kinds: &CounterKinds) -> Result<Entity> {
    let dto: EntityDto = serde_json::from_value(value.clone())
        .map_err(|e| Error::MalformedEvent(format!("{target}: {e}")))?;
    dto.to_entity(kinds)
}
