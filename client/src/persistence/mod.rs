//! Persistence service interface.
//!
//! The coordinator only sees this trait; [`HttpPersistence`] talks to the
//! REST resource.

mod http;

pub use http::HttpPersistence;

use crate::error::PersistenceError;
use async_trait::async_trait;
use medals_engine::{ChangeRecord, EntityDto, EntityId};

/// Durable storage for entities.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    /// List every entity.
    async fn fetch_all(&self) -> Result<Vec<EntityDto>, PersistenceError>;

    /// Create an entity; the service assigns its id.
    async fn create(&self, name: &str) -> Result<EntityDto, PersistenceError>;

    /// Delete an entity.
    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError>;

    /// Apply `replace` changes to an entity's counters.
    async fn patch(&self, id: EntityId, changes: &[ChangeRecord]) -> Result<(), PersistenceError>;
}
