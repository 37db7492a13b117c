//! REST adapter: `GET/POST {base}`, `DELETE/PATCH {base}/{id}`.

use super::Persistence;
use crate::error::PersistenceError;
use async_trait::async_trait;
use medals_engine::{ChangeRecord, EntityDto, EntityId};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

/// Request body for creating an entity.
#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    name: &'a str,
}

/// Persistence over the entity REST resource.
#[derive(Debug, Clone)]
pub struct HttpPersistence {
    client: Client,
    base_url: String,
}

impl HttpPersistence {
    /// Create an adapter for the resource at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn item_url(&self, id: EntityId) -> String {
        format!("{}/{}", self.base_url, id)
    }
}

/// Map non-success statuses to [`PersistenceError`].
async fn check(response: Response) -> Result<Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(PersistenceError::NotFound);
    }

    let body = response.text().await.unwrap_or_default();
    Err(PersistenceError::Transport(if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }))
}

#[async_trait]
impl Persistence for HttpPersistence {
    async fn fetch_all(&self) -> Result<Vec<EntityDto>, PersistenceError> {
        let response = self.client.get(&self.base_url).send().await?;
        let dtos = check(response).await?.json().await?;
        Ok(dtos)
    }

    async fn create(&self, name: &str) -> Result<EntityDto, PersistenceError> {
        let response = self
            .client
            .post(&self.base_url)
            .json(&CreateRequest { name })
            .send()
            .await?;
        let dto = check(response).await?.json().await?;
        Ok(dto)
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn patch(&self, id: EntityId, changes: &[ChangeRecord]) -> Result<(), PersistenceError> {
        tracing::debug!(
            entity_id = id,
            patch = %serde_json::to_string(changes).unwrap_or_default(),
            "Sending json patch"
        );
        let response = self
            .client
            .patch(self.item_url(id))
            .json(changes)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
