//! Shared fixtures for client integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use medals_client::{Alert, MedalBoard, Persistence, PersistenceError};
use medals_engine::{ChangeRecord, CounterKinds, Entity, EntityDto, EntityId};
use tokio::sync::{mpsc, Semaphore};

/// A persistence call as the fake received it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchAll,
    Create(String),
    Delete(EntityId),
    Patch(EntityId, Vec<ChangeRecord>),
}

/// In-memory persistence with scripted failures.
///
/// When gated, every create/delete/patch blocks until the test releases a
/// permit, which lets a test act while a commit is in flight. Fetches have
/// their own gate.
pub struct FakePersistence {
    kinds: CounterKinds,
    entities: Mutex<Vec<EntityDto>>,
    next_id: AtomicI64,
    failures: Mutex<VecDeque<PersistenceError>>,
    gate: Option<Arc<Semaphore>>,
    fetch_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<Call>>,
}

impl FakePersistence {
    pub fn new(entities: Vec<Entity>) -> Self {
        let next_id = entities.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        Self {
            kinds: CounterKinds::default(),
            entities: Mutex::new(entities.iter().map(Entity::to_dto).collect()),
            next_id: AtomicI64::new(next_id),
            failures: Mutex::new(VecDeque::new()),
            gate: None,
            fetch_gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make mutating calls wait for a permit on the returned semaphore.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Make fetches wait for a permit on the returned semaphore.
    pub fn gated_fetch(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.fetch_gate = Some(gate.clone());
        (self, gate)
    }

    /// The next call fails with `error`.
    pub fn fail_next(&self, error: PersistenceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Id the next create will assign.
    pub fn peek_next_id(&self) -> EntityId {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn stored(&self, id: EntityId) -> Option<EntityDto> {
        self.entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    async fn enter(&self, call: Call) -> Result<(), PersistenceError> {
        let gate = if call == Call::FetchAll {
            &self.fetch_gate
        } else {
            &self.gate
        };
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Persistence for FakePersistence {
    async fn fetch_all(&self) -> Result<Vec<EntityDto>, PersistenceError> {
        self.enter(Call::FetchAll).await?;
        Ok(self.entities.lock().unwrap().clone())
    }

    async fn create(&self, name: &str) -> Result<EntityDto, PersistenceError> {
        self.enter(Call::Create(name.to_string())).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let dto = Entity::zeroed(id, name, &self.kinds).to_dto();
        self.entities.lock().unwrap().push(dto.clone());
        Ok(dto)
    }

    async fn delete(&self, id: EntityId) -> Result<(), PersistenceError> {
        self.enter(Call::Delete(id)).await?;
        let mut entities = self.entities.lock().unwrap();
        let index = entities
            .iter()
            .position(|e| e.id == id)
            .ok_or(PersistenceError::NotFound)?;
        entities.remove(index);
        Ok(())
    }

    async fn patch(&self, id: EntityId, changes: &[ChangeRecord]) -> Result<(), PersistenceError> {
        self.enter(Call::Patch(id, changes.to_vec())).await?;
        let mut entities = self.entities.lock().unwrap();
        let entity = entities
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(PersistenceError::NotFound)?;
        for change in changes {
            entity
                .counts
                .insert(change.path.clone(), serde_json::json!(change.value));
        }
        Ok(())
    }
}

pub fn country(id: EntityId, name: &str, gold: i64, silver: i64, bronze: i64) -> Entity {
    Entity::settled(id, name, [("gold", gold), ("silver", silver), ("bronze", bronze)])
}

/// A board loaded from `persistence`.
pub async fn loaded_board(
    persistence: Arc<FakePersistence>,
) -> (MedalBoard, mpsc::UnboundedReceiver<Alert>) {
    let (board, alerts) = MedalBoard::new(CounterKinds::default(), persistence);
    board.load().await.unwrap();
    (board, alerts)
}

/// Poll `condition` until it holds, yielding to spawned tasks in between.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
