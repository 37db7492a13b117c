//! HTTP persistence adapter against a fake REST resource.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use medals_client::{HttpPersistence, Persistence, PersistenceError};
use medals_engine::{ChangeRecord, CounterKinds};
use serde_json::{json, Value};

/// Id the fake server always answers with 500.
const BROKEN_ID: i64 = 500;

#[derive(Clone, Default)]
struct FakeApi {
    countries: Arc<Mutex<Vec<Value>>>,
    patches: Arc<Mutex<Vec<(i64, Vec<ChangeRecord>)>>>,
}

async fn list(State(api): State<FakeApi>) -> Json<Vec<Value>> {
    Json(api.countries.lock().unwrap().clone())
}

async fn create(State(api): State<FakeApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut countries = api.countries.lock().unwrap();
    let id = countries.len() as i64 + 1;
    let country = json!({"id": id, "name": body["name"], "gold": 0, "silver": 0, "bronze": 0});
    countries.push(country.clone());
    (StatusCode::CREATED, Json(country))
}

async fn remove(State(api): State<FakeApi>, Path(id): Path<i64>) -> StatusCode {
    if id == BROKEN_ID {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let mut countries = api.countries.lock().unwrap();
    match countries.iter().position(|c| c["id"] == json!(id)) {
        Some(index) => {
            countries.remove(index);
            StatusCode::NO_CONTENT
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn patch(
    State(api): State<FakeApi>,
    Path(id): Path<i64>,
    Json(changes): Json<Vec<ChangeRecord>>,
) -> (StatusCode, String) {
    if id == BROKEN_ID {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database offline".into());
    }
    let mut countries = api.countries.lock().unwrap();
    let Some(country) = countries.iter_mut().find(|c| c["id"] == json!(id)) else {
        return (StatusCode::NOT_FOUND, String::new());
    };
    for change in &changes {
        country[change.path.as_str()] = json!(change.value);
    }
    api.patches.lock().unwrap().push((id, changes));
    (StatusCode::NO_CONTENT, String::new())
}

/// Serve the fake API on a random port; returns the resource URL.
async fn spawn_api(api: FakeApi) -> String {
    let app = Router::new()
        .route("/api/country", get(list).post(create))
        .route("/api/country/{id}", axum::routing::delete(remove).patch(patch))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/country", addr)
}

fn seeded() -> FakeApi {
    let api = FakeApi::default();
    api.countries.lock().unwrap().extend([
        json!({"id": 1, "name": "Norway", "gold": 16, "silver": 8, "bronze": 13}),
        json!({"id": 2, "name": "Japan", "gold": 3, "silver": 6, "bronze": 9}),
    ]);
    api
}

fn client(url: &str) -> HttpPersistence {
    HttpPersistence::new(url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_all() {
    let url = spawn_api(seeded()).await;

    let dtos = client(&url).fetch_all().await.unwrap();
    assert_eq!(dtos.len(), 2);
    assert_eq!(dtos[0].name, "Norway");

    let norway = dtos[0].to_entity(&CounterKinds::default()).unwrap();
    assert_eq!(norway.displayed_total(), 37);
}

#[tokio::test]
async fn test_create_returns_server_entity() {
    let url = spawn_api(seeded()).await;

    let dto = client(&url).create("Chile").await.unwrap();
    assert_eq!(dto.id, 3);
    assert_eq!(dto.name, "Chile");
    assert_eq!(dto.counts["gold"], json!(0));
}

#[tokio::test]
async fn test_delete_and_not_found() {
    let api = seeded();
    let url = spawn_api(api.clone()).await;
    let persistence = client(&url);

    persistence.delete(2).await.unwrap();
    assert_eq!(api.countries.lock().unwrap().len(), 1);

    assert_eq!(persistence.delete(2).await, Err(PersistenceError::NotFound));
}

#[tokio::test]
async fn test_patch_sends_change_records() {
    let api = seeded();
    let url = spawn_api(api.clone()).await;

    let changes = vec![ChangeRecord::replace("gold", 17)];
    client(&url).patch(1, &changes).await.unwrap();

    assert_eq!(api.patches.lock().unwrap().clone(), vec![(1, changes)]);
    assert_eq!(api.countries.lock().unwrap()[0]["gold"], json!(17));

    assert_eq!(
        client(&url).patch(99, &[ChangeRecord::replace("gold", 1)]).await,
        Err(PersistenceError::NotFound)
    );
}

#[tokio::test]
async fn test_server_errors_are_transport_failures() {
    let url = spawn_api(seeded()).await;
    let persistence = client(&url);

    match persistence
        .patch(BROKEN_ID, &[ChangeRecord::replace("gold", 1)])
        .await
    {
        Err(PersistenceError::Transport(message)) => {
            assert!(message.contains("500"));
            assert!(message.contains("database offline"));
        }
        other => panic!("Expected transport error, got {:?}", other),
    }

    assert!(matches!(
        persistence.delete(BROKEN_ID).await,
        Err(PersistenceError::Transport(_))
    ));
}

#[tokio::test]
async fn test_unreachable_service() {
    let persistence = client("http://127.0.0.1:1/api/country");
    assert!(matches!(
        persistence.fetch_all().await,
        Err(PersistenceError::Transport(_))
    ));
}
