//! Realtime notifications flowing through a board.

mod common;

use std::sync::Arc;

use common::{country, loaded_board, wait_until, FakePersistence};
use medals_client::{
    ChannelTransport, EventListener, EventTransport, MedalBoard, Notification, TransportError,
};
use medals_engine::{CounterKinds, DualValue, TARGET_ADD, TARGET_DELETE, TARGET_PATCH};
use serde_json::json;

fn add(id: i64, name: &str, gold: i64) -> Notification {
    Notification::new(
        TARGET_ADD,
        vec![json!({"id": id, "name": name, "gold": gold, "silver": 0, "bronze": 0})],
    )
}

fn patch(id: i64, name: &str, gold: i64) -> Notification {
    Notification::new(
        TARGET_PATCH,
        vec![json!({"id": id, "name": name, "gold": gold, "silver": 0, "bronze": 0})],
    )
}

fn delete(id: i64) -> Notification {
    Notification::new(TARGET_DELETE, vec![json!(id)])
}

#[tokio::test]
async fn test_remote_add_then_local_increment() {
    let (board, _alerts) = loaded_board(Arc::new(FakePersistence::new(vec![]))).await;
    let (transport, tx) = ChannelTransport::new(16);
    board.connect(&transport).await.unwrap();

    tx.send(add(2, "X", 0)).await.unwrap();
    wait_until(|| board.store().current().contains(2)).await;

    board.on_increment(2, "gold").unwrap();
    let gold = board.store().current().get(2).unwrap().counter("gold").copied();
    assert_eq!(gold, Some(DualValue { displayed: 1, saved: 0 }));
    assert_eq!(board.total(), 1);
}

#[tokio::test]
async fn test_events_apply_in_order() {
    let (board, _alerts) = loaded_board(Arc::new(FakePersistence::new(vec![]))).await;
    let (transport, tx) = ChannelTransport::new(16);
    board.connect(&transport).await.unwrap();

    // Patch before add is dropped; the add brings its own values.
    tx.send(patch(5, "Kenya", 3)).await.unwrap();
    tx.send(add(5, "Kenya", 1)).await.unwrap();
    tx.send(add(5, "Kenya", 1)).await.unwrap();
    tx.send(add(6, "Fiji", 0)).await.unwrap();
    tx.send(delete(6)).await.unwrap();
    tx.send(delete(6)).await.unwrap();
    tx.send(add(8, "Oman", 2)).await.unwrap();
    wait_until(|| board.store().current().contains(8)).await;

    let ids: Vec<_> = board.entities().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![5, 8]);
    assert_eq!(board.total(), 3);
}

#[tokio::test]
async fn test_remote_patch_overwrites_unsaved_edits() {
    let fake = Arc::new(FakePersistence::new(vec![
        country(1, "Norway", 4, 0, 0),
        country(2, "Japan", 1, 0, 0),
    ]));
    let (board, _alerts) = loaded_board(fake).await;
    let (transport, tx) = ChannelTransport::new(16);
    board.connect(&transport).await.unwrap();

    board.on_increment(1, "gold").unwrap();
    board.on_increment(2, "gold").unwrap();

    tx.send(patch(1, "Norway", 7)).await.unwrap();
    wait_until(|| {
        board.store().current().get(1).unwrap().counter("gold") == Some(&DualValue::settled(7))
    })
    .await;

    // Unsaved edit on the other entity is untouched.
    let japan = board.store().current().get(2).unwrap().counter("gold").copied();
    assert_eq!(japan, Some(DualValue { displayed: 2, saved: 1 }));
}

#[tokio::test]
async fn test_events_during_load_beat_fetched_rows() {
    let (fake, gate) = FakePersistence::new(vec![
        country(1, "Norway", 4, 0, 0),
        country(2, "Japan", 1, 0, 0),
    ])
    .gated_fetch();
    let fake = Arc::new(fake);
    let (board, _alerts) = MedalBoard::new(CounterKinds::default(), fake.clone());
    let board = Arc::new(board);
    let listener = EventListener::new(board.store().clone(), CounterKinds::default());

    let load = tokio::spawn({
        let board = board.clone();
        async move { board.load().await }
    });
    wait_until(|| !fake.calls().is_empty()).await;

    // The fetch reply was produced before these events.
    listener.handle(&delete(2));
    listener.handle(&add(1, "Norway", 9));
    listener.handle(&add(3, "Chile", 2));

    gate.add_permits(1);
    assert_eq!(load.await.unwrap().unwrap(), 0);

    let ids: Vec<_> = board.entities().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 3]);
    let gold = board.store().current().get(1).unwrap().counter("gold").copied();
    assert_eq!(gold, Some(DualValue::settled(9)));
}

#[tokio::test]
async fn test_malformed_events_are_dropped() {
    let (board, _alerts) = loaded_board(Arc::new(FakePersistence::new(vec![]))).await;
    let (transport, tx) = ChannelTransport::new(16);
    board.connect(&transport).await.unwrap();

    tx.send(Notification::new(TARGET_DELETE, vec![])).await.unwrap();
    tx.send(Notification::new(TARGET_ADD, vec![json!({"id": 3, "name": "Peru"})]))
        .await
        .unwrap();
    tx.send(Notification::new("ReceiveShrugMessage", vec![json!(1)]))
        .await
        .unwrap();
    tx.send(add(4, "Chad", 0)).await.unwrap();
    wait_until(|| board.store().current().contains(4)).await;

    assert_eq!(board.entities().len(), 1);
}

#[tokio::test]
async fn test_listener_ends_when_transport_closes() {
    let (board, _alerts) = loaded_board(Arc::new(FakePersistence::new(vec![]))).await;
    let (transport, tx) = ChannelTransport::new(16);
    let handle = board.connect(&transport).await.unwrap();

    tx.send(add(1, "Togo", 0)).await.unwrap();
    drop(tx);

    handle.await.unwrap();
    assert!(board.store().current().contains(1));
}

#[tokio::test]
async fn test_change_subscription_fires() {
    let (board, _alerts) = loaded_board(Arc::new(FakePersistence::new(vec![]))).await;
    let mut changes = board.subscribe();
    changes.borrow_and_update();

    let (transport, tx) = ChannelTransport::new(16);
    board.connect(&transport).await.unwrap();
    tx.send(add(1, "Togo", 2)).await.unwrap();

    changes.changed().await.unwrap();
    assert_eq!(changes.borrow().len(), 1);
}

#[tokio::test]
async fn test_transport_starts_once() {
    let (transport, _tx) = ChannelTransport::new(1);
    transport.start().await.unwrap();
    assert!(matches!(
        transport.start().await,
        Err(TransportError::AlreadyStarted)
    ));
}
