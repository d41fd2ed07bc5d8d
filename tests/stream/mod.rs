use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use streamsource::error::EventStoreError;
use streamsource::store::stream::{Entry, Envelope, StreamClient, StreamStore, StreamStoreConfig};
use streamsource::store::EventStore;
use streamsource::{DomainEvent, Entity};

use crate::aggregate::{dummy_registry, DummyIncremented};
use crate::memory::sequenced_events;

pub use client::*;


fn store(log: Arc<InMemoryLog>) -> StreamStore<Arc<InMemoryLog>> {
    StreamStore::new(log, StreamStoreConfig::builder().registry(dummy_registry()).build())
}

fn dummy_entity() -> Entity {
    Entity::new(Uuid::new_v4(), "dummy")
}

#[tokio::test]
async fn records_are_addressed_by_entity_test() {
    let log = Arc::new(InMemoryLog::new());
    let store = store(log.clone());
    let entity = dummy_entity();
    let events = sequenced_events(&entity, 0, 2);

    store.save_events(&entity, &events, 0).await.unwrap();

    let entries = log.entries("dummy", &entity.id().to_string());
    assert_eq!(entries.len(), 2);

    for (entry, event) in entries.iter().zip(&events) {
        assert_eq!(entry.sequence, event.sequence());

        let value: serde_json::Value = serde_json::from_slice(&entry.payload).unwrap();
        assert_eq!(value["discriminator"], json!("dummy_incremented"));
        assert_eq!(value["payload"], json!({ "by": event.sequence() }));
        assert_eq!(value["metadata"]["entity"], json!(entity.to_string()));
    }
}

#[tokio::test]
async fn save_and_load_events_test() {
    let store = store(Arc::new(InMemoryLog::new()));
    let entity = dummy_entity();
    let events = sequenced_events(&entity, 0, 4);

    store.save_events(&entity, &events, 0).await.unwrap();

    let loaded = store.load_events(&entity, 0).await.unwrap();
    assert_eq!(loaded.len(), 4);
    for (loaded, saved) in loaded.iter().zip(&events) {
        assert_eq!(loaded.metadata(), saved.metadata());
        assert_eq!(
            loaded.downcast_ref::<DummyIncremented>(),
            saved.downcast_ref::<DummyIncremented>()
        );
    }

    let tail = store.load_events(&entity, 3).await.unwrap();
    let sequences: Vec<u64> = tail.iter().map(DomainEvent::sequence).collect();
    assert_eq!(sequences, vec![3, 4]);
}

#[tokio::test]
async fn boxed_client_test() {
    let client: Box<dyn StreamClient<Error = LogError>> = Box::new(InMemoryLog::new());
    let store = StreamStore::new(client, StreamStoreConfig::builder().registry(dummy_registry()).build());
    let entity = dummy_entity();

    store.save_events(&entity, &sequenced_events(&entity, 0, 2), 0).await.unwrap();

    assert_eq!(store.load_events(&entity, 0).await.unwrap().len(), 2);
}

#[tokio::test]
async fn load_unknown_entity_test() {
    let store = store(Arc::new(InMemoryLog::new()));

    let events = store.load_events(&dummy_entity(), 0).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn rejected_append_is_a_conflict_test() {
    let log = Arc::new(InMemoryLog::new());
    let store = store(log.clone());
    let entity = dummy_entity();
    store.save_events(&entity, &sequenced_events(&entity, 0, 3), 0).await.unwrap();

    let result = store.save_events(&entity, &sequenced_events(&entity, 1, 1), 1).await;

    assert!(matches!(
        result,
        Err(EventStoreError::Concurrency {
            expected: 1,
            actual: 3,
            ..
        })
    ));
    assert_eq!(log.entries("dummy", &entity.id().to_string()).len(), 3);
}

#[tokio::test]
async fn transport_errors_are_surfaced_test() {
    let log = Arc::new(InMemoryLog::new());
    let store = store(log.clone());
    let entity = dummy_entity();
    log.set_unavailable(true);

    let save = store.save_events(&entity, &sequenced_events(&entity, 0, 1), 0).await;
    assert!(matches!(save, Err(EventStoreError::Stream(_))));

    let load = store.load_events(&entity, 0).await;
    assert!(matches!(load, Err(EventStoreError::Stream(_))));
}

#[tokio::test]
async fn unregistered_event_fails_load_test() {
    let log = Arc::new(InMemoryLog::new());
    let store = store(log.clone());
    let entity = dummy_entity();
    store.save_events(&entity, &sequenced_events(&entity, 0, 1), 0).await.unwrap();

    let mut envelope = Envelope::seal(&sequenced_events(&entity, 1, 1)[0]).unwrap();
    envelope.discriminator = "dummy_deleted".to_string();
    log.append_raw(
        "dummy",
        &entity.id().to_string(),
        Entry {
            sequence: 2,
            payload: serde_json::to_vec(&envelope).unwrap(),
        },
    );

    let result = store.load_events(&entity, 0).await;
    assert!(matches!(result, Err(EventStoreError::InvalidEventType(discriminator)) if discriminator == "dummy_deleted"));
}

#[tokio::test]
async fn malformed_record_fails_load_test() {
    let log = Arc::new(InMemoryLog::new());
    let store = store(log.clone());
    let entity = dummy_entity();
    log.append_raw(
        "dummy",
        &entity.id().to_string(),
        Entry {
            sequence: 1,
            payload: b"not an envelope".to_vec(),
        },
    );

    let result = store.load_events(&entity, 0).await;

    assert!(matches!(result, Err(EventStoreError::Json(_))));
}

#[tokio::test]
async fn stalled_log_times_out_test() {
    let timeout = Duration::from_millis(50);
    let store = StreamStore::new(
        StalledLog,
        StreamStoreConfig::builder()
            .registry(dummy_registry())
            .request_timeout(timeout)
            .build(),
    );
    let entity = dummy_entity();

    let save = store.save_events(&entity, &sequenced_events(&entity, 0, 1), 0).await;
    assert!(matches!(save, Err(EventStoreError::Timeout(duration)) if duration == timeout));

    let load = store.load_events(&entity, 0).await;
    assert!(matches!(load, Err(EventStoreError::Timeout(_))));
}
