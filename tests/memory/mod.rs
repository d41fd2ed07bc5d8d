use rand::Rng;
use uuid::Uuid;

use streamsource::error::EventStoreError;
use streamsource::store::{EventStore, InMemoryEventStore};
use streamsource::{AggregateState, DomainEvent, Entity, TraceContext};

use crate::aggregate::{Dummy, DummyIncremented};

/// Events of the entity numbered `from + 1..=from + count`.
pub fn sequenced_events(entity: &Entity, from: u64, count: u64) -> Vec<DomainEvent> {
    let mut state: AggregateState<Dummy> = AggregateState::new(entity.clone(), TraceContext::new()).unwrap();
    for by in 1..=from + count {
        state.raise(DummyIncremented { by }).unwrap();
    }
    state.uncommitted_events()[from as usize..].to_vec()
}

fn dummy_entity() -> Entity {
    Entity::new(Uuid::new_v4(), "dummy")
}

#[tokio::test]
async fn save_and_load_events_test() {
    let store = InMemoryEventStore::new();
    let entity = dummy_entity();

    store.save_events(&entity, &sequenced_events(&entity, 0, 3), 0).await.unwrap();
    store.save_events(&entity, &sequenced_events(&entity, 3, 2), 3).await.unwrap();

    let events = store.load_events(&entity, 0).await.unwrap();
    let sequences: Vec<u64> = events.iter().map(DomainEvent::sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    assert_eq!(store.event_count(&entity), 5);

    let tail = store.load_events(&entity, 4).await.unwrap();
    let sequences: Vec<u64> = tail.iter().map(DomainEvent::sequence).collect();
    assert_eq!(sequences, vec![4, 5]);
}

#[tokio::test]
async fn load_unknown_entity_test() {
    let store = InMemoryEventStore::new();

    let events = store.load_events(&dummy_entity(), 0).await.unwrap();

    assert!(events.is_empty());
}

#[tokio::test]
async fn stale_expected_sequence_test() {
    let store = InMemoryEventStore::new();
    let entity = dummy_entity();
    store.save_events(&entity, &sequenced_events(&entity, 0, 2), 0).await.unwrap();

    let result = store.save_events(&entity, &sequenced_events(&entity, 0, 1), 0).await;

    match result {
        Err(error @ EventStoreError::Concurrency { .. }) => {
            assert!(error.is_conflict());
            assert!(error.to_string().contains("reload the aggregate and retry"));
        }
        other => panic!("expected a concurrency error, got {:?}", other),
    }
    assert_eq!(store.event_count(&entity), 2);
}

#[tokio::test]
async fn rejected_save_leaves_no_stream_test() {
    let store = InMemoryEventStore::new();
    let entity = dummy_entity();

    for _ in 0..3 {
        let result = store.save_events(&entity, &[], 5).await;
        assert!(matches!(
            result,
            Err(EventStoreError::Concurrency {
                expected: 5,
                actual: 0,
                ..
            })
        ));
    }
    let result = store.save_events(&entity, &sequenced_events(&entity, 2, 1), 2).await;
    assert!(matches!(result, Err(EventStoreError::Concurrency { .. })));

    assert!(store.entities().is_empty());
    assert_eq!(store.event_count(&entity), 0);

    store.save_events(&entity, &[], 0).await.unwrap();
    assert!(store.entities().is_empty());

    store.save_events(&entity, &sequenced_events(&entity, 0, 1), 0).await.unwrap();
    assert_eq!(store.entities(), vec![entity]);
}

#[tokio::test]
async fn gap_in_batch_is_rejected_test() {
    let store = InMemoryEventStore::new();
    let entity = dummy_entity();
    let mut events = sequenced_events(&entity, 0, 3);
    events.remove(1);

    let result = store.save_events(&entity, &events, 0).await;

    assert!(matches!(
        result,
        Err(EventStoreError::InvalidSequence {
            expected: 2,
            found: 3,
            ..
        })
    ));
    assert_eq!(store.event_count(&entity), 0);
}

#[tokio::test]
async fn entities_are_isolated_test() {
    let store = InMemoryEventStore::new();
    let first = dummy_entity();
    let second = dummy_entity();

    store.save_events(&first, &sequenced_events(&first, 0, 2), 0).await.unwrap();
    store.save_events(&second, &sequenced_events(&second, 0, 1), 0).await.unwrap();

    assert_eq!(store.load_events(&first, 0).await.unwrap().len(), 2);
    assert_eq!(store.load_events(&second, 0).await.unwrap().len(), 1);
    assert_eq!(store.entities().len(), 2);

    store.clear();
    assert!(store.entities().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_single_winner_test() {
    let store = InMemoryEventStore::new();
    let entity = dummy_entity();
    store.save_events(&entity, &sequenced_events(&entity, 0, 2), 0).await.unwrap();

    let batches: Vec<Vec<DomainEvent>> = {
        let mut rng = rand::thread_rng();
        (0..8)
            .map(|_| sequenced_events(&entity, 2, rng.gen_range(1..10)))
            .collect()
    };

    let handles: Vec<_> = batches
        .into_iter()
        .map(|batch| {
            let store = store.clone();
            let entity = entity.clone();
            tokio::spawn(async move {
                let len = batch.len();
                store.save_events(&entity, &batch, 2).await.map(|_| len)
            })
        })
        .collect();

    let mut winners = vec![];
    for handle in handles {
        match handle.await.unwrap() {
            Ok(len) => winners.push(len),
            Err(error) => assert!(error.is_conflict(), "unexpected error {:?}", error),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(store.event_count(&entity), 2 + winners[0]);
}
