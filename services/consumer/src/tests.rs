//! Tests for the skill consumer: service conversion rules and the consumer loop

use crate::config::ConsumerConfig;
use crate::consumer::{ConsumerStats, SkillConsumer};
use crate::dispatcher::SkillDispatcher;
use crate::service::{ServiceError, SkillService, StorageSkillService};
use crate::storage::{MockSkillStorage, StorageError};
use serde_json::{json, Value};
use shared::broker::InMemoryBroker;
use shared::command::{CreateSkillRequest, SkillAction, SkillCommand, UpdateSkillRequest};
use shared::config::{BrokerConfig, StartPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TOPIC: &str = "skills.commands";

fn test_config() -> ConsumerConfig {
    ConsumerConfig {
        postgres_uri: "postgres://localhost/skills_test".to_string(),
        consumer_name: "skill-consumer-test".to_string(),
        start: StartPolicy::Earliest,
        broker: BrokerConfig {
            broker_url: "memory://".to_string(),
            skill_topic: TOPIC.to_string(),
            skill_stream: "SKILLS".to_string(),
            publish_timeout_ms: 100,
        },
    }
}

fn service(storage: MockSkillStorage) -> StorageSkillService<MockSkillStorage> {
    StorageSkillService::new(Arc::new(storage))
}

fn wire(action: &str, key: Option<&str>, payload: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({"action": action, "key": key, "payload": payload})).unwrap()
}

async fn drain(broker: &InMemoryBroker, storage: MockSkillStorage, messages: Vec<Vec<u8>>) -> ConsumerStats {
    let partition = broker.partition(TOPIC);
    for message in messages {
        broker.inject(TOPIC, message);
    }
    broker.shutdown(TOPIC);

    SkillConsumer::new(test_config(), partition, SkillDispatcher::new(service(storage)))
        .run(CancellationToken::new())
        .await
        .unwrap()
}

// ============================================================================
// Service layer
// ============================================================================

#[tokio::test]
async fn test_create_forwards_typed_request() {
    let mut storage = MockSkillStorage::new();
    storage
        .expect_create_skill()
        .withf(|request| {
            request
                == &CreateSkillRequest {
                    key: "go".to_string(),
                    name: "Go".to_string(),
                    description: "Concurrency made easy".to_string(),
                    logo: "go.png".to_string(),
                    tags: vec!["backend".to_string()],
                }
        })
        .times(1)
        .returning(|_| Ok(()));

    let command = SkillCommand::new(
        SkillAction::Create,
        None,
        json!({
            "key": "go",
            "name": "Go",
            "description": "Concurrency made easy",
            "logo": "go.png",
            "tags": ["backend"]
        }),
    );

    service(storage).create_skill(&command).await.unwrap();
}

#[tokio::test]
async fn test_update_tags_shape_mismatch_never_reaches_storage() {
    // No expectation: any storage call would panic.
    let storage = MockSkillStorage::new();
    let command = SkillCommand::new(
        SkillAction::UpdateTags,
        Some("go".to_string()),
        json!({"tags": "notanarray"}),
    );

    let err = service(storage).update_tags(&command).await.unwrap_err();

    assert!(matches!(err, ServiceError::Conversion(ref e) if e.target == "UpdateSkillTagsRequest"));
    assert!(err.to_string().contains("UpdateSkillTagsRequest"));
}

#[test]
fn test_null_payload_is_a_conversion_error() {
    let storage = MockSkillStorage::new();
    let command = SkillCommand::new(SkillAction::UpdateLogo, Some("go".to_string()), Value::Null);

    let err = tokio_test::block_on(service(storage).update_logo(&command)).unwrap_err();
    assert!(err.to_string().contains("UpdateSkillLogoRequest"));
}

#[tokio::test]
async fn test_update_name_uses_key_and_name() {
    let mut storage = MockSkillStorage::new();
    storage
        .expect_update_name()
        .withf(|key, name| key == "go" && name == "Golang")
        .times(1)
        .returning(|_, _| Ok(()));

    let command = SkillCommand::new(
        SkillAction::UpdateName,
        Some("go".to_string()),
        json!({"name": "Golang"}),
    );

    service(storage).update_name(&command).await.unwrap();
}

#[tokio::test]
async fn test_update_description_and_tags_forward_fields() {
    let mut storage = MockSkillStorage::new();
    storage
        .expect_update_description()
        .withf(|key, description| key == "rust" && description == "Fearless")
        .times(1)
        .returning(|_, _| Ok(()));
    storage
        .expect_update_tags()
        .withf(|key, tags| key == "rust" && tags.len() == 2 && tags[0] == "systems" && tags[1] == "safe")
        .times(1)
        .returning(|_, _| Ok(()));
    let service = service(storage);

    let describe = SkillCommand::new(
        SkillAction::UpdateDescription,
        Some("rust".to_string()),
        json!({"description": "Fearless"}),
    );
    let tag = SkillCommand::new(
        SkillAction::UpdateTags,
        Some("rust".to_string()),
        json!({"tags": ["systems", "safe"]}),
    );

    service.update_description(&describe).await.unwrap();
    service.update_tags(&tag).await.unwrap();
}

#[tokio::test]
async fn test_storage_error_propagates_unchanged() {
    let mut storage = MockSkillStorage::new();
    storage
        .expect_delete_skill()
        .times(1)
        .returning(|_| Err(StorageError::Database(sqlx::Error::PoolTimedOut)));

    let command = SkillCommand::new(SkillAction::Delete, Some("go".to_string()), Value::Null);
    let err = service(storage).delete_skill(&command).await.unwrap_err();

    assert!(matches!(err, ServiceError::Storage(StorageError::Database(sqlx::Error::PoolTimedOut))));
}

#[test]
fn test_update_without_key_is_rejected_before_conversion() {
    let storage = MockSkillStorage::new();
    let command = SkillCommand::new(SkillAction::Update, None, json!({}));

    let err = tokio_test::block_on(service(storage).update_skill(&command)).unwrap_err();
    assert!(matches!(err, ServiceError::MissingKey));
}

#[tokio::test]
async fn test_update_with_partial_payload_is_a_conversion_error() {
    // No expectation: any storage call would panic.
    let storage = MockSkillStorage::new();
    let command = SkillCommand::new(SkillAction::Update, Some("go".to_string()), json!({"name": "x"}));

    let err = service(storage).update_skill(&command).await.unwrap_err();

    assert!(matches!(err, ServiceError::Conversion(ref e) if e.target == "UpdateSkillRequest"));
}

#[tokio::test]
async fn test_update_forwards_full_request() {
    let mut storage = MockSkillStorage::new();
    storage
        .expect_update_skill()
        .withf(|key, request| {
            key == "go"
                && request
                    == &UpdateSkillRequest {
                        name: "Go".to_string(),
                        description: "Concurrency made easy".to_string(),
                        logo: "gopher.png".to_string(),
                        tags: vec!["backend".to_string(), "cloud".to_string()],
                    }
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let command = SkillCommand::new(
        SkillAction::Update,
        Some("go".to_string()),
        json!({
            "name": "Go",
            "description": "Concurrency made easy",
            "logo": "gopher.png",
            "tags": ["backend", "cloud"]
        }),
    );

    service(storage).update_skill(&command).await.unwrap();
}

// ============================================================================
// Consumer loop
// ============================================================================

#[tokio::test]
async fn test_loop_skips_undecodable_message_and_continues() {
    let broker = InMemoryBroker::new();
    let mut storage = MockSkillStorage::new();
    storage
        .expect_update_name()
        .withf(|key, name| key == "go" && name == "Golang")
        .times(1)
        .returning(|_, _| Ok(()));

    let stats = drain(
        &broker,
        storage,
        vec![
            b"{not json".to_vec(),
            wire("update_name", Some("go"), json!({"name": "Golang"})),
        ],
    )
    .await;

    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(broker.committed(), vec![0, 1]);
}

#[tokio::test]
async fn test_loop_skips_invalid_envelopes() {
    let broker = InMemoryBroker::new();
    let storage = MockSkillStorage::new();

    let stats = drain(
        &broker,
        storage,
        vec![
            wire("", Some("go"), Value::Null),
            wire("delete", None, Value::Null),
            b"null".to_vec(),
        ],
    )
    .await;

    assert_eq!(stats.validation_failures, 2);
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.received(), 3);
}

#[tokio::test]
async fn test_loop_survives_storage_failure() {
    let broker = InMemoryBroker::new();
    let mut storage = MockSkillStorage::new();
    storage
        .expect_delete_skill()
        .times(1)
        .returning(|_| Err(StorageError::Database(sqlx::Error::PoolTimedOut)));
    storage
        .expect_update_logo()
        .withf(|key, logo| key == "go" && logo == "gopher.png")
        .times(1)
        .returning(|_, _| Ok(()));

    let stats = drain(
        &broker,
        storage,
        vec![
            wire("delete", Some("go"), Value::Null),
            wire("update_logo", Some("go"), json!({"logo": "gopher.png"})),
        ],
    )
    .await;

    assert_eq!(stats.dispatch_failures, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(broker.committed(), vec![0, 1]);
}

#[tokio::test]
async fn test_loop_counts_unknown_action_as_dispatch_failure() {
    let broker = InMemoryBroker::new();
    let stats = drain(
        &broker,
        MockSkillStorage::new(),
        vec![wire("bogus", Some("k"), Value::Null)],
    )
    .await;

    assert_eq!(stats.dispatch_failures, 1);
}

#[tokio::test]
async fn test_loop_releases_partition_before_connection() {
    let broker = InMemoryBroker::new();
    drain(&broker, MockSkillStorage::new(), Vec::new()).await;

    assert_eq!(broker.released(), vec!["partition", "connection"]);
}

#[tokio::test]
async fn test_cancellation_stops_idle_loop() {
    let broker = InMemoryBroker::new();
    let partition = broker.partition(TOPIC);
    let shutdown = CancellationToken::new();

    let consumer = SkillConsumer::new(
        test_config(),
        partition,
        SkillDispatcher::new(service(MockSkillStorage::new())),
    );
    let handle = tokio::spawn(consumer.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("consumer did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(stats, ConsumerStats::default());
    assert_eq!(broker.released(), vec!["partition", "connection"]);
}

#[tokio::test]
async fn test_cancelled_loop_does_not_pull_new_messages() {
    let broker = InMemoryBroker::new();
    let partition = broker.partition(TOPIC);
    broker.inject(TOPIC, wire("delete", Some("go"), Value::Null));

    let shutdown = CancellationToken::new();
    shutdown.cancel();

    // Storage has no expectations; a dispatched delete would panic.
    let stats = SkillConsumer::new(
        test_config(),
        partition,
        SkillDispatcher::new(service(MockSkillStorage::new())),
    )
    .run(shutdown)
    .await
    .unwrap();

    assert_eq!(stats.received(), 0);
    assert!(broker.committed().is_empty());
}

#[tokio::test]
async fn test_cancellation_during_dispatch_finishes_current_message() {
    let broker = InMemoryBroker::new();
    let partition = broker.partition(TOPIC);
    broker.inject(TOPIC, wire("update_name", Some("go"), json!({"name": "Golang"})));
    broker.inject(TOPIC, wire("update_name", Some("rust"), json!({"name": "Rustlang"})));

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();

    // The first call cancels; a second call would exceed `times(1)`.
    let mut storage = MockSkillStorage::new();
    storage
        .expect_update_name()
        .withf(|key, _| key == "go")
        .times(1)
        .returning(move |_, _| {
            token.cancel();
            Ok(())
        });

    let stats = tokio::time::timeout(
        Duration::from_secs(1),
        SkillConsumer::new(test_config(), partition, SkillDispatcher::new(service(storage))).run(shutdown),
    )
    .await
    .expect("consumer did not stop")
    .unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.received(), 1);
    assert_eq!(broker.committed(), vec![0]);
    assert_eq!(broker.released(), vec!["partition", "connection"]);
}

#[tokio::test]
async fn test_null_action_is_a_validation_failure() {
    let broker = InMemoryBroker::new();
    let stats = drain(
        &broker,
        MockSkillStorage::new(),
        vec![br#"{"action":null,"key":"k","payload":null}"#.to_vec()],
    )
    .await;

    assert_eq!(stats.validation_failures, 1);
    assert_eq!(stats.decode_failures, 0);
}
