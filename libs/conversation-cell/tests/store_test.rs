use assert_matches::assert_matches;

use conversation_cell::models::{ConversationError, Role, ThreadStatus};
use conversation_cell::services::{ConversationStore, InMemoryConversationStore};

// ==============================================================================
// THREAD CREATION AND OWNERSHIP
// ==============================================================================

#[tokio::test]
async fn test_new_thread_starts_collecting_details() {
    let store = InMemoryConversationStore::new();

    let (thread, created) = store.get_or_create("patient-1", None).await.unwrap();

    assert!(created);
    assert_eq!(thread.patient_id, "patient-1");
    assert_eq!(thread.status, ThreadStatus::CollectingDetails);
    assert!(!thread.id.is_empty());
}

#[tokio::test]
async fn test_existing_thread_is_reattached() {
    let store = InMemoryConversationStore::new();
    let (first, _) = store.get_or_create("patient-1", None).await.unwrap();

    let (again, created) = store
        .get_or_create("patient-1", Some(&first.id))
        .await
        .unwrap();

    assert!(!created);
    assert_eq!(again.id, first.id);
}

#[tokio::test]
async fn test_unknown_supplied_id_creates_thread_with_that_id() {
    let store = InMemoryConversationStore::new();

    let (thread, created) = store
        .get_or_create("patient-1", Some("client-thread"))
        .await
        .unwrap();

    assert!(created);
    assert_eq!(thread.id, "client-thread");
}

#[tokio::test]
async fn test_thread_cannot_be_reused_by_another_patient() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();

    let result = store.get_or_create("patient-2", Some(&thread.id)).await;

    assert_matches!(result, Err(ConversationError::OwnershipMismatch { .. }));
    let unchanged = store.summary(&thread.id).await.unwrap();
    assert_eq!(unchanged.patient_id, "patient-1");
}

// ==============================================================================
// MESSAGES AND STATUS
// ==============================================================================

#[tokio::test]
async fn test_messages_are_appended_in_order() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();

    store.append_message(&thread.id, Role::User, "Hi").await.unwrap();
    store
        .append_message(&thread.id, Role::Assistant, "Hello! What is your name?")
        .await
        .unwrap();

    let messages = store.messages(&thread.id).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hi");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_ne!(messages[0].id, messages[1].id);
}

#[tokio::test]
async fn test_append_touches_thread() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    store.append_message(&thread.id, Role::User, "Hi").await.unwrap();

    let after = store.summary(&thread.id).await.unwrap();
    assert!(after.updated_at > thread.updated_at);
    assert_eq!(after.created_at, thread.created_at);
}

#[tokio::test]
async fn test_status_updates_are_visible_in_snapshot() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();

    store
        .set_status(&thread.id, ThreadStatus::AwaitingConfirmation)
        .await
        .unwrap();

    let snapshot = store.get_thread(&thread.id).await.unwrap();
    assert_eq!(snapshot.status, ThreadStatus::AwaitingConfirmation);
    assert_eq!(
        store.summary(&thread.id).await.map(|summary| summary.status),
        Some(ThreadStatus::AwaitingConfirmation)
    );
}

#[tokio::test]
async fn test_mutators_reject_unknown_thread() {
    let store = InMemoryConversationStore::new();

    assert_matches!(
        store.append_message("missing", Role::User, "Hi").await,
        Err(ConversationError::NotFound(id)) if id == "missing"
    );
    assert_matches!(
        store.set_status("missing", ThreadStatus::Scheduled).await,
        Err(ConversationError::NotFound(_))
    );
    assert_matches!(store.get_thread("missing").await, Err(ConversationError::NotFound(_)));
    assert!(store.messages("missing").await.is_empty());
}

#[tokio::test]
async fn test_snapshots_are_independent_copies() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();
    store.append_message(&thread.id, Role::User, "Hi").await.unwrap();

    let mut snapshot = store.get_thread(&thread.id).await.unwrap();
    snapshot.messages.clear();
    snapshot.status = ThreadStatus::Scheduled;

    let fresh = store.get_thread(&thread.id).await.unwrap();
    assert_eq!(fresh.messages.len(), 1);
    assert_eq!(fresh.status, ThreadStatus::CollectingDetails);
}

#[tokio::test]
async fn test_thread_json_shape() {
    let store = InMemoryConversationStore::new();
    let (thread, _) = store.get_or_create("patient-1", None).await.unwrap();
    store.append_message(&thread.id, Role::User, "Hi").await.unwrap();

    let value = serde_json::to_value(store.get_thread(&thread.id).await.unwrap()).unwrap();

    assert_eq!(value["status"], "collecting_details");
    assert_eq!(value["messages"][0]["role"], "user");
    assert_eq!(value["messages"][0]["content"], "Hi");
}
