use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Duration, Utc};

use appointment_cell::models::AppointmentError;
use appointment_cell::services::{AppointmentStore, BookingEngine, InMemoryAppointmentStore};
use conversation_cell::services::{ConversationStore, InMemoryConversationStore};
use shared_config::SchedulingConfig;
use shared_utils::test_utils::{monday_at, TestPatient};

struct Fixture {
    engine: Arc<BookingEngine>,
    store: Arc<InMemoryAppointmentStore>,
    conversations: Arc<InMemoryConversationStore>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let conversations = Arc::new(InMemoryConversationStore::new());
    let engine = Arc::new(BookingEngine::new(
        store.clone(),
        conversations.clone(),
        SchedulingConfig::default(),
    ));

    Fixture {
        engine,
        store,
        conversations,
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn test_book_creates_default_length_appointment() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let appointment = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00.000Z", None)
        .await
        .unwrap();

    assert_eq!(appointment.start, monday_at(10, 0));
    assert_eq!(appointment.end, monday_at(10, 30));
    assert_eq!(appointment.patient_id, "patient-1");
    assert_eq!(appointment.thread_id, "thread-1");
    assert_eq!(fx.store.list().await.len(), 1);
}

#[tokio::test]
async fn test_book_accepts_offset_timestamps() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let appointment = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T12:00:00+02:00", Some(45))
        .await
        .unwrap();

    assert_eq!(appointment.start, monday_at(10, 0));
    assert_eq!(appointment.duration_minutes(), 45);
}

#[tokio::test]
async fn test_rebooking_replaces_previous_appointment() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let first = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();
    let second = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T14:00:00Z", None)
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.start, monday_at(14, 0));

    let all = fx.store.list().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].start, monday_at(14, 0));
}

#[tokio::test]
async fn test_conversation_may_overlap_its_own_booking() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    fx.engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", Some(60))
        .await
        .unwrap();
    let moved = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:30:00Z", None)
        .await;

    assert_matches!(moved, Ok(appointment) if appointment.start == monday_at(10, 30));
}

#[tokio::test]
async fn test_overlap_with_other_conversation_is_rejected() {
    let fx = fixture();
    let first_patient = TestPatient::complete_profile("patient-1");
    let second_patient = TestPatient::complete_profile("patient-2");

    fx.engine
        .book(&first_patient, "thread-1", "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();
    let result = fx
        .engine
        .book(&second_patient, "thread-2", "2025-06-16T10:15:00Z", None)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotUnavailable));
    assert_eq!(fx.store.list().await.len(), 1);
    assert!(fx.engine.find_for_thread("thread-2").await.is_none());
}

#[tokio::test]
async fn test_back_to_back_bookings_are_allowed() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    fx.engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();
    let next = fx
        .engine
        .book(&patient, "thread-2", "2025-06-16T10:30:00Z", None)
        .await;

    assert!(next.is_ok());
}

#[tokio::test]
async fn test_rejected_rebooking_keeps_previous_appointment() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let original = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();
    fx.engine
        .book(&patient, "thread-2", "2025-06-16T11:00:00Z", None)
        .await
        .unwrap();

    let result = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T11:00:00Z", None)
        .await;

    assert_matches!(result, Err(AppointmentError::SlotUnavailable));
    assert_eq!(fx.engine.find_for_thread("thread-1").await, Some(original));
}

// ==============================================================================
// INVALID INPUT
// ==============================================================================

#[tokio::test]
async fn test_unparseable_slot_is_invalid() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    for raw in ["", "tomorrow at ten", "2025-06-16 10:00", "2025-13-40T10:00:00Z"] {
        let result = fx.engine.book(&patient, "thread-1", raw, None).await;
        assert_matches!(result, Err(AppointmentError::InvalidSlot(_)), "slot {:?}", raw);
    }

    assert!(fx.store.list().await.is_empty());
}

#[tokio::test]
async fn test_non_positive_duration_is_invalid() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let zero = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", Some(0))
        .await;
    let negative = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", Some(-30))
        .await;

    assert_matches!(zero, Err(AppointmentError::InvalidSlot(_)));
    assert_matches!(negative, Err(AppointmentError::InvalidSlot(_)));
}

#[tokio::test]
async fn test_out_of_range_duration_is_invalid() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    let huge = fx
        .engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", Some(i64::MAX / 60))
        .await;
    let past_calendar_end = fx
        .engine
        .book_at(
            &patient,
            "thread-1",
            DateTime::<Utc>::MAX_UTC - Duration::minutes(30),
            Some(60),
        )
        .await;

    assert_matches!(huge, Err(AppointmentError::InvalidSlot(_)));
    assert_matches!(past_calendar_end, Err(AppointmentError::InvalidSlot(_)));
    assert!(fx.engine.list().await.is_empty());
}

// ==============================================================================
// SIDE EFFECTS AND LOOKUPS
// ==============================================================================

#[tokio::test]
async fn test_booking_touches_conversation() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");
    let (thread, _) = fx.conversations.get_or_create("patient-1", None).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    fx.engine
        .book(&patient, &thread.id, "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();

    let after = fx.conversations.summary(&thread.id).await.unwrap();
    assert!(after.updated_at > thread.updated_at);
}

#[tokio::test]
async fn test_booked_interval_is_excluded_from_next_search() {
    let fx = fixture();
    let patient = TestPatient::complete_profile("patient-1");

    fx.engine
        .book(&patient, "thread-1", "2025-06-16T10:00:00Z", None)
        .await
        .unwrap();

    let slots = fx.engine.next_available(2, monday_at(9, 0)).await;

    assert_eq!(slots, vec![monday_at(10, 30), monday_at(11, 0)]);
}

#[tokio::test]
async fn test_get_unknown_appointment_is_not_found() {
    let fx = fixture();

    let result = fx.engine.get(uuid::Uuid::new_v4()).await;

    assert_matches!(result, Err(AppointmentError::NotFound));
}

// ==============================================================================
// CONCURRENCY
// ==============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_of_same_slot_have_one_winner() {
    let fx = fixture();

    let attempts = (0..8).map(|i| {
        let engine = fx.engine.clone();
        tokio::spawn(async move {
            let patient = TestPatient::complete_profile(&format!("patient-{}", i));
            engine
                .book(&patient, &format!("thread-{}", i), "2025-06-16T10:00:00Z", None)
                .await
        })
    });

    let results = futures::future::join_all(attempts).await;
    let outcomes: Vec<_> = results.into_iter().map(|joined| joined.unwrap()).collect();

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .filter(|outcome| outcome.is_err())
        .all(|outcome| matches!(outcome, Err(AppointmentError::SlotUnavailable))));

    let stored = fx.store.list().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].end - stored[0].start, Duration::minutes(30));
}
