// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use conversation_cell::services::ConversationStore;
use patient_cell::models::{PatientProfile, ProfileField};
use shared_config::SchedulingConfig;

use crate::models::{Appointment, AppointmentError};
use crate::services::slots::SlotFinder;

/// Storage capability for bookings.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn list(&self) -> Vec<Appointment>;

    async fn get(&self, appointment_id: Uuid) -> Option<Appointment>;

    async fn find_by_thread(&self, thread_id: &str) -> Option<Appointment>;

    /// Insert, or replace the record with the same id.
    async fn upsert(&self, appointment: Appointment) -> Appointment;
}

#[derive(Default)]
pub struct InMemoryAppointmentStore {
    appointments: RwLock<Vec<Appointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn list(&self) -> Vec<Appointment> {
        self.appointments.read().await.clone()
    }

    async fn get(&self, appointment_id: Uuid) -> Option<Appointment> {
        let appointments = self.appointments.read().await;
        appointments.iter().find(|a| a.id == appointment_id).cloned()
    }

    async fn find_by_thread(&self, thread_id: &str) -> Option<Appointment> {
        let appointments = self.appointments.read().await;
        appointments.iter().find(|a| a.thread_id == thread_id).cloned()
    }

    async fn upsert(&self, appointment: Appointment) -> Appointment {
        let mut appointments = self.appointments.write().await;

        match appointments.iter_mut().find(|a| a.id == appointment.id) {
            Some(existing) => *existing = appointment.clone(),
            None => appointments.push(appointment.clone()),
        }

        appointment
    }
}

/// Books conflict-free appointments, at most one per conversation.
pub struct BookingEngine {
    store: Arc<dyn AppointmentStore>,
    conversations: Arc<dyn ConversationStore>,
    slot_finder: SlotFinder,
    default_duration_minutes: i64,
    // Serializes check-and-write across all conversations.
    write_gate: Mutex<()>,
}

impl BookingEngine {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        conversations: Arc<dyn ConversationStore>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            store,
            conversations,
            default_duration_minutes: config.appointment_duration_minutes,
            slot_finder: SlotFinder::new(config),
            write_gate: Mutex::new(()),
        }
    }

    /// Book `slot_start` (RFC 3339) for the conversation, replacing its earlier booking if any.
    pub async fn book(
        &self,
        patient: &PatientProfile,
        thread_id: &str,
        slot_start: &str,
        duration_minutes: Option<i64>,
    ) -> Result<Appointment, AppointmentError> {
        let start = DateTime::parse_from_rfc3339(slot_start.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|e| {
                warn!("Rejected slot {:?} for thread {}: {}", slot_start, thread_id, e);
                AppointmentError::InvalidSlot(format!("{}: {}", slot_start, e))
            })?;

        self.book_at(patient, thread_id, start, duration_minutes).await
    }

    pub async fn book_at(
        &self,
        patient: &PatientProfile,
        thread_id: &str,
        start: DateTime<Utc>,
        duration_minutes: Option<i64>,
    ) -> Result<Appointment, AppointmentError> {
        let duration_minutes = duration_minutes.unwrap_or(self.default_duration_minutes);
        if duration_minutes <= 0 {
            return Err(AppointmentError::InvalidSlot(format!(
                "duration must be positive, got {} minutes",
                duration_minutes
            )));
        }
        let end = Duration::try_minutes(duration_minutes)
            .and_then(|length| start.checked_add_signed(length))
            .ok_or_else(|| {
                AppointmentError::InvalidSlot(format!(
                    "duration of {} minutes is out of range",
                    duration_minutes
                ))
            })?;

        let _gate = self.write_gate.lock().await;

        let existing = self.store.list().await;
        let conflict = existing
            .iter()
            .filter(|appointment| appointment.thread_id != thread_id)
            .find(|appointment| appointment.overlaps(start, end));

        if let Some(conflict) = conflict {
            warn!(
                "Slot {} - {} for thread {} conflicts with appointment {}",
                start, end, thread_id, conflict.id
            );
            return Err(AppointmentError::SlotUnavailable);
        }

        let now = Utc::now();
        let appointment = match existing.into_iter().find(|a| a.thread_id == thread_id) {
            Some(previous) => {
                debug!("Rebooking appointment {} for thread {}", previous.id, thread_id);
                Appointment {
                    patient_id: patient.id.clone(),
                    start,
                    end,
                    updated_at: now,
                    ..previous
                }
            }
            None => Appointment {
                id: Uuid::new_v4(),
                patient_id: patient.id.clone(),
                thread_id: thread_id.to_string(),
                start,
                end,
                created_at: now,
                updated_at: now,
            },
        };

        let record = self.store.upsert(appointment).await;
        self.conversations.touch(thread_id).await;

        info!(
            appointment_id = %record.id,
            patient_id = %record.patient_id,
            full_name = %patient.full_name().unwrap_or_default(),
            email = %patient.value(ProfileField::Email).unwrap_or_default(),
            phone = %patient.value(ProfileField::Phone).unwrap_or_default(),
            start = %record.start,
            end = %record.end,
            "Created appointment"
        );

        Ok(record)
    }

    /// Next open slots given every booking currently held.
    pub async fn next_available(&self, count: usize, reference: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let existing = self.store.list().await;
        self.slot_finder.find_slots(&existing, count, reference)
    }

    pub async fn list(&self) -> Vec<Appointment> {
        self.store.list().await
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .get(appointment_id)
            .await
            .ok_or(AppointmentError::NotFound)
    }

    pub async fn find_for_thread(&self, thread_id: &str) -> Option<Appointment> {
        self.store.find_by_thread(thread_id).await
    }
}
