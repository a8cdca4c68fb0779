// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use conversation_cell::models::{Message, ThreadStatus};
use patient_cell::models::{PatientProfile, ProfileField};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: String,
    pub thread_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        intervals_overlap(self.start, self.end, start, end)
    }
}

/// Half-open interval test: back-to-back intervals do not overlap.
pub fn intervals_overlap<T: PartialOrd>(start1: T, end1: T, start2: T, end2: T) -> bool {
    start1 < end2 && end1 > start2
}

// ==============================================================================
// LISTING AND DETAIL VIEWS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientContact {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&PatientProfile> for PatientContact {
    fn from(profile: &PatientProfile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.full_name(),
            email: profile.value(ProfileField::Email).map(str::to_string),
            phone: profile.value(ProfileField::Phone).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentView {
    pub id: Uuid,
    pub user_id: String,
    pub thread_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub scheduled_for: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status: ThreadStatus,
}

impl AppointmentView {
    /// A booking whose thread is gone is still reported as scheduled.
    pub fn new(
        appointment: &Appointment,
        thread_status: Option<ThreadStatus>,
        thread_updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: appointment.id,
            user_id: appointment.patient_id.clone(),
            thread_id: appointment.thread_id.clone(),
            start: appointment.start,
            end: appointment.end,
            scheduled_for: appointment.start,
            created_at: appointment.created_at,
            updated_at: thread_updated_at.unwrap_or(appointment.updated_at),
            status: thread_status.unwrap_or(ThreadStatus::Scheduled),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentListItem {
    #[serde(flatten)]
    pub appointment: AppointmentView,
    pub user: Option<PatientContact>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub content: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub sender: String,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            role: message.role.as_str().to_string(),
            created_at: message.timestamp,
            sender: message.role.sender_label().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDetail {
    pub appointment: AppointmentView,
    pub user: Option<PatientContact>,
    pub messages: Vec<MessageView>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Slot is no longer available")]
    SlotUnavailable,

    #[error("Invalid slot: {0}")]
    InvalidSlot(String),
}
