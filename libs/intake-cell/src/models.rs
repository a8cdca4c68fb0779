// libs/intake-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use appointment_cell::models::{Appointment, AppointmentError};
use conversation_cell::models::{ConversationError, Thread};
use patient_cell::models::{PatientProfile, ProfileUpdate};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// One inbound conversational turn as posted by the chat UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub user: Option<PatientPayload>,
    #[serde(default)]
    pub thread: Option<ThreadRef>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub selected_slot: Option<String>,
}

/// Caller identity plus any profile fields the UI already knows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: ProfileUpdate,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadRef {
    #[serde(default)]
    pub id: Option<String>,
}

impl QueryRequest {
    pub fn new(patient_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user: Some(PatientPayload {
                id: Some(patient_id.into()),
                fields: ProfileUpdate::default(),
            }),
            thread: None,
            message: Some(message.into()),
            selected_slot: None,
        }
    }

    pub fn in_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread = Some(ThreadRef {
            id: Some(thread_id.into()),
        });
        self
    }

    pub fn with_fields(mut self, fields: ProfileUpdate) -> Self {
        if let Some(user) = self.user.as_mut() {
            user.fields = fields;
        }
        self
    }

    pub fn with_selected_slot(mut self, slot: impl Into<String>) -> Self {
        self.selected_slot = Some(slot.into());
        self
    }

    /// Check identity and message are present, yielding the normalized turn.
    pub fn validate(self) -> Result<ValidatedTurn, IntakeError> {
        let missing = || IntakeError::Validation("user and message are required".to_string());

        let user = self.user.ok_or_else(missing)?;
        let patient_id = user
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(missing)?;
        let message = self
            .message
            .filter(|message| !message.trim().is_empty())
            .ok_or_else(missing)?;

        Ok(ValidatedTurn {
            patient_id,
            thread_id: self
                .thread
                .and_then(|thread| thread.id)
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            message,
            selected_slot: self
                .selected_slot
                .map(|slot| slot.trim().to_string())
                .filter(|slot| !slot.is_empty()),
            profile_fields: user.fields,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTurn {
    pub patient_id: String,
    pub thread_id: Option<String>,
    pub message: String,
    pub selected_slot: Option<String>,
    pub profile_fields: ProfileUpdate,
}

// ==============================================================================
// RESPONSE MODELS
// ==============================================================================

/// Snapshot returned after a turn completes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub message: String,
    pub user: PatientProfile,
    pub thread: Thread,
    pub has_all_required_fields: bool,
    pub schedule_appointment: bool,
    pub available_slots: Vec<DateTime<Utc>>,
    pub appointment: Option<Appointment>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntakeError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Conversation(#[from] ConversationError),

    #[error(transparent)]
    Booking(#[from] AppointmentError),
}
