use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// MESSAGE MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// Display label used by the appointment detail view.
    pub fn sender_label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

// ==============================================================================
// THREAD MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    CollectingDetails,
    ReadyToSchedule,
    AwaitingConfirmation,
    Scheduled,
}

impl ThreadStatus {
    /// True once the thread has left the creation state.
    pub fn has_progressed(&self) -> bool {
        !matches!(self, ThreadStatus::CollectingDetails)
    }
}

impl Default for ThreadStatus {
    fn default() -> Self {
        ThreadStatus::CollectingDetails
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadStatus::CollectingDetails => write!(f, "collecting_details"),
            ThreadStatus::ReadyToSchedule => write!(f, "ready_to_schedule"),
            ThreadStatus::AwaitingConfirmation => write!(f, "awaiting_confirmation"),
            ThreadStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Thread record without its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub id: String,
    pub patient_id: String,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full thread snapshot as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub patient_id: String,
    pub status: ThreadStatus,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// The last `window` messages, oldest first.
    pub fn recent_messages(&self, window: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(window);
        &self.messages[start..]
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversationError {
    #[error("Thread not found: {0}")]
    NotFound(String),

    #[error("Thread {thread_id} does not belong to patient {patient_id}")]
    OwnershipMismatch {
        thread_id: String,
        patient_id: String,
    },
}
