use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{ConversationError, Message, Role, Thread, ThreadStatus, ThreadSummary};

/// Storage capability for conversation threads.
///
/// Every read hands back an owned snapshot; mutating it never touches the store.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the thread for `thread_id` (or a new one) and whether it was created.
    async fn get_or_create(
        &self,
        patient_id: &str,
        thread_id: Option<&str>,
    ) -> Result<(ThreadSummary, bool), ConversationError>;

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, ConversationError>;

    async fn set_status(
        &self,
        thread_id: &str,
        status: ThreadStatus,
    ) -> Result<ThreadStatus, ConversationError>;

    /// Bump the thread's last-updated timestamp. Unknown ids are ignored.
    async fn touch(&self, thread_id: &str);

    async fn get_thread(&self, thread_id: &str) -> Result<Thread, ConversationError>;

    async fn summary(&self, thread_id: &str) -> Option<ThreadSummary>;

    async fn messages(&self, thread_id: &str) -> Vec<Message>;
}

#[derive(Debug, Clone)]
struct ThreadRecord {
    id: String,
    patient_id: String,
    status: ThreadStatus,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ThreadRecord {
    fn summary(&self) -> ThreadSummary {
        ThreadSummary {
            id: self.id.clone(),
            patient_id: self.patient_id.clone(),
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn snapshot(&self) -> Thread {
        Thread {
            id: self.id.clone(),
            patient_id: self.patient_id.clone(),
            status: self.status,
            messages: self.messages.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    threads: RwLock<HashMap<String, ThreadRecord>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create(
        &self,
        patient_id: &str,
        thread_id: Option<&str>,
    ) -> Result<(ThreadSummary, bool), ConversationError> {
        let thread_id = thread_id.map(str::trim).filter(|id| !id.is_empty());
        let mut threads = self.threads.write().await;

        if let Some(existing) = thread_id.and_then(|id| threads.get(id)) {
            if existing.patient_id != patient_id {
                warn!(
                    "Thread {} requested by patient {} but owned by {}",
                    existing.id, patient_id, existing.patient_id
                );
                return Err(ConversationError::OwnershipMismatch {
                    thread_id: existing.id.clone(),
                    patient_id: patient_id.to_string(),
                });
            }
            return Ok((existing.summary(), false));
        }

        let now = Utc::now();
        let id = thread_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = ThreadRecord {
            id: id.clone(),
            patient_id: patient_id.to_string(),
            status: ThreadStatus::CollectingDetails,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let summary = record.summary();
        threads.insert(id.clone(), record);

        debug!("Created thread {} for patient {}", id, patient_id);
        Ok((summary, true))
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, ConversationError> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| ConversationError::NotFound(thread_id.to_string()))?;

        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            role,
            content: content.to_string(),
            timestamp: now,
        };
        record.messages.push(message.clone());
        record.updated_at = now;

        Ok(message)
    }

    async fn set_status(
        &self,
        thread_id: &str,
        status: ThreadStatus,
    ) -> Result<ThreadStatus, ConversationError> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| ConversationError::NotFound(thread_id.to_string()))?;

        if record.status != status {
            debug!("Thread {} status {} -> {}", thread_id, record.status, status);
        }
        record.status = status;
        record.updated_at = Utc::now();

        Ok(status)
    }

    async fn touch(&self, thread_id: &str) {
        let mut threads = self.threads.write().await;
        if let Some(record) = threads.get_mut(thread_id) {
            record.updated_at = Utc::now();
        }
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread, ConversationError> {
        let threads = self.threads.read().await;
        threads
            .get(thread_id)
            .map(ThreadRecord::snapshot)
            .ok_or_else(|| ConversationError::NotFound(thread_id.to_string()))
    }

    async fn summary(&self, thread_id: &str) -> Option<ThreadSummary> {
        let threads = self.threads.read().await;
        threads.get(thread_id).map(ThreadRecord::summary)
    }

    async fn messages(&self, thread_id: &str) -> Vec<Message> {
        let threads = self.threads.read().await;
        threads
            .get(thread_id)
            .map(|record| record.messages.clone())
            .unwrap_or_default()
    }
}
