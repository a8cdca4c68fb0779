// libs/intake-cell/src/services/orchestrator.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use appointment_cell::services::BookingEngine;
use conversation_cell::models::Role;
use conversation_cell::services::{ConversationStore, TurnLocks};
use patient_cell::models::{PatientProfile, ProfileUpdate};
use patient_cell::services::ProfileStore;
use shared_config::AppConfig;

use crate::models::{IntakeError, QueryRequest, TurnOutcome};
use crate::services::agent::{AgentError, AgentReply, AgentRequest, IntakeAgent};
use crate::services::state_machine::{needs_slot_offer, next_status, TurnEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub agent_timeout: Duration,
    pub history_window: usize,
    pub offered_slot_count: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(30),
            history_window: 8,
            offered_slot_count: 3,
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            agent_timeout: Duration::from_secs(config.agent_timeout_seconds),
            history_window: config.agent_history_window,
            offered_slot_count: config.scheduling.offered_slot_count,
        }
    }
}

/// Drives one conversational turn end to end: profile merge, optional
/// booking, agent call and status transition.
pub struct ConversationOrchestrator {
    profiles: Arc<dyn ProfileStore>,
    conversations: Arc<dyn ConversationStore>,
    booking: Arc<BookingEngine>,
    agent: Arc<dyn IntakeAgent>,
    turn_locks: TurnLocks,
    settings: OrchestratorSettings,
}

impl ConversationOrchestrator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        conversations: Arc<dyn ConversationStore>,
        booking: Arc<BookingEngine>,
        agent: Arc<dyn IntakeAgent>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            profiles,
            conversations,
            booking,
            agent,
            turn_locks: TurnLocks::new(),
            settings,
        }
    }

    pub async fn handle_turn(&self, request: QueryRequest) -> Result<TurnOutcome, IntakeError> {
        self.handle_turn_at(request, Utc::now()).await
    }

    /// Like [`handle_turn`](Self::handle_turn), searching slots from `now`.
    #[instrument(skip(self, request, now), fields(patient_id, thread_id))]
    pub async fn handle_turn_at(
        &self,
        request: QueryRequest,
        now: DateTime<Utc>,
    ) -> Result<TurnOutcome, IntakeError> {
        let turn = request.validate()?;
        let span = tracing::Span::current();
        span.record("patient_id", turn.patient_id.as_str());

        let (thread, created) = self
            .conversations
            .get_or_create(&turn.patient_id, turn.thread_id.as_deref())
            .await?;
        span.record("thread_id", thread.id.as_str());
        if created {
            info!("Created thread {} for patient {}", thread.id, turn.patient_id);
        }

        let _turn_guard = self.turn_locks.acquire(&thread.id).await;

        let profile = self.upsert_profile(&turn.patient_id, &turn.profile_fields).await?;
        let snapshot = self.conversations.get_thread(&thread.id).await?;
        let current_status = snapshot.status;
        let recent_messages = snapshot
            .recent_messages(self.settings.history_window)
            .to_vec();

        let appointment = match turn.selected_slot.as_deref() {
            Some(slot) => {
                let appointment = self.booking.book(&profile, &thread.id, slot, None).await?;
                Some(appointment)
            }
            None => None,
        };

        self.conversations
            .append_message(&thread.id, Role::User, &turn.message)
            .await?;

        let agent_request = AgentRequest {
            profile: profile.clone(),
            recent_messages,
            newest_message: turn.message.clone(),
        };

        let (reply, degraded) = match self.run_agent(agent_request).await {
            Ok(reply) => (reply, false),
            Err(e) => {
                warn!("Intake agent failed for thread {}: {}", thread.id, e);
                (AgentReply::fallback(), true)
            }
        };

        let profile = if reply.user_update.is_empty() {
            profile
        } else {
            self.upsert_profile(&turn.patient_id, &reply.user_update).await?
        };

        self.conversations
            .append_message(&thread.id, Role::Assistant, &reply.assistant_message)
            .await?;

        let has_all_required_fields =
            !degraded && (reply.has_all_required_fields || profile.has_required_fields());
        let schedule_appointment = !degraded && reply.schedule_appointment;
        let ready = schedule_appointment || profile.has_required_fields();

        let mut available_slots = Vec::new();
        let event = if appointment.is_some() {
            TurnEvent::Booked
        } else if !ready {
            TurnEvent::NotReady
        } else {
            if needs_slot_offer(current_status) {
                available_slots = self
                    .booking
                    .next_available(self.settings.offered_slot_count, now)
                    .await;
            }
            TurnEvent::Ready {
                open_slots: available_slots.len(),
            }
        };

        let status = next_status(current_status, event);
        self.conversations.set_status(&thread.id, status).await?;

        debug!(
            "Turn on thread {}: {:?} -> {} ({} slots offered)",
            thread.id,
            event,
            status,
            available_slots.len()
        );

        Ok(TurnOutcome {
            message: reply.assistant_message,
            user: profile,
            thread: self.conversations.get_thread(&thread.id).await?,
            has_all_required_fields,
            schedule_appointment,
            available_slots,
            appointment,
        })
    }

    /// Agent call on its own task, bounded by the configured timeout.
    async fn run_agent(&self, request: AgentRequest) -> Result<AgentReply, AgentError> {
        let agent = Arc::clone(&self.agent);
        let mut task = tokio::spawn(async move { agent.respond(request).await });

        match timeout(self.settings.agent_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(AgentError::Aborted(join_error.to_string())),
            Err(_) => {
                task.abort();
                Err(AgentError::Timeout(self.settings.agent_timeout.as_secs()))
            }
        }
    }

    async fn upsert_profile(
        &self,
        patient_id: &str,
        update: &ProfileUpdate,
    ) -> Result<PatientProfile, IntakeError> {
        self.profiles
            .upsert(patient_id, update)
            .await
            .map_err(|e| IntakeError::Validation(e.to_string()))
    }
}
