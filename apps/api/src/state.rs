use std::sync::Arc;

use appointment_cell::services::{AppointmentDirectory, BookingEngine, InMemoryAppointmentStore};
use conversation_cell::services::{ConversationStore, InMemoryConversationStore};
use intake_cell::services::{
    ConversationOrchestrator, IntakeAgent, OpenAiIntakeAgent, OrchestratorSettings,
};
use patient_cell::services::{InMemoryProfileStore, ProfileStore};
use shared_config::AppConfig;

/// Services shared by every route, all backed by process-local stores.
#[derive(Clone)]
pub struct AppServices {
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub appointments: Arc<AppointmentDirectory>,
}

impl AppServices {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_agent(config, Arc::new(OpenAiIntakeAgent::new(config)))
    }

    pub fn with_agent(config: &AppConfig, agent: Arc<dyn IntakeAgent>) -> Self {
        let profiles: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
        let conversations: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());
        let booking = Arc::new(BookingEngine::new(
            Arc::new(InMemoryAppointmentStore::new()),
            conversations.clone(),
            config.scheduling.clone(),
        ));

        let orchestrator = Arc::new(ConversationOrchestrator::new(
            profiles.clone(),
            conversations.clone(),
            booking.clone(),
            agent,
            OrchestratorSettings::from_config(config),
        ));
        let appointments = Arc::new(AppointmentDirectory::new(booking, profiles, conversations));

        Self {
            orchestrator,
            appointments,
        }
    }
}
