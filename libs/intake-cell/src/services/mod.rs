pub mod agent;
pub mod orchestrator;
pub mod state_machine;

pub use agent::{
    parse_reply, AgentError, AgentReply, AgentRequest, IntakeAgent, OpenAiIntakeAgent,
    FALLBACK_ASSISTANT_MESSAGE,
};
pub use orchestrator::{ConversationOrchestrator, OrchestratorSettings};
pub use state_machine::{needs_slot_offer, next_status, TurnEvent};
