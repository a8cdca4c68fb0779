use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use patient_cell::models::{PatientProfile, ProfileField, ProfileUpdate};
use shared_config::{AppConfig, SchedulingConfig};

pub struct TestConfig {
    pub agent_api_key: String,
    pub agent_base_url: String,
    pub agent_model: String,
    pub agent_timeout_seconds: u64,
    pub agent_history_window: usize,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            agent_api_key: "test-agent-key".to_string(),
            agent_base_url: "http://localhost:4010/v1".to_string(),
            agent_model: "gpt-4o-mini".to_string(),
            agent_timeout_seconds: 5,
            agent_history_window: 8,
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    /// Point the agent at a mock server, e.g. `MockServer::uri()`.
    pub fn with_agent_url(base_url: &str) -> Self {
        Self {
            agent_base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: 0,
            openai_api_key: self.agent_api_key.clone(),
            openai_base_url: self.agent_base_url.clone(),
            openai_model: self.agent_model.clone(),
            agent_timeout_seconds: self.agent_timeout_seconds,
            agent_history_window: self.agent_history_window,
            scheduling: self.scheduling.clone(),
        }
    }
}

// ==============================================================================
// FIXED CLOCK
// ==============================================================================

/// 2025-06-16 is a Monday.
pub const TEST_MONDAY: (i32, u32, u32) = (2025, 6, 16);

pub fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    day_at(0, hour, minute)
}

/// `days_after` days past [`TEST_MONDAY`], at the given UTC wall time.
pub fn day_at(days_after: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    let (year, month, day) = TEST_MONDAY;
    match Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).single() {
        Some(instant) => instant + chrono::Duration::days(days_after),
        None => panic!("invalid test time {}:{}", hour, minute),
    }
}

// ==============================================================================
// PATIENT FIXTURES
// ==============================================================================

pub struct TestPatient;

impl TestPatient {
    pub fn complete_update() -> ProfileUpdate {
        ProfileUpdate::default()
            .with(ProfileField::FirstName, "Jane")
            .with(ProfileField::LastName, "Doe")
            .with(ProfileField::Email, "jane@example.com")
            .with(ProfileField::Phone, "555-0100")
            .with(ProfileField::Summary, "Recurring migraines")
    }

    pub fn complete_profile(id: &str) -> PatientProfile {
        let mut profile = PatientProfile::new(id);
        profile.first_name = Some("Jane".to_string());
        profile.last_name = Some("Doe".to_string());
        profile.email = Some("jane@example.com".to_string());
        profile.phone = Some("555-0100".to_string());
        profile.summary = Some("Recurring migraines".to_string());
        profile
    }
}

// ==============================================================================
// MOCK AGENT RESPONSES
// ==============================================================================

pub struct MockAgentResponses;

impl MockAgentResponses {
    /// Chat-completions envelope carrying `content` as the first choice.
    pub fn chat_completion(content: &str) -> Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_718_532_000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content
                },
                "finish_reason": "stop"
            }]
        })
    }

    /// Agent payload in the JSON-object shape the intake prompt asks for.
    pub fn intake_reply(
        message: &str,
        user_update: Value,
        has_all_required_fields: bool,
        schedule_appointment: bool,
    ) -> Value {
        let content = json!({
            "assistantMessage": message,
            "userUpdate": user_update,
            "hasAllRequiredFields": has_all_required_fields,
            "scheduleAppointment": schedule_appointment
        });
        Self::chat_completion(&content.to_string())
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "type": "invalid_request_error",
                "code": code
            }
        })
    }
}
