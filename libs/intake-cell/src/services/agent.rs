// libs/intake-cell/src/services/agent.rs
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use conversation_cell::models::Message;
use patient_cell::models::{PatientProfile, ProfileField, ProfileUpdate};
use shared_config::AppConfig;

/// Reply recorded whenever the agent cannot produce a usable answer.
pub const FALLBACK_ASSISTANT_MESSAGE: &str =
    "I'm sorry, but I couldn't process that right now. Could you please rephrase or provide the details again?";

const AGENT_TEMPERATURE: f64 = 0.3;

// ==============================================================================
// AGENT CONTRACT
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest {
    pub profile: PatientProfile,
    /// Prior messages, oldest first, excluding `newest_message`.
    pub recent_messages: Vec<Message>,
    pub newest_message: String,
}

/// Structured result of one agent call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    #[serde(default = "fallback_message", deserialize_with = "message_or_fallback")]
    pub assistant_message: String,
    #[serde(default, deserialize_with = "update_or_empty")]
    pub user_update: ProfileUpdate,
    #[serde(default, deserialize_with = "truthy")]
    pub has_all_required_fields: bool,
    #[serde(default, deserialize_with = "truthy")]
    pub schedule_appointment: bool,
}

impl AgentReply {
    pub fn new(assistant_message: impl Into<String>) -> Self {
        Self {
            assistant_message: assistant_message.into(),
            user_update: ProfileUpdate::default(),
            has_all_required_fields: false,
            schedule_appointment: false,
        }
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_ASSISTANT_MESSAGE)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("Agent request failed: {0}")]
    Transport(String),

    #[error("Agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Agent response has no message content")]
    MissingContent,

    #[error("Agent response is not a usable JSON object: {0}")]
    InvalidPayload(String),

    #[error("Agent did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Agent task aborted: {0}")]
    Aborted(String),
}

/// The natural-language collaborator that reads the conversation and reports
/// profile updates plus scheduling intent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntakeAgent: Send + Sync {
    async fn respond(&self, request: AgentRequest) -> Result<AgentReply, AgentError>;
}

// ==============================================================================
// REPLY PARSING
// ==============================================================================

/// Parse the content string of a chat completion into an [`AgentReply`].
pub fn parse_reply(content: Option<&str>) -> Result<AgentReply, AgentError> {
    let content = content
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .ok_or(AgentError::MissingContent)?;

    let value: Value = serde_json::from_str(content)
        .map_err(|e| AgentError::InvalidPayload(e.to_string()))?;

    if !value.is_object() {
        return Err(AgentError::InvalidPayload(format!(
            "expected an object, got {}",
            value
        )));
    }

    serde_json::from_value(value).map_err(|e| AgentError::InvalidPayload(e.to_string()))
}

fn fallback_message() -> String {
    FALLBACK_ASSISTANT_MESSAGE.to_string()
}

fn message_or_fallback<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        None | Some(Value::Null) => fallback_message(),
        Some(other) => other.to_string(),
    })
}

fn update_or_empty<'de, D>(deserializer: D) -> Result<ProfileUpdate, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ProfileUpdate>::deserialize(deserializer)?.unwrap_or_default())
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    })
}

// ==============================================================================
// OPENAI-COMPATIBLE AGENT
// ==============================================================================

pub struct OpenAiIntakeAgent {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiIntakeAgent {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        }
    }

    /// Chat messages for one call: system prompt, history, then the newest user text.
    pub fn build_messages(&self, request: &AgentRequest) -> Vec<Value> {
        let mut messages = Vec::with_capacity(request.recent_messages.len() + 2);

        messages.push(json!({
            "role": "system",
            "content": format!(
                "{}\n\nKnown user fields:\n{}",
                system_instructions(),
                format_known_fields(&request.profile)
            )
        }));

        messages.extend(request.recent_messages.iter().map(|message| {
            json!({
                "role": message.role.as_str(),
                "content": message.content,
            })
        }));

        messages.push(json!({
            "role": "user",
            "content": request.newest_message,
        }));

        messages
    }
}

#[async_trait]
impl IntakeAgent for OpenAiIntakeAgent {
    async fn respond(&self, request: AgentRequest) -> Result<AgentReply, AgentError> {
        let messages = self.build_messages(&request);

        debug!(
            "Calling intake agent for patient {} with model {} and {} messages",
            request.profile.id,
            self.model,
            messages.len()
        );

        let body = json!({
            "model": self.model,
            "temperature": AGENT_TEMPERATURE,
            "response_format": { "type": "json_object" },
            "messages": messages,
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Intake agent returned {}: {}", status, body);
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion: Value = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidPayload(e.to_string()))?;

        if let Some(usage) = completion.get("usage") {
            debug!("Intake agent usage: {}", usage);
        }

        let reply = parse_reply(completion["choices"][0]["message"]["content"].as_str());
        if let Err(e) = &reply {
            warn!("Unusable intake agent reply for patient {}: {}", request.profile.id, e);
        }

        reply
    }
}

fn system_instructions() -> String {
    let required = ProfileField::REQUIRED
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a compassionate medical intake assistant. Use the conversation and the known \
         user fields to politely gather any missing details. When the patient gives their name, \
         split it into firstName and lastName. Always capture a brief summary of the reason for \
         the visit. Respond with a single JSON object with exactly these keys:\n\
         - \"assistantMessage\": the text to show the patient,\n\
         - \"userUpdate\": an object with any new or corrected user fields,\n\
         - \"hasAllRequiredFields\": true only when {} are all known,\n\
         - \"scheduleAppointment\": true when every required field is collected and the patient \
         is ready to schedule.\n\
         Do not include any other keys.",
        required
    )
}

fn format_known_fields(profile: &PatientProfile) -> String {
    let fields = profile.known_fields();
    if fields.is_empty() {
        return "No fields captured yet.".to_string();
    }

    fields
        .iter()
        .map(|(key, value)| format!("- {}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}
