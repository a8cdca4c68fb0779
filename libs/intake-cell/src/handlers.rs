// libs/intake-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;

use crate::models::{IntakeError, QueryRequest};
use crate::services::orchestrator::ConversationOrchestrator;

impl From<IntakeError> for AppError {
    fn from(error: IntakeError) -> Self {
        match error {
            IntakeError::Validation(_) => {
                AppError::ValidationError("user and message are required".to_string())
            }
            IntakeError::Conversation(_) => AppError::BadRequest("Invalid thread".to_string()),
            IntakeError::Booking(_) => {
                AppError::BadRequest("Unable to create appointment".to_string())
            }
        }
    }
}

/// One conversational turn. Agent failures still answer 200 with the fallback reply.
#[axum::debug_handler]
pub async fn post_query(
    State(orchestrator): State<Arc<ConversationOrchestrator>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected query body: {}", rejection);
        AppError::ValidationError("user and message are required".to_string())
    })?;

    let outcome = orchestrator.handle_turn(request).await.map_err(|e| {
        warn!("Query turn failed: {}", e);
        AppError::from(e)
    })?;

    Ok(Json(json!(outcome)))
}
