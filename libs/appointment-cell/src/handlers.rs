// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::AppointmentError;
use crate::services::directory::AppointmentDirectory;

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        match error {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::SlotUnavailable | AppointmentError::InvalidSlot(_) => {
                AppError::BadRequest(error.to_string())
            }
        }
    }
}

// ==============================================================================
// APPOINTMENT LISTING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_appointments(
    State(directory): State<Arc<AppointmentDirectory>>,
) -> Result<Json<Value>, AppError> {
    let appointments = directory.list_views().await;

    Ok(Json(json!({
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(directory): State<Arc<AppointmentDirectory>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    // Ids that are not UUIDs can never match a booking.
    let appointment_id = Uuid::parse_str(appointment_id.trim())
        .map_err(|_| AppError::from(AppointmentError::NotFound))?;

    let detail = directory.detail(appointment_id).await?;

    Ok(Json(json!({
        "appointment": detail.appointment,
        "user": detail.user,
        "messages": detail.messages,
    })))
}
