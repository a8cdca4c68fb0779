use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use intake_cell::router::query_routes;

use crate::state::AppServices;

pub fn create_router(services: AppServices) -> Router {
    Router::new()
        .route("/", get(|| async { "Intake scheduler API is running!" }))
        .nest("/api/query", query_routes(services.orchestrator))
        .nest("/api/appointments", appointment_routes(services.appointments))
}
