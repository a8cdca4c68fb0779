// libs/intake-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::post, Router};

use crate::handlers;
use crate::services::orchestrator::ConversationOrchestrator;

pub fn query_routes(orchestrator: Arc<ConversationOrchestrator>) -> Router {
    Router::new()
        .route("/", post(handlers::post_query))
        .with_state(orchestrator)
}
