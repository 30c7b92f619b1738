//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/welcome", get(handlers::health::welcome))
        // Ticket lookup and creation
        .route("/chats/:chat_id/ticket", post(handlers::tickets::open_ticket))
        .route("/tickets/:ticket_id", get(handlers::tickets::get_ticket))
        .route("/users/:user_id/ticket", get(handlers::tickets::get_user_ticket))
        // Workflow commands
        .route("/commands", post(handlers::commands::execute_command))
}
