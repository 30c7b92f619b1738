//! Escrow Bot HTTP API
//!
//! Inbound command surface for chat transports. A transport forwards each
//! button press or typed message as a command and renders the notifications
//! it receives on its webhook.
//!
//! # API Structure
//!
//! ```text
//! /health                          - Liveness
//! /api/v1/
//! ├── /welcome                     - Greeting text
//! ├── /chats/:chat_id/ticket       - Open or fetch the chat's ticket
//! ├── /tickets/:ticket_id          - Ticket view
//! ├── /users/:user_id/ticket       - A user's active trade
//! └── /commands                    - Workflow commands
//! ```

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webhook;

use axum::Router;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use state::AppState;
pub use webhook::{WebhookConfig, WebhookNotifier, WebhookPayload};

/// API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Enable CORS for browser clients
    pub enable_cors: bool,
    /// Allowed origins for CORS
    pub cors_origins: Vec<String>,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: false,
            cors_origins: vec!["*".to_string()],
            enable_tracing: true,
        }
    }
}

/// Create the main API router with all middleware
pub fn create_router(state: Arc<AppState>, config: ApiConfig) -> Router {
    let mut router = create_test_router(state);

    if config.enable_tracing {
        router = router.layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ));
    }

    if config.enable_cors {
        let cors = if config.cors_origins.iter().any(|o| o == "*") {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(
                    config
                        .cors_origins
                        .iter()
                        .filter_map(|o| o.parse().ok())
                        .collect::<Vec<_>>(),
                )
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any)
        };
        router = router.layer(cors);
    }

    router
}

/// Create a router without middleware
pub fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_v1_routes())
        .route("/health", axum::routing::get(handlers::health::health_check))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(!config.enable_cors);
        assert!(config.enable_tracing);
    }
}
