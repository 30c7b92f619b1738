//! Health and welcome handlers

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::dto::WelcomeResponse;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Timestamp (ms)
    pub timestamp: i64,
}

/// Health check endpoint
///
/// Returns 200 if the service is running.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    })
}

/// Static greeting for users who start the bot outside a group
pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        text: escrowbot_core::welcome_text().to_string(),
    })
}
