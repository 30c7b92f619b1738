//! Command handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use std::sync::Arc;

use escrowbot_core::Command;

use crate::dto::TicketView;
use crate::error::{ApiError, ApiResult};
use crate::handlers::tickets::view;
use crate::state::AppState;

/// Run a workflow command and return the ticket afterwards
pub async fn execute_command(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Command>, JsonRejection>,
) -> ApiResult<Json<TicketView>> {
    let Json(command) = payload.map_err(|e| ApiError::InvalidRequestBody(e.body_text()))?;
    let ticket = state.desk.execute(command).await?;
    Ok(Json(view(&state, ticket)))
}
