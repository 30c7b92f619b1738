//! Ticket handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use escrowbot_core::TicketRef;
use escrowbot_types::{ChatId, EscrowTicket, TicketId, UserId};

use crate::dto::TicketView;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub(crate) fn view(state: &AppState, ticket: EscrowTicket) -> TicketView {
    let actions = state.desk.available_actions(&ticket);
    TicketView { ticket, actions }
}

/// Open the chat's ticket, or return the live one
pub async fn open_ticket(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<i64>,
) -> ApiResult<Json<TicketView>> {
    let ticket = state.desk.open_ticket(ChatId(chat_id)).await;
    Ok(Json(view(&state, ticket)))
}

/// Get a live ticket by code
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<TicketView>> {
    let id = TicketId::parse(&ticket_id)
        .ok_or_else(|| ApiError::InvalidParameter(format!("ticket_id '{}'", ticket_id)))?;
    let ticket = state.desk.ticket(&TicketRef::Id(id)).await?;
    Ok(Json(view(&state, ticket)))
}

/// Get the unresolved trade a user is bound to
pub async fn get_user_ticket(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<TicketView>> {
    let ticket = state
        .desk
        .active_ticket_for(UserId(user_id))
        .await
        .ok_or_else(|| ApiError::NotFound(format!("active ticket for user {}", user_id)))?;
    Ok(Json(view(&state, ticket)))
}
