//! Ticket routes
//!
//! Listing, direct injection and the operator overrides.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use helpdesk_shared::{ClientSubmission, NewTicket, Priority, Ticket, TicketId, TicketState};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub state: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TicketsListResponse {
    pub tickets: Vec<Ticket>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct AssignTicketRequest {
    pub technician: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// List every known ticket in submission order
pub async fn list_tickets(
    State(state): State<AppState>,
    query: Result<Query<ListTicketsQuery>, QueryRejection>,
) -> ApiResult<Json<TicketsListResponse>> {
    let Query(query) = query?;
    let state_filter = query
        .state
        .as_deref()
        .map(str::parse::<TicketState>)
        .transpose()
        .map_err(ApiError::BadRequest)?;
    let priority_filter = query
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let tickets = state.dispatcher.list(state_filter, priority_filter);
    let total = tickets.len();

    Ok(Json(TicketsListResponse { tickets, total }))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    ticket_id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Ticket>> {
    let Path(ticket_id) = ticket_id?;
    Ok(Json(state.dispatcher.get(TicketId(ticket_id))?))
}

/// Register a ticket without a client connection
pub async fn create_ticket(
    State(state): State<AppState>,
    req: Result<Json<ClientSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let Json(req) = req?;
    let new_ticket = NewTicket::try_from(req).map_err(|e| ApiError::Validation(e.to_string()))?;
    let ticket = state.dispatcher.submit(new_ticket);

    tracing::info!(
        ticket_id = %ticket.id,
        priority = %ticket.priority,
        "Ticket created via API"
    );

    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Hand a pending ticket to a technician on the roster
pub async fn assign_ticket(
    State(state): State<AppState>,
    ticket_id: Result<Path<u64>, PathRejection>,
    req: Result<Json<AssignTicketRequest>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let Path(ticket_id) = ticket_id?;
    let Json(req) = req?;

    let technician = req.technician.trim();
    if technician.is_empty() {
        return Err(ApiError::Validation("technician must not be empty".to_string()));
    }
    if state.technicians.is_empty() {
        return Err(ApiError::BadRequest("No technicians have been hired".to_string()));
    }
    if !state.technicians.is_hired(technician) {
        return Err(ApiError::NotFound(format!(
            "Technician '{}' not found",
            technician
        )));
    }

    let ticket = state
        .dispatcher
        .assign_manual(TicketId(ticket_id), technician)?;
    Ok(Json(ticket))
}

/// Force a ticket to `RESOLVED`
pub async fn resolve_ticket(
    State(state): State<AppState>,
    ticket_id: Result<Path<u64>, PathRejection>,
) -> ApiResult<Json<Ticket>> {
    let Path(ticket_id) = ticket_id?;
    let ticket = state.dispatcher.resolve_manual(TicketId(ticket_id))?;
    tracing::info!(ticket_id = %ticket.id, "Ticket resolved manually");
    Ok(Json(ticket))
}
