//! API routes

pub mod events;
pub mod health;
pub mod stats;
pub mod technicians;
pub mod tickets;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    let api_v1_routes = Router::new()
        .route("/tickets", get(tickets::list_tickets).post(tickets::create_ticket))
        .route("/tickets/:ticket_id", get(tickets::get_ticket))
        .route("/tickets/:ticket_id/assign", post(tickets::assign_ticket))
        .route("/tickets/:ticket_id/resolve", post(tickets::resolve_ticket))
        .route(
            "/technicians",
            get(technicians::list_technicians).post(technicians::hire_technicians),
        )
        .route("/stats", get(stats::get_stats))
        .route("/events", get(events::ticket_events));

    // Combine all routes
    Router::new()
        .merge(health_routes)
        .nest("/api/v1", api_v1_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
