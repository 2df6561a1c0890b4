//! Dispatch statistics

use axum::{extract::State, Json};
use helpdesk_dispatch::DispatchStats;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub tickets: DispatchStats,
    pub technicians: usize,
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        tickets: state.dispatcher.stats(),
        technicians: state.technicians.len(),
    })
}
