//! Technician roster routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use helpdesk_worker::TechnicianStatus;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Most technicians a single request may hire
pub const MAX_HIRE: usize = 32;

#[derive(Debug, Deserialize)]
pub struct HireRequest {
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HireResponse {
    pub hired: Vec<String>,
}

pub async fn list_technicians(State(state): State<AppState>) -> Json<Vec<TechnicianStatus>> {
    Json(state.technicians.roster())
}

pub async fn hire_technicians(
    State(state): State<AppState>,
    req: Result<Json<HireRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<HireResponse>)> {
    let Json(req) = req?;
    if req.count == 0 || req.count > MAX_HIRE {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {}",
            MAX_HIRE
        )));
    }

    let hired = state.technicians.hire(req.count);
    Ok((StatusCode::CREATED, Json(HireResponse { hired })))
}
