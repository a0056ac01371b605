use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/events/{event_id}/pools/{size}/availability", get(get_availability))
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub event_id: Uuid,
    pub quantity_size: u8,
    pub available: usize,
    pub low_water_mark: usize,
    pub target_available: usize,
}

/// GET /v1/events/{event_id}/pools/{size}/availability
pub async fn get_availability(
    State(state): State<AppState>,
    Path((event_id, quantity_size)): Path<(Uuid, u8)>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    if !state.prize_rules.supports_size(quantity_size) {
        return Err(AppError::ValidationError(format!("Unsupported quantity size {}", quantity_size)));
    }

    let available = state
        .monitor
        .available(event_id, quantity_size)
        .await
        .map_err(AppError::from_pool)?;
    let settings = state.monitor.settings();

    Ok(Json(AvailabilityResponse {
        event_id,
        quantity_size,
        available,
        low_water_mark: settings.low_water_mark,
        target_available: settings.target_available,
    }))
}
