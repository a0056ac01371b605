use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/health", get(health))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&state.registry.gather(), &mut buffer)?;
    let body = String::from_utf8(buffer)?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
