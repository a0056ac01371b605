use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;
use prizedraw_catalog::{CatalogSnapshot, FeaturedPrizes, PriceFilter, PriceMatrix, PriceQuote};

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/events/{event_id}/pricing", get(get_price_matrix))
        .route("/v1/events/{event_id}/price", get(get_price))
        .route("/v1/events/{event_id}/featured", get(get_featured))
}

#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub pack: Option<String>,
    pub size: Option<u8>,
}

/// GET /v1/events/{event_id}/pricing
/// Every configured pack x quantity size, served from cache when fresh.
pub async fn get_price_matrix(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<PriceMatrix>, AppError> {
    if let Some(redis) = &state.redis {
        match redis.get_price_matrix(event_id).await {
            Ok(Some(matrix)) => return Ok(Json(matrix)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Price cache read failed for event {}: {}", event_id, e),
        }
    }

    let snapshot = load_snapshot(&state, event_id).await?;
    let rules = &state.prize_rules;
    let matrix = state.pricing.matrix(&snapshot, &rules.packs, &rules.quantity_sizes);

    if let Some(redis) = &state.redis {
        if let Err(e) = redis.set_price_matrix(&matrix, rules.price_cache_ttl_seconds).await {
            tracing::warn!("Price cache write failed for event {}: {}", event_id, e);
        }
    }

    Ok(Json(matrix))
}

/// GET /v1/events/{event_id}/price?pack=&size=
pub async fn get_price(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Query(query): Query<PriceQuery>,
) -> Result<Json<PriceQuote>, AppError> {
    if let Some(size) = query.size {
        if !state.prize_rules.supports_size(size) {
            return Err(AppError::ValidationError(format!("Unsupported quantity size {}", size)));
        }
    }
    if let Some(pack) = &query.pack {
        if !state.prize_rules.packs.iter().any(|p| p.eq_ignore_ascii_case(pack)) {
            return Err(AppError::ValidationError(format!("Unknown pack {}", pack)));
        }
    }

    let snapshot = load_snapshot(&state, event_id).await?;
    let filter = PriceFilter {
        pack: query.pack,
        quantity_size: query.size,
    };

    Ok(Json(state.pricing.quote(&snapshot, &filter)))
}

/// GET /v1/events/{event_id}/featured
pub async fn get_featured(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<FeaturedPrizes>, AppError> {
    if let Some(redis) = &state.redis {
        if let Ok(Some(featured)) = redis.get_featured(event_id).await {
            return Ok(Json(featured));
        }
    }

    let snapshot = load_snapshot(&state, event_id).await?;
    let featured = FeaturedPrizes::from_snapshot(&snapshot);

    if let Some(redis) = &state.redis {
        if let Err(e) = redis.set_featured(&featured, state.prize_rules.price_cache_ttl_seconds).await {
            tracing::warn!("Featured cache write failed for event {}: {}", event_id, e);
        }
    }

    Ok(Json(featured))
}

async fn load_snapshot(state: &AppState, event_id: Uuid) -> Result<CatalogSnapshot, AppError> {
    state
        .catalog
        .snapshot(event_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Event {} not found", event_id)))
}
