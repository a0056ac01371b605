use axum::{
    extract::{Path, State},
    routing::{delete, put},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;
use prizedraw_catalog::InventoryItem;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/events/{event_id}/items", put(upsert_item))
        .route("/v1/admin/events/{event_id}/items/{item_id}", delete(delete_item))
}

#[derive(Debug, Serialize)]
pub struct CatalogMutationResponse {
    pub event_id: Uuid,
    pub item_id: Uuid,
    /// AVAILABLE pools retired by the edit; replacements are drawn in the background
    pub pools_invalidated: u64,
}

/// PUT /v1/admin/events/{event_id}/items
pub async fn upsert_item(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(item): Json<InventoryItem>,
) -> Result<Json<CatalogMutationResponse>, AppError> {
    item.validate(event_id).map_err(AppError::from_catalog)?;
    ensure_event(&state, event_id).await?;

    state.catalog_admin.upsert_item(&item).await.map_err(AppError::from_repo)?;
    tracing::info!("Upserted {:?} item {} for event {}", item.kind(), item.id(), event_id);

    let pools_invalidated = after_mutation(&state, event_id).await?;
    Ok(Json(CatalogMutationResponse {
        event_id,
        item_id: item.id(),
        pools_invalidated,
    }))
}

/// DELETE /v1/admin/events/{event_id}/items/{item_id}
pub async fn delete_item(
    State(state): State<AppState>,
    Path((event_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CatalogMutationResponse>, AppError> {
    let deleted = state
        .catalog_admin
        .delete_item(event_id, item_id)
        .await
        .map_err(AppError::from_repo)?;
    if !deleted {
        return Err(AppError::NotFoundError(format!("Item {} not found for event {}", item_id, event_id)));
    }
    tracing::info!("Deleted item {} from event {}", item_id, event_id);

    let pools_invalidated = after_mutation(&state, event_id).await?;
    Ok(Json(CatalogMutationResponse {
        event_id,
        item_id,
        pools_invalidated,
    }))
}

async fn ensure_event(state: &AppState, event_id: Uuid) -> Result<(), AppError> {
    match state.catalog.snapshot(event_id).await.map_err(AppError::from_repo)? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFoundError(format!("Event {} not found", event_id))),
    }
}

/// Previously drawn pools may carry stale prices or sold-out items.
async fn after_mutation(state: &AppState, event_id: Uuid) -> Result<u64, AppError> {
    let retired = state.monitor.invalidate(event_id).await.map_err(AppError::from_pool)?;

    if let Some(redis) = &state.redis {
        if let Err(e) = redis.invalidate_event(event_id).await {
            tracing::warn!("Failed to drop cached prices for event {}: {}", event_id, e);
        }
    }

    Ok(retired)
}
