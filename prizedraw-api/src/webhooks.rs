use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use prizedraw_claim::CompletedPurchase;
use prizedraw_core::{PaymentConfirmation, PaymentStatus, PurchaseStatus};
use prizedraw_shared::PrizePool;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub amount_received: Option<i64>,
    pub receipt_email: Option<String>,
    /// Provider metadata values are always strings
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub purchase_id: Option<Uuid>,
    pub status: Option<PurchaseStatus>,
    pub pool: Option<PrizePool>,
    pub replayed: bool,
}

impl WebhookResponse {
    fn ignored() -> Self {
        Self {
            received: true,
            purchase_id: None,
            status: None,
            pool: None,
            replayed: false,
        }
    }
}

impl From<CompletedPurchase> for WebhookResponse {
    fn from(done: CompletedPurchase) -> Self {
        Self {
            received: true,
            purchase_id: Some(done.purchase.id),
            status: Some(done.purchase.status),
            pool: done.pool,
            replayed: done.replayed,
        }
    }
}

/// POST /v1/webhooks/payments
/// Only `payment_intent.succeeded` allocates a pool; other event types are acknowledged and ignored.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<(StatusCode, Json<WebhookResponse>), AppError> {
    tracing::info!("Received webhook {}: {} for intent {}", payload.id, payload.type_, payload.data.object.id);

    if payload.type_ != "payment_intent.succeeded" {
        return Ok((StatusCode::OK, Json(WebhookResponse::ignored())));
    }

    let confirmation = to_confirmation(payload.data.object)?;
    let done = state
        .orchestrator
        .complete_payment(&confirmation)
        .await
        .map_err(AppError::from_claim)?;

    // Money has moved either way; 202 tells the caller a person still has to act.
    let status = if done.needs_manual_fulfilment() {
        StatusCode::ACCEPTED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(done.into())))
}

fn to_confirmation(intent: PaymentIntentObject) -> Result<PaymentConfirmation, AppError> {
    let metadata = |key: &str| {
        intent
            .metadata
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::ValidationError(format!("payment metadata is missing {}", key)))
    };

    let event_id = Uuid::parse_str(&metadata("event_id")?)
        .map_err(|e| AppError::ValidationError(format!("invalid event_id: {}", e)))?;
    let quantity_size = metadata("quantity_size")?
        .parse::<u8>()
        .map_err(|e| AppError::ValidationError(format!("invalid quantity_size: {}", e)))?;
    let buyer_id = metadata("buyer_id")?;

    let status = match intent.status.as_str() {
        "succeeded" => PaymentStatus::Succeeded,
        "processing" => PaymentStatus::Processing,
        "canceled" => PaymentStatus::Canceled,
        _ => PaymentStatus::Failed,
    };

    Ok(PaymentConfirmation {
        payment_reference: intent.id,
        event_id,
        quantity_size,
        buyer_id,
        buyer_email: intent.receipt_email,
        amount_cents: intent.amount_received.unwrap_or(intent.amount),
        status,
    })
}
