use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use prizedraw_api::{app, AppState, Backends};
use prizedraw_catalog::InventoryItem;
use prizedraw_store::app_config::PrizeRules;
use prizedraw_store::InMemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let (state, _worker) = AppState::assemble(
        Backends::in_memory(store.clone()),
        PrizeRules::default(),
        None,
        prometheus::Registry::new(),
    )
    .unwrap();

    TestApp {
        router: app(state),
        store,
    }
}

async fn seed_stadium(store: &InMemoryStore) -> Uuid {
    let event_id = Uuid::new_v4();
    store
        .seed_event(event_id, vec![
            InventoryItem::ticket_level(event_id, "Upper", 10000, 5),
            InventoryItem::ticket_level(event_id, "Lower", 20000, 5),
            InventoryItem::collectible(event_id, "Pin", 500, 10),
            InventoryItem::collectible(event_id, "Cap", 2500, 10),
            InventoryItem::collectible(event_id, "Scarf", 1500, 10),
            InventoryItem::collectible(event_id, "Jersey", 9000, 10),
        ])
        .await;
    event_id
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn payment_succeeded(reference: &str, event_id: Uuid, quantity_size: u8) -> Value {
    json!({
        "id": format!("evt_{}", reference),
        "type": "payment_intent.succeeded",
        "data": {
            "object": {
                "id": reference,
                "status": "succeeded",
                "amount": 19500,
                "amount_received": 19500,
                "receipt_email": "fan@example.com",
                "metadata": {
                    "event_id": event_id.to_string(),
                    "quantity_size": quantity_size.to_string(),
                    "buyer_id": "buyer-1"
                }
            }
        }
    })
}

#[tokio::test]
async fn test_health() {
    let t = test_app();
    let response = t
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_price_matrix_covers_every_pack_and_size() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, body) = send(&t.router, Method::GET, &format!("/v1/events/{}/pricing", event_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let cells = body["cells"].as_array().unwrap();
    assert_eq!(cells.len(), 12);

    let blue_pair = cells
        .iter()
        .find(|c| c["pack"] == "blue" && c["quantity_size"] == 2)
        .unwrap();
    // mean level price 150.00, two units, 30% margin
    assert_eq!(blue_pair["total_value_cents"], 30000);
    assert_eq!(blue_pair["sale_price_cents"], 39000);
}

#[tokio::test]
async fn test_single_price_query() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, body) = send(
        &t.router,
        Method::GET,
        &format!("/v1/events/{}/price?pack=gold&size=1", event_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sale_price_cents"], 19500);
    assert_eq!(body["items_available"], 10);

    let (status, _) = send(&t.router, Method::GET, &format!("/v1/events/{}/price?size=9", event_id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.router, Method::GET, &format!("/v1/events/{}/price", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_featured_prizes() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, body) = send(&t.router, Method::GET, &format!("/v1/events/{}/featured", event_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["top_ticket"]["name"], "Lower");
    assert_eq!(body["top_collectible"]["name"], "Jersey");
}

#[tokio::test]
async fn test_payment_webhook_allocates_one_pool() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, body) = send(
        &t.router,
        Method::POST,
        "/v1/webhooks/payments",
        Some(payment_succeeded("pi_100", event_id, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "FULFILLED");
    assert_eq!(body["replayed"], false);

    let bundles = body["pool"]["bundles"].as_array().unwrap();
    assert_eq!(bundles.len(), 2);
    assert_eq!(bundles[0]["ticket"]["item_id"], bundles[1]["ticket"]["item_id"]);
    assert_ne!(bundles[0]["collectible"]["item_id"], bundles[1]["collectible"]["item_id"]);
    assert_eq!(body["pool"]["state"], "CLAIMED");

    // the inline batch held five pools; one is now gone
    let (status, availability) = send(
        &t.router,
        Method::GET,
        &format!("/v1/events/{}/pools/2/availability", event_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["available"], 4);

    // provider retries must not allocate a second pool
    let (status, replay) = send(
        &t.router,
        Method::POST,
        "/v1/webhooks/payments",
        Some(payment_succeeded("pi_100", event_id, 2)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["replayed"], true);
    assert_eq!(replay["purchase_id"], body["purchase_id"]);
    assert_eq!(t.store.purchases().await.len(), 1);
}

#[tokio::test]
async fn test_payment_without_supply_needs_manual_fulfilment() {
    let t = test_app();
    let event_id = Uuid::new_v4();
    t.store
        .seed_event(event_id, vec![InventoryItem::ticket_level(event_id, "Lower", 20000, 5)])
        .await;

    let (status, body) = send(
        &t.router,
        Method::POST,
        "/v1/webhooks/payments",
        Some(payment_succeeded("pi_200", event_id, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "REQUIRES_MANUAL_FULFILMENT");
    assert!(body["pool"].is_null());
}

#[tokio::test]
async fn test_unsupported_size_payment_recorded() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, body) = send(
        &t.router,
        Method::POST,
        "/v1/webhooks/payments",
        Some(payment_succeeded("pi_250", event_id, 9)),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "REQUIRES_MANUAL_FULFILMENT");

    let stored = t.store.purchases().await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].quantity_size, 9);
}

#[tokio::test]
async fn test_other_webhook_types_ignored() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let mut payload = payment_succeeded("pi_300", event_id, 1);
    payload["type"] = json!("payment_intent.payment_failed");

    let (status, body) = send(&t.router, Method::POST, "/v1/webhooks/payments", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["purchase_id"].is_null());
    assert!(t.store.purchases().await.is_empty());
}

#[tokio::test]
async fn test_webhook_missing_metadata_rejected() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let mut payload = payment_succeeded("pi_400", event_id, 1);
    payload["data"]["object"]["metadata"] = json!({ "event_id": event_id.to_string() });

    let (status, _) = send(&t.router, Method::POST, "/v1/webhooks/payments", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_upsert_invalidates_every_size() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    // fill two keys through purchases
    for (reference, size) in [("pi_500", 1u8), ("pi_501", 3u8)] {
        let (status, _) = send(
            &t.router,
            Method::POST,
            "/v1/webhooks/payments",
            Some(payment_succeeded(reference, event_id, size)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let item = InventoryItem::special_prize(event_id, "Suite Upgrade", 150000, 1);
    let (status, body) = send(
        &t.router,
        Method::PUT,
        &format!("/v1/admin/events/{}/items", event_id),
        Some(serde_json::to_value(&item).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pools_invalidated"], 8);
    assert!(t.store.item(item.id()).await.is_some());

    for size in [1, 2, 3, 4] {
        let (_, availability) = send(
            &t.router,
            Method::GET,
            &format!("/v1/events/{}/pools/{}/availability", event_id, size),
            None,
        )
        .await;
        assert_eq!(availability["available"], 0);
    }
}

#[tokio::test]
async fn test_admin_rejects_bad_mutations() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;

    let (status, _) = send(
        &t.router,
        Method::DELETE,
        &format!("/v1/admin/events/{}/items/{}", event_id, Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let foreign = InventoryItem::collectible(Uuid::new_v4(), "Pin", 500, 1);
    let (status, _) = send(
        &t.router,
        Method::PUT,
        &format!("/v1/admin/events/{}/items", event_id),
        Some(serde_json::to_value(&foreign).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let oversized = InventoryItem::ticket_level(event_id, "Upper", 10000, i32::MAX);
    let (status, _) = send(
        &t.router,
        Method::PUT,
        &format!("/v1/admin/events/{}/items", event_id),
        Some(serde_json::to_value(&oversized).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(t.store.item(oversized.id()).await.is_none());

    let unknown_event = Uuid::new_v4();
    let orphan = InventoryItem::collectible(unknown_event, "Pin", 500, 1);
    let (status, _) = send(
        &t.router,
        Method::PUT,
        &format!("/v1/admin/events/{}/items", unknown_event),
        Some(serde_json::to_value(&orphan).unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_delete_item() {
    let t = test_app();
    let event_id = seed_stadium(&t.store).await;
    let pin = InventoryItem::collectible(event_id, "Limited Pin", 700, 2);
    t.store.seed_event(event_id, vec![pin.clone()]).await;

    let (status, body) = send(
        &t.router,
        Method::DELETE,
        &format!("/v1/admin/events/{}/items/{}", event_id, pin.id()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item_id"], pin.id().to_string());
    assert!(t.store.item(pin.id()).await.is_none());
}

#[tokio::test]
async fn test_metrics_exposes_replenish_counters() {
    let t = test_app();
    let response = t
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("prizedraw_replenish_backlog"));
}
