use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod metrics;
pub mod pools;
pub mod pricing;
pub mod state;
pub mod webhooks;

pub use state::{AppState, Backends};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .merge(webhooks::routes())
        .merge(admin::routes())
        .merge(pricing::routes())
        .merge(pools::routes())
        .merge(metrics::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
