use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use prizedraw_catalog::CatalogError;
use prizedraw_claim::ClaimError;
use prizedraw_pool::PoolError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn from_claim(err: ClaimError) -> Self {
        match err {
            ClaimError::Invalid(e) => AppError::ValidationError(e.to_string()),
            ClaimError::EventNotFound(_) => AppError::NotFoundError(err.to_string()),
            ClaimError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }

    pub fn from_pool(err: PoolError) -> Self {
        match err {
            PoolError::EventNotFound(_) => AppError::NotFoundError(err.to_string()),
            PoolError::Exhausted { .. } => AppError::InternalServerError(err.to_string()),
            PoolError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }

    pub fn from_catalog(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidItem(msg) => AppError::ValidationError(msg),
            CatalogError::EventNotFound(_) | CatalogError::ItemNotFound(_) => AppError::NotFoundError(err.to_string()),
        }
    }

    pub fn from_repo(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        AppError::Anyhow(anyhow::anyhow!(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
