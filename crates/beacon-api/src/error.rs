//! Error types for the registry API server.
//!
//! [`ApiError`] unifies all failure modes into a single enum that converts
//! into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use beacon_core::error::RegistryError;
use beacon_types::IdentityError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A validation or engine error from the core.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A serialization error while building a response.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        Self::Registry(RegistryError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Registry(RegistryError::Identity(_) | RegistryError::EmptyTargets) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Registry(_) | Self::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
