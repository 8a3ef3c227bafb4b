//! HTTP error mapping: every failure renders as `{ok: false, error}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use plantarum_core::{ChainError, PinError};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Client input problem (400).
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Chain or pinning service failure (500).
    #[error("{0}")]
    Upstream(String),

    /// Feature not configured or shutting down (503).
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Tag the error with a tokenization category (`type` in the body).
    pub fn with_type(self, category: &str) -> CategoryError {
        CategoryError {
            category: category.to_string(),
            error: self,
        }
    }

    fn log(&self) {
        match self {
            Self::Upstream(e) => tracing::error!(error = %e, "request failed upstream"),
            Self::Unavailable(e) => tracing::warn!(error = %e, "service unavailable"),
            Self::BadRequest(_) | Self::NotFound(_) => {}
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        let body = json!({ "ok": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InvalidRange { .. }
            | ChainError::InvalidStep
            | ChainError::InvalidAddress(_) => Self::BadRequest(err.to_string()),
            ChainError::Cancelled => Self::Unavailable("server is shutting down".into()),
            other => Self::Upstream(other.to_string()),
        }
    }
}

impl From<PinError> for ApiError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::NotConfigured => Self::Unavailable(err.to_string()),
            PinError::Upstream { message, .. } => Self::Upstream(message),
            other => Self::Upstream(other.to_string()),
        }
    }
}

/// `ApiError` for the `/api/{category}` routes; the body also carries `type`.
#[derive(Debug)]
pub struct CategoryError {
    pub category: String,
    pub error: ApiError,
}

impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        self.error.log();
        let body = json!({
            "ok": false,
            "type": self.category,
            "error": self.error.to_string(),
        });
        (self.error.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_errors_map_to_status() {
        let err: ApiError = ChainError::InvalidRange { from: 9, to: 1 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: ApiError = ChainError::InvalidAddress("0x12".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let err: ApiError = ChainError::Rpc("connection refused".into()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn pinata_body_is_forwarded() {
        let err: ApiError = PinError::Upstream {
            status: 401,
            message: "401 Unauthorized :: {\"error\":\"Invalid JWT\"}".into(),
        }
        .into();
        assert_eq!(err.to_string(), "401 Unauthorized :: {\"error\":\"Invalid JWT\"}");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
