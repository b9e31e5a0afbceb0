//! Mapping of deployment errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::error;

/// Error returned by request handlers.
#[derive(Debug)]
pub enum ApiError {
    Deploy(logtail::Error),
    /// Page rendering failed.
    Render(minijinja::Error),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl From<logtail::Error> for ApiError {
    fn from(err: logtail::Error) -> Self {
        Self::Deploy(err)
    }
}

impl From<minijinja::Error> for ApiError {
    fn from(err: minijinja::Error) -> Self {
        Self::Render(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            Self::Deploy(logtail::Error::NotFound(token)) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("deployment {token} not found"),
            ),
            Self::Deploy(err @ logtail::Error::Storage { .. }) => {
                error!(error = %err, "storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "storage_error",
                    "deployment storage unavailable".to_string(),
                )
            }
            Self::Render(err) => {
                error!(error = %err, "template rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_error",
                    "failed to render page".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
            }),
        )
            .into_response()
    }
}
