//! Error types for reelforge.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for reelforge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reelforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Missing or empty required input.
    #[error("{0}")]
    Validation(String),

    /// Network or backend failure from the image or chat backend.
    /// `details` carries the upstream error body (decoded from binary when possible).
    #[error("{message}: {details}")]
    Upstream { message: String, details: String },

    /// The model returned text that is not valid JSON. `raw` is the verbatim text.
    #[error("{message}")]
    Parse { message: String, raw: String },

    /// The model returned JSON without a recognizable scene list.
    /// `raw` is the parsed value, attached to the response for diagnosis.
    #[error("{message}")]
    Structure {
        message: String,
        raw: serde_json::Value,
    },

    /// Media host upload failure, with the client's error unmodified.
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Validation(message) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message }),
            ),
            Error::Upstream { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message, "details": details }),
            ),
            Error::Parse { message, raw } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message, "raw": raw }),
            ),
            Error::Structure { message, raw } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message, "raw": raw }),
            ),
            Error::Upload(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "Upload failed", "details": details }),
            ),
            Error::Config(_) | Error::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": self.to_string() }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
