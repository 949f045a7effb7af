//! Error types for basalt-node
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. The enum doubles as the HTTP error surface: every variant
//! maps to a stable status class, and rejected requests always carry a
//! specific category and message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Main error type for basalt-node
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Client input malformed or contradictory; rejected before any mutation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Unknown session identifier
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// No player exists for the guild
    #[error("Player not found for guild: {0}")]
    PlayerNotFound(String),

    /// Opaque encoded track could not be decoded
    #[error("Track decode error: {0}")]
    TrackDecode(String),

    /// Identifier resolved to nothing
    #[error("No matches for identifier: {0}")]
    NoMatches(String),

    /// Identifier resolved to more than one track
    #[error("Ambiguous result: {0}")]
    Ambiguous(String),

    /// Source provider backend failure, carrying the root cause
    #[error("Source backend failure: {0}")]
    SourceBackend(#[source] anyhow::Error),

    /// Voice gateway connection failure
    #[error("Voice connection error: {0}")]
    Connection(String),

    /// An async step exceeded its bound
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// HTTP status class for this error category
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::TrackDecode(_)
            | Error::NoMatches(_)
            | Error::Ambiguous(_) => StatusCode::BAD_REQUEST,
            Error::SessionNotFound(_) | Error::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_)
            | Error::Http(_)
            | Error::SourceBackend(_)
            | Error::Connection(_)
            | Error::Timeout(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Surface the root cause for backend-shaped failures
        let message = match &self {
            Error::SourceBackend(cause) => format!("Source backend failure: {:#}", cause),
            _ => self.to_string(),
        };
        let body = json!({
            "timestamp": basalt_common::time::now().timestamp_millis(),
            "status": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Convenience Result type using basalt-node Error
pub type Result<T> = std::result::Result<T, Error>;
