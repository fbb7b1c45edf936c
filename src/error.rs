//! Error types for the extractor, the warehouse and the dashboard API.
//!
//! Binaries and startup code use `anyhow`; the enums here exist where the
//! caller has to branch on the kind of failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

// ---

/// Failure to turn an activity file into rows.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to decode FIT data: {0}")]
    Decode(String),

    #[error("Failed to read activity file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing column in decoded records: {0}")]
    MissingColumn(String),
}

impl ExtractError {
    // ---
    /// True when the decoder rejected the file on a checksum mismatch.
    ///
    /// Such files cannot be recovered by a later run and are disposed of.
    pub fn is_corrupted(&self) -> bool {
        match self {
            ExtractError::Decode(msg) => msg.to_ascii_lowercase().contains("crc"),
            _ => false,
        }
    }
}

/// Failure talking to the warehouse.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Dashboard API error, rendered as a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
