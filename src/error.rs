use axum::{
    extract::multipart::MultipartError,
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

pub const INVALID_CSV_MESSAGE: &str = "Invalid or corrupted CSV file.";
pub const EMPTY_CSV_MESSAGE: &str = "Uploaded CSV is empty.";
pub const MISSING_FILE_MESSAGE: &str = "No file uploaded.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Uploaded CSV has no data rows")]
    EmptyInput,
    #[error("Multipart request has no `file` field")]
    MissingFile,
    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure while computing one column's statistics. The column is dropped
/// from the result; the request still succeeds.
#[derive(Debug, Error, PartialEq)]
pub enum ColumnError {
    #[error("cannot read column as floats: {0}")]
    Cast(String),
    #[error("column has no non-missing values")]
    NoValues,
    #[error("column contains non-finite values")]
    NonFinite,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM is not configured")]
    Unavailable,
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM returned an empty response")]
    EmptyResponse,
    #[error("LLM request timed out")]
    Timeout,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, INVALID_CSV_MESSAGE.to_string()),
            AppError::EmptyInput => (StatusCode::BAD_REQUEST, EMPTY_CSV_MESSAGE.to_string()),
            AppError::MissingFile => (StatusCode::BAD_REQUEST, MISSING_FILE_MESSAGE.to_string()),
            AppError::Upload(err) => (err.status(), err.body_text()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
