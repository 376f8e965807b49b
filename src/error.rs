use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Main error type for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding errors (corrupt or unsupported image data)
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Catalog file missing or unparseable; nothing can proceed without it
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration errors (bad or missing settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// An ingestion run produced zero feature vectors
    #[error("No feature vectors were produced; refusing to write an empty store")]
    EmptyStore,

    /// Feature store artifact unreadable or internally inconsistent
    #[error("Corrupt feature store: {0}")]
    CorruptStore(String),

    /// Vector length does not match the store's embedding dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension the store was built with.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
    },

    /// Embedding provider failed to produce a vector
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// HTTP fetch errors (image downloads, remote embedding calls)
    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Upload errors (multipart form problems)
    #[error("Upload error: {0}")]
    Upload(String),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (HTTP status code)
    pub code: u16,
    /// Error message
    pub message: String,
    /// Optional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Image(_) => StatusCode::BAD_REQUEST,
            Self::Embedding(_) => StatusCode::BAD_REQUEST,
            Self::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::Upload(_) => StatusCode::BAD_REQUEST,
            Self::Fetch(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert the error to a JSON response
    pub fn to_json(&self) -> ErrorResponse {
        let status = self.status_code();

        match self {
            // Whatever went wrong with the query image, the client-facing
            // message stays the same; the cause goes into `details`.
            Self::Image(_) | Self::Embedding(_) | Self::DimensionMismatch { .. } => {
                ErrorResponse {
                    code: status.as_u16(),
                    message: "Could not process the uploaded image.".to_string(),
                    details: Some(self.to_string()),
                }
            }
            _ => ErrorResponse {
                code: status.as_u16(),
                message: self.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let response = self.to_json();

        (status, Json(response)).into_response()
    }
}

// Implement From for common error types
impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task join error: {}", err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::Upload(err.to_string())
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;
