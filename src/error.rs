//! Error types for the assistant backend.
//!
//! Each component returns its own `thiserror` enum so failures stay visible at
//! the call site. [`AppError`] is the HTTP-facing union: it maps every failure
//! onto a status code and the `{ ok: false, error }` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const GENERIC_ERROR: &str = "Internal Server Error";

/// Rejections from the prompt validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Prompt is required and must be a string.")]
    MissingPrompt,

    #[error("Prompt exceeds maximum length of {max} characters.")]
    PromptTooLong { max: usize },

    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),
}

/// Failures from the text-generation backend.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The endpoint was unreachable or answered with a non-success status.
    #[error("{0}")]
    Unavailable(String),

    #[error("An unexpected error occurred while communicating with the AI model.")]
    Unexpected,
}

/// Failures from the document-query service.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("{0}")]
    Unavailable(String),

    #[error("Retrieval service returned a malformed response: {0}")]
    Malformed(String),
}

/// Failures from the RAG orchestrator, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error(transparent)]
    RetrievalFailed(RetrievalError),

    #[error(transparent)]
    GenerationFailed(GenerationError),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: error.into(),
        }
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Not authenticated")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, please try again later.")]
    TooManyRequests,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Generation(_) | AppError::Rag(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.to_string();
        if status.is_server_error() {
            tracing::error!(error = %message, "request failed");
            if message.is_empty() {
                message = GENERIC_ERROR.to_string();
            }
        }
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}
