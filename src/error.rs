//! Error types for the inquiry service.

use std::time::Duration;

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

/// Body returned when no customer message could be resolved.
pub const MISSING_MESSAGE_BODY: &str =
    "Missing customer message. Pass it either as query parameter message or in the body.";

/// Body returned when the sentiment service could not classify the message.
pub const CLASSIFICATION_FAILED_BODY: &str =
    "Unexpected error: getting message sentiment from cognitive services failed";

/// Body returned when the inquiry could not be written to the store.
pub const PERSISTENCE_FAILED_BODY: &str = "Unexpected error: storing the customer inquiry failed";

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),
}

/// Sentiment service errors.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("Request to sentiment service failed: {0}")]
    Network(String),

    #[error("Sentiment service rejected credentials (status {status})")]
    Auth { status: u16 },

    #[error("Sentiment service rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Sentiment service returned status {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Malformed sentiment response: {0}")]
    MalformedResponse(String),
}

impl ClassificationError {
    /// Short stable tag for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassificationError::Network(_) => "network",
            ClassificationError::Auth { .. } => "auth",
            ClassificationError::RateLimited { .. } => "rate_limit",
            ClassificationError::Service { .. } => "service",
            ClassificationError::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// Outcome of a failed inquiry request.
#[derive(Debug, thiserror::Error)]
pub enum InquiryError {
    #[error("No customer message supplied")]
    MissingMessage,

    #[error("Sentiment classification failed: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Persisting inquiry failed: {0}")]
    Persistence(#[from] DatabaseError),
}

impl InquiryError {
    pub fn status(&self) -> StatusCode {
        match self {
            InquiryError::MissingMessage => StatusCode::BAD_REQUEST,
            InquiryError::Classification(_) => StatusCode::INTERNAL_SERVER_ERROR,
            InquiryError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Fixed client-facing body. Internal detail stays in the logs.
    pub fn body(&self) -> &'static str {
        match self {
            InquiryError::MissingMessage => MISSING_MESSAGE_BODY,
            InquiryError::Classification(_) => CLASSIFICATION_FAILED_BODY,
            InquiryError::Persistence(_) => PERSISTENCE_FAILED_BODY,
        }
    }
}

impl IntoResponse for InquiryError {
    fn into_response(self) -> Response {
        match &self {
            InquiryError::MissingMessage => warn!("Rejected inquiry without message"),
            InquiryError::Classification(e) => {
                error!(error = %e, kind = e.kind(), "Sentiment classification failed")
            }
            InquiryError::Persistence(e) => error!(error = %e, "Inquiry persistence failed"),
        }
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=UTF-8")],
            self.body(),
        )
            .into_response()
    }
}
