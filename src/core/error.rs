//! # Error Handling Module
//!
//! Every failure the gateway can surface to an HTTP caller is one of four kinds:
//! invalid input, unauthenticated, not found, or internal. `GatewayError` is that closed
//! taxonomy. It carries only a caller-safe message; backend detail is logged where the error
//! is created and never reaches the response body.
//!
//! Configuration problems are a startup concern and live in `ConfigError` instead, so the
//! HTTP-facing enum stays closed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main result type used throughout the request pipeline
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The four kinds every failure is classified into before it becomes a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Unauthenticated,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }
}

/// Error type returned by extractors, middleware and handlers
///
/// The `#[error("...")]` text is what gets logged. Only `message` is written to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The caller's request is malformed or missing required data
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Credential missing, malformed, expired or rejected by the backend
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// The referenced entity (or route) does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Anything else: backend unreachable, deadline exceeded, unexpected fault
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Create an invalid input error with a caller-safe message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unauthenticated error with a caller-safe message
    pub fn unauthenticated<S: Into<String>>(message: S) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    /// Create a not found error with a caller-safe message
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create an internal error with a caller-safe message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Build an error of the given kind
    pub fn of_kind<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        match kind {
            ErrorKind::InvalidInput => Self::invalid_input(message),
            ErrorKind::Unauthenticated => Self::unauthenticated(message),
            ErrorKind::NotFound => Self::not_found(message),
            ErrorKind::Internal => Self::internal(message),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unauthenticated { .. } => ErrorKind::Unauthenticated,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    /// The message that is safe to show to the caller
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput { message }
            | Self::Unauthenticated { message }
            | Self::NotFound { message }
            | Self::Internal { message } => message,
        }
    }
}

/// JSON envelope used for every state-changing success and for every error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = MessageResponse::new(self.message());
        let mut response = (status, Json(body)).into_response();
        // Handlers and middleware can look this up instead of re-deriving it from the status
        response.extensions_mut().insert(self.kind());
        response
    }
}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid {key}: {reason}")]
    InvalidOverride { key: String, reason: String },

    #[error("Configuration validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid log filter '{directive}': {reason}")]
    LogFilter { directive: String, reason: String },
}
