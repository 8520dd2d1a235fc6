//! # Error Handling Middleware
//!
//! Last line of defence: a panic inside any handler or middleware is caught by
//! `tower_http::catch_panic` and answered with a plain Internal error. The process and the
//! other in-flight requests are unaffected.

use axum::response::{IntoResponse, Response};
use std::any::Any;
use tracing::error;

use crate::core::error::GatewayError;

/// Panic handler for `CatchPanicLayer::custom`
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic payload"
    };

    error!(panic = detail, "Request handler panicked");
    GatewayError::internal("Internal server error").into_response()
}
