//! # Request Context Middleware
//!
//! Outermost gateway stage for every request:
//! - assigns the request id (an inbound `x-request-id` is reused) and echoes it on the response
//! - inserts the `ProcessingContext` the later stages read
//! - enforces the overall request deadline
//! - turns axum's bare 405 into the gateway's 404 envelope, so route matching stays total
//! - logs method, path, status and latency once the response is ready

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::core::error::GatewayError;
use crate::core::types::ProcessingContext;
use crate::gateway::server::ServerState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Message for paths (or path/method pairs) nothing is routed to
pub const ROUTE_NOT_FOUND: &str = "Route not found";

const MAX_REQUEST_ID_LEN: usize = 128;

pub async fn request_context(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = match inbound_request_id(&request) {
        Some(id) => ProcessingContext::new(id, state.request_timeout()),
        None => ProcessingContext::generate(state.request_timeout()),
    };
    let request_id = context.request_id.clone();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    request.extensions_mut().insert(context.clone());

    let mut response = match tokio::time::timeout(context.remaining(), next.run(request)).await {
        Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
            GatewayError::not_found(ROUTE_NOT_FOUND).into_response()
        }
        Ok(response) => response,
        Err(_) => {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "Request exceeded its deadline"
            );
            GatewayError::internal("Internal server error").into_response()
        }
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = context.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

fn inbound_request_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_inbound_request_id_is_reused() {
        let request = Request::builder()
            .header("x-request-id", " abc-123 ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(inbound_request_id(&request).as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_unusable_request_ids_are_ignored() {
        let empty = Request::builder()
            .header("x-request-id", "")
            .body(Body::empty())
            .unwrap();
        assert_eq!(inbound_request_id(&empty), None);

        let oversized = Request::builder()
            .header("x-request-id", "a".repeat(MAX_REQUEST_ID_LEN + 1))
            .body(Body::empty())
            .unwrap();
        assert_eq!(inbound_request_id(&oversized), None);

        let missing = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(inbound_request_id(&missing), None);
    }
}
