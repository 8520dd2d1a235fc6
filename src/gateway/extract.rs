//! Input extractors for the user routes
//!
//! Each one rejects with an `InvalidInput` error before the handler runs, so no remote call is
//! made for a request that cannot be decoded.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::core::error::GatewayError;

pub const INVALID_PAYLOAD: &str = "Invalid request payload";
pub const TOKEN_REQUIRED: &str = "Token is needed.";
pub const INVALID_USER_ID: &str = "Invalid user ID";

/// JSON request body, decoded whatever the `Content-Type` says
///
/// Unlike `axum::Json` this does not insist on `application/json`, and every failure (body
/// read, syntax, shape) maps to the same 400 envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = GatewayError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state).await.map_err(|e| {
            debug!(error = %e, "Failed to read request body");
            GatewayError::invalid_input(INVALID_PAYLOAD)
        })?;

        serde_json::from_slice(&bytes).map(JsonBody).map_err(|e| {
            debug!(error = %e, "Failed to decode request body");
            GatewayError::invalid_input(INVALID_PAYLOAD)
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenParams {
    token: Option<String>,
}

/// Required, non-empty `token` query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenQuery(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for TokenQuery
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<TokenParams>::try_from_uri(&parts.uri)
            .map_err(|_| GatewayError::invalid_input(TOKEN_REQUIRED))?;

        match params.token {
            Some(token) if !token.is_empty() => Ok(TokenQuery(token)),
            _ => Err(GatewayError::invalid_input(TOKEN_REQUIRED)),
        }
    }
}

/// Numeric `user_id` path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for UserIdPath
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| GatewayError::invalid_input(INVALID_USER_ID))?;

        raw.parse::<i64>().map(UserIdPath).map_err(|e| {
            debug!(user_id = %raw, error = %e, "Rejecting user id");
            GatewayError::invalid_input(INVALID_USER_ID)
        })
    }
}
