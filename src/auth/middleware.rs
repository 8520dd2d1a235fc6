//! # Authentication Middleware
//!
//! Guards the protected routes. For every request it:
//! 1. extracts the bearer credential (`<scheme> <token>`, nothing else is accepted),
//! 2. resolves it through the user service's `AuthUser` call under the per-call deadline,
//! 3. on success hands an enriched `ProcessingContext` to the next stage,
//! 4. on failure answers with the classified error and never calls the next stage.
//!
//! Identities are resolved on every request and never cached, so revocations and role
//! changes apply immediately.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::core::classifier::Operation;
use crate::core::config::AuthSettings;
use crate::core::error::{ConfigError, GatewayError, GatewayResult};
use crate::core::types::{CallerIdentity, ProcessingContext};
use crate::gateway::server::ServerState;
use crate::protocols::user_service::AuthUserRequest;

/// Bearer credential policy: which header, which scheme
#[derive(Debug, Clone)]
pub struct BearerAuth {
    header: HeaderName,
    scheme: String,
}

impl BearerAuth {
    pub fn new(header: HeaderName, scheme: impl Into<String>) -> Self {
        Self {
            header,
            scheme: scheme.into(),
        }
    }

    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        let header = HeaderName::from_bytes(settings.header.to_ascii_lowercase().as_bytes())
            .map_err(|e| ConfigError::Validation(vec![format!("auth.header is invalid: {}", e)]))?;
        Ok(Self::new(header, settings.scheme.clone()))
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Render a token in the form `extract_token` accepts
    pub fn credential(&self, token: &str) -> String {
        format!("{} {}", self.scheme, token)
    }

    /// Extract the token from request headers
    ///
    /// The header must hold exactly two space-separated parts: the configured scheme
    /// (case-insensitive) and a non-empty token.
    pub fn extract_token<'h>(&self, headers: &'h HeaderMap) -> GatewayResult<&'h str> {
        let value = headers
            .get(&self.header)
            .ok_or_else(|| unauthorized("missing credential header"))?
            .to_str()
            .map_err(|_| unauthorized("credential header is not valid ASCII"))?;

        let mut parts = value.split(' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(token), None)
                if scheme.eq_ignore_ascii_case(&self.scheme) && !token.is_empty() =>
            {
                Ok(token)
            }
            _ => Err(unauthorized("malformed credential header")),
        }
    }
}

impl Default for BearerAuth {
    fn default() -> Self {
        Self::new(axum::http::header::AUTHORIZATION, "Bearer")
    }
}

fn unauthorized(reason: &str) -> GatewayError {
    debug!(reason, "Rejecting credential");
    GatewayError::unauthenticated(Operation::AUTHENTICATE.rejected)
}

/// Resolve the request's credential to a caller identity
pub async fn authenticate(
    state: &ServerState,
    context: &ProcessingContext,
    headers: &HeaderMap,
) -> GatewayResult<CallerIdentity> {
    let token = state.auth().extract_token(headers)?;
    let message = AuthUserRequest {
        token: token.to_string(),
    };

    let user = state
        .invoke(context, &Operation::AUTHENTICATE, message, |request| {
            state.client().auth_user(request)
        })
        .await?;

    Ok(CallerIdentity::from(user))
}

/// Axum middleware function for authentication
pub async fn auth_middleware(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let context = request
        .extensions()
        .get::<ProcessingContext>()
        .cloned()
        .unwrap_or_else(|| ProcessingContext::generate(state.request_timeout()));

    let outcome = authenticate(&state, &context, request.headers()).await;
    match outcome {
        Ok(identity) => {
            debug!(
                request_id = %context.request_id,
                user_id = identity.user_id,
                "Caller authenticated"
            );
            request
                .extensions_mut()
                .insert(context.with_identity(identity));
            next.run(request).await
        }
        Err(err) => {
            warn!(
                request_id = %context.request_id,
                path = %request.uri().path(),
                kind = err.kind().as_str(),
                "Authentication failed"
            );
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use crate::core::error::ErrorKind;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_token_extraction() {
        let auth = BearerAuth::default();
        assert_eq!(auth.extract_token(&headers("Bearer test-token")), Ok("test-token"));
        assert_eq!(auth.extract_token(&headers("bearer test-token")), Ok("test-token"));
    }

    #[test]
    fn test_issued_credential_is_accepted() {
        let auth = BearerAuth::default();
        let mut map = HeaderMap::new();
        map.insert(
            auth.header().clone(),
            HeaderValue::from_str(&auth.credential("issued")).unwrap(),
        );
        assert_eq!(auth.extract_token(&map), Ok("issued"));
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        let auth = BearerAuth::default();
        for value in [
            "test-token",
            "Bearer",
            "Bearer ",
            "Basic dXNlcjpwYXNz",
            "Bearer a b",
            "Bearer  token",
        ] {
            let err = auth.extract_token(&headers(value)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthenticated, "{value:?}");
        }
    }

    #[test]
    fn test_missing_header_is_rejected() {
        let auth = BearerAuth::default();
        let err = auth.extract_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err, GatewayError::unauthenticated("Unauthorized"));
    }

    #[test]
    fn test_custom_header_and_scheme() {
        let settings = AuthSettings {
            header: "X-Session".to_string(),
            scheme: "Token".to_string(),
        };
        let auth = BearerAuth::from_settings(&settings).unwrap();

        let mut map = HeaderMap::new();
        map.insert("x-session", HeaderValue::from_static("Token abc"));
        assert_eq!(auth.extract_token(&map), Ok("abc"));
        assert!(auth.extract_token(&headers("Token abc")).is_err());
    }

    #[test]
    fn test_invalid_header_name_is_a_config_error() {
        let settings = AuthSettings {
            header: "bad header".to_string(),
            scheme: "Bearer".to_string(),
        };
        assert!(BearerAuth::from_settings(&settings).is_err());
    }
}
