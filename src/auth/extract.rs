//! Extractors that hand the processing context to handlers.
//!
//! Handlers name the context (or the authenticated caller) in their signature, so the
//! dependency on the middleware stages is visible at the call site.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::error;

use crate::core::classifier::Operation;
use crate::core::error::GatewayError;
use crate::core::types::{CallerIdentity, ProcessingContext};

#[async_trait]
impl<S> FromRequestParts<S> for ProcessingContext
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ProcessingContext>()
            .cloned()
            .ok_or_else(|| {
                error!(path = %parts.uri.path(), "Request reached a handler without a processing context");
                GatewayError::internal("Internal server error")
            })
    }
}

/// The processing context of a request whose caller has been authenticated
///
/// Extraction fails closed: a context without an identity is rejected as unauthenticated
/// instead of falling back to an anonymous caller.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub context: ProcessingContext,
    pub identity: CallerIdentity,
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ProcessingContext::from_request_parts(parts, state).await?;
        let identity = context
            .identity()
            .cloned()
            .ok_or_else(|| GatewayError::unauthenticated(Operation::AUTHENTICATE.rejected))?;
        Ok(Self { context, identity })
    }
}
