//! # Core Types
//!
//! Per-request data carried through the pipeline: the verified caller identity and the
//! processing context that holds it together with the request deadline.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::protocols::user_service::AuthUserResponse;

/// Longest overall deadline a request can carry
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Verified identity of the caller, as resolved by the user service
///
/// Created by the authentication middleware for a single request and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CallerIdentity {
    /// Unique user identifier
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub role: String,
}

impl CallerIdentity {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }
}

impl From<AuthUserResponse> for CallerIdentity {
    fn from(user: AuthUserResponse) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            email: user.email,
            is_verified: user.is_verified,
            role: user.role,
        }
    }
}

impl From<&CallerIdentity> for AuthUserResponse {
    fn from(identity: &CallerIdentity) -> Self {
        Self {
            id: identity.user_id,
            name: identity.name.clone(),
            email: identity.email.clone(),
            is_verified: identity.is_verified,
            role: identity.role.clone(),
        }
    }
}

/// Per-request carrier of the deadline and the (optional) caller identity
///
/// The request-context middleware creates one for every request. The authentication
/// middleware replaces it with an enriched copy via [`ProcessingContext::with_identity`];
/// handlers receive it as an extractor argument.
#[derive(Debug, Clone)]
pub struct ProcessingContext {
    /// Unique id used to correlate log lines of one request
    pub request_id: String,

    /// When the request started being processed
    pub start_time: Instant,

    /// Instant after which the request is aborted
    pub deadline: Instant,

    /// Set only after successful authentication
    identity: Option<Arc<CallerIdentity>>,
}

impl ProcessingContext {
    /// Create a context whose deadline is `timeout` from now, capped at `MAX_REQUEST_TIMEOUT`
    pub fn new(request_id: impl Into<String>, timeout: Duration) -> Self {
        let start_time = Instant::now();
        let deadline = start_time
            .checked_add(timeout.min(MAX_REQUEST_TIMEOUT))
            .unwrap_or(start_time);
        Self {
            request_id: request_id.into(),
            start_time,
            deadline,
            identity: None,
        }
    }

    /// Create a context with a freshly generated request id
    pub fn generate(timeout: Duration) -> Self {
        Self::new(Uuid::new_v4().to_string(), timeout)
    }

    /// Produce the enriched context passed to the next stage after authentication
    pub fn with_identity(self, identity: CallerIdentity) -> Self {
        Self {
            identity: Some(Arc::new(identity)),
            ..self
        }
    }

    pub fn identity(&self) -> Option<&CallerIdentity> {
        self.identity.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Time left before the overall request deadline
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Deadline for one remote call: the per-call limit, clamped to the remaining budget
    pub fn call_budget(&self, call_timeout: Duration) -> Duration {
        call_timeout.min(self.remaining())
    }

    /// Get elapsed time since the request started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}
