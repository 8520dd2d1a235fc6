//! # User Gateway Library
//!
//! HTTP/JSON front door for the user service. It authenticates bearer credentials, translates
//! each `/v1/users` route into one gRPC call, and maps remote failures onto a small, closed
//! set of HTTP errors.
//!
//! Request flow:
//! 1. `middleware::context` assigns the request id and the overall deadline
//! 2. `auth::middleware` resolves the credential on protected routes
//! 3. `gateway::handlers` decode the input and call the backend through `ServerState::invoke`
//! 4. `core::classifier` turns any remote failure into a `GatewayError`

/// Error types, configuration, classification and per-request types
pub mod core;

/// Server, routes, handlers and the OpenAPI document
pub mod gateway;

/// Request context and panic recovery layers
pub mod middleware;

/// The user service contract and its tonic client
pub mod protocols;

/// Bearer credential handling
pub mod auth;

/// Structured logging setup
pub mod observability;

/// Main error type used throughout the gateway
pub use crate::core::error::{ConfigError, GatewayError, GatewayResult};

/// Main configuration structure for the gateway
pub use crate::core::config::GatewayConfig;

pub use crate::core::types::{CallerIdentity, ProcessingContext};

/// Server entry points
pub use crate::gateway::server::{GatewayServer, ServerState};

pub use crate::protocols::grpc::{GrpcConfig, GrpcIdentityClient, IdentityClient};
