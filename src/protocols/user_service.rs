//! # User Service Contract
//!
//! Protobuf messages and the unary gRPC client for `user.UserService`, generated by
//! `build.rs` from `proto/user_service.proto`.

#![allow(clippy::derive_partial_eq_without_eq)]

tonic::include_proto!("user");

pub use user_service_client::UserServiceClient;

/// Fully qualified gRPC service name
pub const SERVICE_NAME: &str = "user.UserService";
