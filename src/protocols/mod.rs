pub mod grpc;
pub mod user_service;

pub use grpc::{GrpcConfig, GrpcIdentityClient, IdentityClient};
