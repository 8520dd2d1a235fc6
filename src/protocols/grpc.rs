//! # gRPC Identity Client
//!
//! The gateway talks to the user service through the `IdentityClient` trait. The production
//! implementation, `GrpcIdentityClient`, wraps one tonic `Channel` that is created at startup
//! and shared by every request; tonic multiplexes concurrent calls over it, so the handle is
//! never rebuilt per request.
//!
//! Each call receives a `tonic::Request` whose timeout the caller has already set. Tonic sends
//! it as the `grpc-timeout` header, so the backend sees the same deadline the gateway enforces.
//! Dropping the returned future resets the HTTP/2 stream, which is how cancellation reaches
//! the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tonic::{
    codec::CompressionEncoding,
    transport::{Channel, ClientTlsConfig, Endpoint},
    Request, Status,
};
use tracing::{debug, info};

use crate::core::config::BackendConfig;
use crate::protocols::user_service::*;

/// Typed access to the remote user-management operations
///
/// Every method returns either the backend's response message or the `Status` it failed
/// with. Classification into gateway error kinds happens one layer up.
#[async_trait]
pub trait IdentityClient: Send + Sync + 'static {
    async fn create_user(&self, request: Request<CreateUserRequest>) -> Result<CreateUserResponse, Status>;

    async fn login_user(&self, request: Request<LoginUserRequest>) -> Result<LoginUserResponse, Status>;

    async fn verify_user(&self, request: Request<VerifyUserRequest>) -> Result<VerifyUserResponse, Status>;

    /// Resolve a bearer credential to the identity that owns it
    async fn auth_user(&self, request: Request<AuthUserRequest>) -> Result<AuthUserResponse, Status>;

    async fn send_verification_user(
        &self,
        request: Request<SendVerificationUserRequest>,
    ) -> Result<SendVerificationUserResponse, Status>;

    async fn update_user_role(
        &self,
        request: Request<UpdateUserRoleRequest>,
    ) -> Result<UpdateUserRoleResponse, Status>;

    async fn reset_user_password(
        &self,
        request: Request<ResetUserPasswordRequest>,
    ) -> Result<ResetUserPasswordResponse, Status>;

    async fn update_user_password(
        &self,
        request: Request<UpdateUserPasswordRequest>,
    ) -> Result<UpdateUserPasswordResponse, Status>;

    async fn add_editor_user(
        &self,
        request: Request<AddEditorUserRequest>,
    ) -> Result<AddEditorUserResponse, Status>;

    async fn send_editor_user(
        &self,
        request: Request<SendEditorUserRequest>,
    ) -> Result<SendEditorUserResponse, Status>;
}

/// Transport settings for the backend channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrpcConfig {
    /// Backend address, including scheme
    pub endpoint: String,
    /// Time allowed to establish the TCP/HTTP2 connection
    pub connect_timeout: Duration,
    /// TCP keepalive interval for the long-lived connection
    pub tcp_keepalive: Option<Duration>,
    /// Negotiate gzip compression with the backend
    pub enable_compression: bool,
}

impl From<&BackendConfig> for GrpcConfig {
    fn from(config: &BackendConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            connect_timeout: config.connect_timeout,
            tcp_keepalive: config.tcp_keepalive,
            enable_compression: config.enable_compression,
        }
    }
}

/// `IdentityClient` backed by a shared tonic channel
#[derive(Debug, Clone)]
pub struct GrpcIdentityClient {
    client: UserServiceClient<Channel>,
}

impl GrpcIdentityClient {
    /// Connect eagerly; fails if the backend cannot be reached within `connect_timeout`
    pub async fn connect(config: &GrpcConfig) -> Result<Self, tonic::transport::Error> {
        let endpoint = Self::endpoint(config)?;
        info!(endpoint = %config.endpoint, "Connecting to user service");
        let channel = endpoint.connect().await?;
        info!(endpoint = %config.endpoint, "Connected to user service");
        Ok(Self::from_channel(channel, config))
    }

    /// Build the client without dialing; the first call establishes the connection
    pub fn connect_lazy(config: &GrpcConfig) -> Result<Self, tonic::transport::Error> {
        let channel = Self::endpoint(config)?.connect_lazy();
        Ok(Self::from_channel(channel, config))
    }

    fn endpoint(config: &GrpcConfig) -> Result<Endpoint, tonic::transport::Error> {
        let endpoint = Endpoint::from_shared(config.endpoint.clone())?
            .connect_timeout(config.connect_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .tcp_nodelay(true);

        if endpoint.uri().scheme_str() == Some("https") {
            endpoint.tls_config(ClientTlsConfig::new())
        } else {
            Ok(endpoint)
        }
    }

    fn from_channel(channel: Channel, config: &GrpcConfig) -> Self {
        let mut client = UserServiceClient::new(channel);
        if config.enable_compression {
            client = client
                .send_compressed(CompressionEncoding::Gzip)
                .accept_compressed(CompressionEncoding::Gzip);
        }
        Self { client }
    }

    fn client(&self) -> UserServiceClient<Channel> {
        self.client.clone()
    }
}

#[async_trait]
impl IdentityClient for GrpcIdentityClient {
    async fn create_user(&self, request: Request<CreateUserRequest>) -> Result<CreateUserResponse, Status> {
        debug!("Calling {}/CreateUser", SERVICE_NAME);
        Ok(self.client().create_user(request).await?.into_inner())
    }

    async fn login_user(&self, request: Request<LoginUserRequest>) -> Result<LoginUserResponse, Status> {
        debug!("Calling {}/LoginUser", SERVICE_NAME);
        Ok(self.client().login_user(request).await?.into_inner())
    }

    async fn verify_user(&self, request: Request<VerifyUserRequest>) -> Result<VerifyUserResponse, Status> {
        debug!("Calling {}/VerifyUser", SERVICE_NAME);
        Ok(self.client().verify_user(request).await?.into_inner())
    }

    async fn auth_user(&self, request: Request<AuthUserRequest>) -> Result<AuthUserResponse, Status> {
        debug!("Calling {}/AuthUser", SERVICE_NAME);
        Ok(self.client().auth_user(request).await?.into_inner())
    }

    async fn send_verification_user(
        &self,
        request: Request<SendVerificationUserRequest>,
    ) -> Result<SendVerificationUserResponse, Status> {
        debug!("Calling {}/SendVerificationUser", SERVICE_NAME);
        Ok(self.client().send_verification_user(request).await?.into_inner())
    }

    async fn update_user_role(
        &self,
        request: Request<UpdateUserRoleRequest>,
    ) -> Result<UpdateUserRoleResponse, Status> {
        debug!("Calling {}/UpdateUserRole", SERVICE_NAME);
        Ok(self.client().update_user_role(request).await?.into_inner())
    }

    async fn reset_user_password(
        &self,
        request: Request<ResetUserPasswordRequest>,
    ) -> Result<ResetUserPasswordResponse, Status> {
        debug!("Calling {}/ResetUserPassword", SERVICE_NAME);
        Ok(self.client().reset_user_password(request).await?.into_inner())
    }

    async fn update_user_password(
        &self,
        request: Request<UpdateUserPasswordRequest>,
    ) -> Result<UpdateUserPasswordResponse, Status> {
        debug!("Calling {}/UpdateUserPassword", SERVICE_NAME);
        Ok(self.client().update_user_password(request).await?.into_inner())
    }

    async fn add_editor_user(
        &self,
        request: Request<AddEditorUserRequest>,
    ) -> Result<AddEditorUserResponse, Status> {
        debug!("Calling {}/AddEditorUser", SERVICE_NAME);
        Ok(self.client().add_editor_user(request).await?.into_inner())
    }

    async fn send_editor_user(
        &self,
        request: Request<SendEditorUserRequest>,
    ) -> Result<SendEditorUserResponse, Status> {
        debug!("Calling {}/SendEditorUser", SERVICE_NAME);
        Ok(self.client().send_editor_user(request).await?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Code;

    fn unreachable_config() -> GrpcConfig {
        GrpcConfig {
            // Port 9 (discard) on loopback is closed in test environments
            endpoint: "http://127.0.0.1:9".to_string(),
            connect_timeout: Duration::from_millis(200),
            tcp_keepalive: None,
            enable_compression: false,
        }
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = GrpcConfig {
            endpoint: "not a uri".to_string(),
            ..unreachable_config()
        };
        assert!(GrpcIdentityClient::connect_lazy(&config).is_err());
    }

    #[tokio::test]
    async fn test_eager_connect_fails_for_unreachable_backend() {
        assert!(GrpcIdentityClient::connect(&unreachable_config()).await.is_err());
    }

    #[tokio::test]
    async fn test_lazy_client_surfaces_transport_failure_as_status() {
        let client = GrpcIdentityClient::connect_lazy(&unreachable_config()).unwrap();
        let mut request = Request::new(AuthUserRequest {
            token: "abc".to_string(),
        });
        request.set_timeout(Duration::from_secs(1));

        let status = client.auth_user(request).await.unwrap_err();
        assert_ne!(status.code(), Code::NotFound);
        assert_ne!(status.code(), Code::InvalidArgument);
    }
}
