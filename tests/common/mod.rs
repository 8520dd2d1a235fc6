//! In-process stand-in for the user service, shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tonic::{Code, Request, Status};

use user_gateway::protocols::user_service::*;
use user_gateway::{GatewayConfig, GatewayServer, IdentityClient};

pub const VALID_TOKEN: &str = "token-abc";
pub const VERIFY_TOKEN: &str = "verify-123";

/// Fake user service
///
/// Accepts `VALID_TOKEN` as a credential, issues it on login, and records every call.
pub struct FakeUserService {
    pub identity: AuthUserResponse,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, (Code, String)>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    verify_tokens: Mutex<HashSet<String>>,
    last_current_user: Mutex<Option<AuthUserResponse>>,
    last_user_id: Mutex<Option<i64>>,
}

impl FakeUserService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            identity: AuthUserResponse {
                id: 7,
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                is_verified: true,
                role: "admin".to_string(),
            },
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            verify_tokens: Mutex::new(HashSet::from([VERIFY_TOKEN.to_string()])),
            last_current_user: Mutex::new(None),
            last_user_id: Mutex::new(None),
        })
    }

    /// Make `method` fail with the given status
    pub fn fail(&self, method: &'static str, code: Code, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(method, (code, message.to_string()));
    }

    /// Make `method` take `delay` before answering
    pub fn delay(&self, method: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(method, delay);
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn last_current_user(&self) -> Option<AuthUserResponse> {
        self.last_current_user.lock().unwrap().clone()
    }

    pub fn last_user_id(&self) -> Option<i64> {
        *self.last_user_id.lock().unwrap()
    }

    async fn enter(&self, method: &'static str) -> Result<(), Status> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;

        let delay = self.delays.lock().unwrap().get(method).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.failures.lock().unwrap().get(method) {
            Some((code, message)) => Err(Status::new(*code, message.clone())),
            None => Ok(()),
        }
    }

    fn record_current_user(&self, user: Option<AuthUserResponse>) {
        *self.last_current_user.lock().unwrap() = user;
    }
}

#[async_trait]
impl IdentityClient for FakeUserService {
    async fn create_user(&self, request: Request<CreateUserRequest>) -> Result<CreateUserResponse, Status> {
        self.enter("CreateUser").await?;
        if request.get_ref().name == "panic" {
            panic!("fake user service asked to panic");
        }
        Ok(CreateUserResponse {})
    }

    async fn login_user(&self, _request: Request<LoginUserRequest>) -> Result<LoginUserResponse, Status> {
        self.enter("LoginUser").await?;
        Ok(LoginUserResponse {
            token: VALID_TOKEN.to_string(),
        })
    }

    async fn verify_user(&self, request: Request<VerifyUserRequest>) -> Result<VerifyUserResponse, Status> {
        self.enter("VerifyUser").await?;
        // Tokens are single use
        if self.verify_tokens.lock().unwrap().remove(&request.get_ref().token) {
            Ok(VerifyUserResponse {})
        } else {
            Err(Status::not_found("data not found"))
        }
    }

    async fn auth_user(&self, request: Request<AuthUserRequest>) -> Result<AuthUserResponse, Status> {
        self.enter("AuthUser").await?;
        if request.get_ref().token == VALID_TOKEN {
            Ok(self.identity.clone())
        } else {
            Err(Status::invalid_argument("incorrect data received"))
        }
    }

    async fn send_verification_user(
        &self,
        request: Request<SendVerificationUserRequest>,
    ) -> Result<SendVerificationUserResponse, Status> {
        self.enter("SendVerificationUser").await?;
        self.record_current_user(request.into_inner().current_user);
        Ok(SendVerificationUserResponse {})
    }

    async fn update_user_role(
        &self,
        request: Request<UpdateUserRoleRequest>,
    ) -> Result<UpdateUserRoleResponse, Status> {
        self.enter("UpdateUserRole").await?;
        let request = request.into_inner();
        *self.last_user_id.lock().unwrap() = Some(request.user_id);
        self.record_current_user(request.current_user);
        Ok(UpdateUserRoleResponse {})
    }

    async fn reset_user_password(
        &self,
        _request: Request<ResetUserPasswordRequest>,
    ) -> Result<ResetUserPasswordResponse, Status> {
        self.enter("ResetUserPassword").await?;
        Ok(ResetUserPasswordResponse {})
    }

    async fn update_user_password(
        &self,
        _request: Request<UpdateUserPasswordRequest>,
    ) -> Result<UpdateUserPasswordResponse, Status> {
        self.enter("UpdateUserPassword").await?;
        Ok(UpdateUserPasswordResponse {})
    }

    async fn add_editor_user(
        &self,
        _request: Request<AddEditorUserRequest>,
    ) -> Result<AddEditorUserResponse, Status> {
        self.enter("AddEditorUser").await?;
        Ok(AddEditorUserResponse {})
    }

    async fn send_editor_user(
        &self,
        request: Request<SendEditorUserRequest>,
    ) -> Result<SendEditorUserResponse, Status> {
        self.enter("SendEditorUser").await?;
        let request = request.into_inner();
        *self.last_user_id.lock().unwrap() = Some(request.user_id);
        self.record_current_user(request.current_user);
        Ok(SendEditorUserResponse {})
    }
}

/// Full application (all layers) in front of `fake`
pub fn gateway(fake: &Arc<FakeUserService>) -> TestServer {
    gateway_with_config(fake, GatewayConfig::default())
}

pub fn gateway_with_config(fake: &Arc<FakeUserService>, config: GatewayConfig) -> TestServer {
    let client: Arc<dyn IdentityClient> = fake.clone();
    let server = GatewayServer::new(config, client).unwrap();
    TestServer::new(server.app()).unwrap()
}

pub fn bearer(token: &str) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}
