//! # User Route Handlers
//!
//! Every handler follows the same shape: decode the input (body, query or path), build the
//! remote message (adding the caller identity where the operation is scoped to it), make the
//! call through [`ServerState::invoke`], and answer with the `{"message": ...}` envelope.
//! Errors are classified by the time they reach a handler, so each one just propagates them.

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::auth::extract::Authenticated;
use crate::core::classifier::Operation;
use crate::core::error::{GatewayError, GatewayResult, MessageResponse};
use crate::core::types::{CallerIdentity, ProcessingContext};
use crate::gateway::extract::{JsonBody, TokenQuery, UserIdPath};
use crate::gateway::server::ServerState;
use crate::middleware::context::ROUTE_NOT_FOUND;
use crate::protocols::user_service::*;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserBody {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginUserBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordBody {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePasswordBody {
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateRoleBody {
    /// Accepted as a JSON number or a numeric string
    #[serde(deserialize_with = "user_id_from_number_or_string")]
    pub user_id: i64,
    pub role_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    /// Credential to send as `Authorization: Bearer <token>`
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn user_id_from_number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(id) => Ok(id),
        NumberOrString::String(id) => id.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse::new(text))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/v1/users/create",
    tag = "Users",
    request_body = CreateUserBody,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid request payload", body = MessageResponse),
        (status = 401, description = "User details rejected", body = MessageResponse),
        (status = 500, description = "Failed to create user", body = MessageResponse)
    )
)]
pub async fn create_user(
    State(state): State<ServerState>,
    context: ProcessingContext,
    JsonBody(body): JsonBody<CreateUserBody>,
) -> GatewayResult<(StatusCode, Json<MessageResponse>)> {
    let request = CreateUserRequest {
        name: body.name,
        email: body.email,
        password: body.password,
    };
    state
        .invoke(&context, &Operation::CREATE_USER, request, |request| {
            state.client().create_user(request)
        })
        .await?;

    info!(request_id = %context.request_id, "User created");
    Ok((StatusCode::CREATED, message("User created successfully")))
}

/// Log in and receive a bearer credential
///
/// The token is returned in the body and mirrored into the response's credential header.
#[utoipa::path(
    post,
    path = "/v1/users/login",
    tag = "Users",
    request_body = LoginUserBody,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid request payload", body = MessageResponse),
        (status = 401, description = "Invalid email or password", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Failed to login user", body = MessageResponse)
    )
)]
pub async fn login_user(
    State(state): State<ServerState>,
    context: ProcessingContext,
    JsonBody(body): JsonBody<LoginUserBody>,
) -> GatewayResult<Response> {
    let request = LoginUserRequest {
        email: body.email,
        password: body.password,
    };
    let LoginUserResponse { token } = state
        .invoke(&context, &Operation::LOGIN_USER, request, |request| {
            state.client().login_user(request)
        })
        .await?;

    if token.is_empty() {
        error!(request_id = %context.request_id, "User service issued an empty token");
        return Err(GatewayError::internal(Operation::LOGIN_USER.failed));
    }

    let credential = HeaderValue::from_str(&state.auth().credential(&token)).map_err(|e| {
        error!(request_id = %context.request_id, error = %e, "Issued token is not a valid header value");
        GatewayError::internal(Operation::LOGIN_USER.failed)
    })?;

    let body = LoginResponse {
        message: "User logged in successfully".to_string(),
        token,
    };
    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(state.auth().header().clone(), credential);
    Ok(response)
}

/// Verify a user with the token sent to their mail
#[utoipa::path(
    get,
    path = "/v1/users/verify",
    tag = "Users",
    params(("token" = String, Query, description = "Token sent to the user's mail for verification")),
    responses(
        (status = 200, description = "User verified", body = MessageResponse),
        (status = 400, description = "Token is needed", body = MessageResponse),
        (status = 401, description = "Token is expired", body = MessageResponse),
        (status = 404, description = "User not found or invalid token", body = MessageResponse),
        (status = 500, description = "Failed to verify user", body = MessageResponse)
    )
)]
pub async fn verify_user(
    State(state): State<ServerState>,
    context: ProcessingContext,
    TokenQuery(token): TokenQuery,
) -> GatewayResult<Json<MessageResponse>> {
    state
        .invoke(&context, &Operation::VERIFY_USER, VerifyUserRequest { token }, |request| {
            state.client().verify_user(request)
        })
        .await?;

    Ok(message("User verified"))
}

/// Ask the user service to mail a password reset
#[utoipa::path(
    post,
    path = "/v1/users/reset-password",
    tag = "Users",
    request_body = ResetPasswordBody,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid request payload", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Failed to reset user password", body = MessageResponse)
    )
)]
pub async fn reset_password(
    State(state): State<ServerState>,
    context: ProcessingContext,
    JsonBody(body): JsonBody<ResetPasswordBody>,
) -> GatewayResult<Json<MessageResponse>> {
    let request = ResetUserPasswordRequest { email: body.email };
    state
        .invoke(&context, &Operation::RESET_PASSWORD, request, |request| {
            state.client().reset_user_password(request)
        })
        .await?;

    Ok(message("Password reset successfully"))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/v1/users/update-password",
    tag = "Users",
    params(("token" = String, Query, description = "Password reset token")),
    request_body = UpdatePasswordBody,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Token is needed or invalid payload", body = MessageResponse),
        (status = 401, description = "Token is expired", body = MessageResponse),
        (status = 404, description = "User not found or invalid token", body = MessageResponse),
        (status = 500, description = "Failed to update user password", body = MessageResponse)
    )
)]
pub async fn update_password(
    State(state): State<ServerState>,
    context: ProcessingContext,
    TokenQuery(token): TokenQuery,
    JsonBody(body): JsonBody<UpdatePasswordBody>,
) -> GatewayResult<Json<MessageResponse>> {
    let request = UpdateUserPasswordRequest {
        token,
        password: body.password,
    };
    state
        .invoke(&context, &Operation::UPDATE_PASSWORD, request, |request| {
            state.client().update_user_password(request)
        })
        .await?;

    Ok(message("Password updated successfully"))
}

/// Change another user's role
#[utoipa::path(
    put,
    path = "/v1/users/update-role",
    tag = "Users",
    request_body = UpdateRoleBody,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Role updated", body = MessageResponse),
        (status = 400, description = "Invalid request payload", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 404, description = "User or role not found", body = MessageResponse),
        (status = 500, description = "Failed to update user role", body = MessageResponse)
    )
)]
pub async fn update_role(
    State(state): State<ServerState>,
    Authenticated { context, identity }: Authenticated,
    JsonBody(body): JsonBody<UpdateRoleBody>,
) -> GatewayResult<Json<MessageResponse>> {
    let request = UpdateUserRoleRequest {
        user_id: body.user_id,
        role_name: body.role_name,
        current_user: Some(AuthUserResponse::from(&identity)),
    };
    state
        .invoke(&context, &Operation::UPDATE_ROLE, request, |request| {
            state.client().update_user_role(request)
        })
        .await?;

    info!(
        request_id = %context.request_id,
        caller = identity.user_id,
        user_id = body.user_id,
        "User role updated"
    );
    Ok(message("User role updated successfully"))
}

/// Mail a fresh verification token to the caller
#[utoipa::path(
    get,
    path = "/v1/users/send-verify",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Verification sent", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 500, description = "Failed to send verification to user", body = MessageResponse)
    )
)]
pub async fn send_verification(
    State(state): State<ServerState>,
    Authenticated { context, identity }: Authenticated,
) -> GatewayResult<Json<MessageResponse>> {
    let request = SendVerificationUserRequest {
        current_user: Some(AuthUserResponse::from(&identity)),
    };
    state
        .invoke(&context, &Operation::SEND_VERIFICATION, request, |request| {
            state.client().send_verification_user(request)
        })
        .await?;

    Ok(message("Verification sent"))
}

/// Accept an editor invite
#[utoipa::path(
    put,
    path = "/v1/users/add-editor",
    tag = "Users",
    params(("token" = String, Query, description = "Editor invite token")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Editor added", body = MessageResponse),
        (status = 400, description = "Token is needed", body = MessageResponse),
        (status = 401, description = "Unauthorized or token expired", body = MessageResponse),
        (status = 404, description = "User not found or invalid token", body = MessageResponse),
        (status = 500, description = "Failed to add editor user", body = MessageResponse)
    )
)]
pub async fn add_editor(
    State(state): State<ServerState>,
    Authenticated { context, .. }: Authenticated,
    TokenQuery(token): TokenQuery,
) -> GatewayResult<Json<MessageResponse>> {
    state
        .invoke(&context, &Operation::ADD_EDITOR, AddEditorUserRequest { token }, |request| {
            state.client().add_editor_user(request)
        })
        .await?;

    Ok(message("Added editor user successfully"))
}

/// Invite a user to become an editor
#[utoipa::path(
    put,
    path = "/v1/users/send-editor-invite/{user_id}",
    tag = "Users",
    params(("user_id" = i64, Path, description = "User to invite")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Invite sent", body = MessageResponse),
        (status = 400, description = "Invalid user ID", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = MessageResponse),
        (status = 404, description = "User not found", body = MessageResponse),
        (status = 500, description = "Failed to send editor invite", body = MessageResponse)
    )
)]
pub async fn send_editor_invite(
    State(state): State<ServerState>,
    Authenticated { context, identity }: Authenticated,
    UserIdPath(user_id): UserIdPath,
) -> GatewayResult<Json<MessageResponse>> {
    let request = SendEditorUserRequest {
        user_id,
        current_user: Some(AuthUserResponse::from(&identity)),
    };
    state
        .invoke(&context, &Operation::SEND_EDITOR_INVITE, request, |request| {
            state.client().send_editor_user(request)
        })
        .await?;

    Ok(message("Sent editor invite successfully"))
}

/// The identity behind the presented credential
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = CallerIdentity),
        (status = 401, description = "Unauthorized", body = MessageResponse)
    )
)]
pub async fn current_user(Authenticated { identity, .. }: Authenticated) -> Json<CallerIdentity> {
    Json(identity)
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Gateway is running", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn route_not_found() -> GatewayError {
    GatewayError::not_found(ROUTE_NOT_FOUND)
}
