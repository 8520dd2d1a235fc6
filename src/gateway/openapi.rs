//! OpenAPI document for the HTTP surface, served at `/swagger/doc.json` behind the Swagger UI

use utoipa::{
    openapi::{
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
        Components,
    },
    Modify, OpenApi,
};

use crate::core::error::MessageResponse;
use crate::core::types::CallerIdentity;
use crate::gateway::handlers::{
    self, CreateUserBody, HealthResponse, LoginResponse, LoginUserBody, ResetPasswordBody,
    UpdatePasswordBody, UpdateRoleBody,
};

pub const BEARER_SECURITY: &str = "bearer_auth";

pub const SWAGGER_UI_PATH: &str = "/swagger";
pub const OPENAPI_JSON_PATH: &str = "/swagger/doc.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "User Gateway API",
        description = "HTTP front for the user service"
    ),
    paths(
        handlers::create_user,
        handlers::login_user,
        handlers::verify_user,
        handlers::reset_password,
        handlers::update_password,
        handlers::update_role,
        handlers::send_verification,
        handlers::add_editor,
        handlers::send_editor_invite,
        handlers::current_user,
        handlers::health,
    ),
    components(schemas(
        MessageResponse,
        CallerIdentity,
        CreateUserBody,
        LoginUserBody,
        LoginResponse,
        ResetPasswordBody,
        UpdatePasswordBody,
        UpdateRoleBody,
        HealthResponse,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "Users", description = "User management"),
        (name = "Health", description = "Probes")
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Components::new);
        components.add_security_scheme(
            BEARER_SECURITY,
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/users/create",
            "/v1/users/login",
            "/v1/users/verify",
            "/v1/users/reset-password",
            "/v1/users/update-password",
            "/v1/users/update-role",
            "/v1/users/send-verify",
            "/v1/users/add-editor",
            "/v1/users/send-editor-invite/{user_id}",
            "/v1/users/me",
            "/health",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn test_bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key(BEARER_SECURITY));
    }
}
