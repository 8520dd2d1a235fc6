//! Route table
//!
//! Protected routes get the authentication middleware through `route_layer`, so it only runs
//! for requests that matched one of them; everything unmatched falls through to the 404
//! fallback. The Swagger UI is mounted at `/swagger` and reads `/swagger/doc.json`.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::middleware::auth_middleware;
use crate::gateway::handlers;
use crate::gateway::openapi::{ApiDoc, OPENAPI_JSON_PATH, SWAGGER_UI_PATH};
use crate::gateway::server::ServerState;

pub const USERS_PREFIX: &str = "/v1/users";

pub fn build_router(state: ServerState) -> Router {
    let public = Router::new()
        .route("/create", post(handlers::create_user))
        .route("/login", post(handlers::login_user))
        .route("/verify", get(handlers::verify_user))
        .route("/reset-password", post(handlers::reset_password))
        .route("/update-password", post(handlers::update_password));

    let protected = Router::new()
        .route("/update-role", put(handlers::update_role))
        .route("/send-verify", get(handlers::send_verification))
        .route("/add-editor", put(handlers::add_editor))
        .route("/send-editor-invite/:user_id", put(handlers::send_editor_invite))
        .route("/me", get(handlers::current_user))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest(USERS_PREFIX, public.merge(protected))
        .route("/health", get(handlers::health))
        .merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
        .fallback(handlers::route_not_found)
        .with_state(state)
}
