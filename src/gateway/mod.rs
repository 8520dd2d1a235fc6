pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod server;

pub use routes::build_router;
pub use server::{build_app, shutdown_signal, GatewayServer, ServerState};
