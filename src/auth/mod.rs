pub mod extract;
pub mod middleware;

pub use extract::Authenticated;
pub use middleware::{auth_middleware, authenticate, BearerAuth};
