pub mod context;
pub mod error_handling;

pub use context::request_context;
pub use error_handling::handle_panic;
