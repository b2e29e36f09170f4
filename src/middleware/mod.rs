pub mod auth;
pub mod json_body;

pub use auth::require_bearer;
pub use json_body::JsonBody;
