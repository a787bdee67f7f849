pub mod auth;
pub mod rate_limit;

pub use auth::{admin_auth_middleware, AdminUser, SessionClaims};
pub use rate_limit::intake_rate_limit_middleware;
