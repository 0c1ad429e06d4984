pub mod auth;
pub mod authorize;
pub mod json;
pub mod response;
pub mod validate_tenant;

pub use auth::jwt_auth_middleware;
pub use authorize::authorize_operation;
pub use json::ApiJson;
pub use response::{ApiResponse, ApiResult};
pub use validate_tenant::validate_tenant_middleware;
