//! Authentication and the per-request access pipeline:
//! token -> principal -> tenant binding -> role check.

pub mod authenticator;
pub mod authorizer;
pub mod context;
pub mod error;
pub mod login;
pub mod password;
pub mod tenant_guard;
pub mod token;

pub use authenticator::{authenticate, extract_bearer};
pub use authorizer::{authorize, Operation};
pub use context::{Principal, RequestContext, TenantBinding};
pub use error::AccessError;
pub use login::{LoginError, LoginRequest, LoginService, LoginSuccess};
pub use tenant_guard::{bind_tenant, require_active_tenant};
pub use token::{IssuedToken, TokenCodec, TokenError, VerifiedToken};
