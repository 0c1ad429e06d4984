use axum::extract::Extension;

use crate::auth::RequestContext;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - Caller as the middleware chain resolved it
///
/// Role and tenant come from the credential store, not from the token, so a
/// role change shows up here on the very next request.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "principal": { "id": "uuid", "tenantId": "uuid", "role": "TEACHER" },
///     "binding": { "kind": "school", "id": "uuid", "name": "Escola Estadual Centro" }
///   }
/// }
/// ```
pub async fn get(Extension(context): Extension<RequestContext>) -> ApiResult<RequestContext> {
    Ok(ApiResponse::success(context))
}
