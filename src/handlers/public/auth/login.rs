use axum::extract::State;

use crate::app::AppState;
use crate::auth::{LoginRequest, LoginSuccess};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};

/// POST /auth/login - Exchange email and password for a session token
///
/// Expected Input:
/// ```json
/// {
///   "tenantId": "uuid",       // Omit for the global administrator
///   "email": "prof@escola.br",
///   "password": "string"
/// }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "success": true,
///   "data": {
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expiresAt": "2025-03-15T18:00:00Z",
///     "user": { "id": "uuid", "tenantId": "uuid", "role": "TEACHER" }
///   }
/// }
/// ```
///
/// Unknown email, wrong password and inactive school all answer 401 with the
/// same body. Too many attempts for one `tenant:email` answer 429.
pub async fn post(State(state): State<AppState>, ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<LoginSuccess> {
    let session = state.login.login(body, state.store.credentials()).await?;
    Ok(ApiResponse::success(session))
}
