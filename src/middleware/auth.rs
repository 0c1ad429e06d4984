use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{authenticate, extract_bearer};
use crate::error::ApiError;

/// Bearer token -> live [`crate::auth::Principal`] in request extensions
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(request.headers())?;
    let principal = authenticate(token, &state.codec, state.store.credentials()).await?;

    tracing::debug!(user = %principal.id, role = %principal.role, "authenticated");
    request.extensions_mut().insert(principal);

    Ok(next.run(request).await)
}
