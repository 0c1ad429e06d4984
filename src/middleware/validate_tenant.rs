use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{bind_tenant, Principal, RequestContext};
use crate::error::ApiError;

/// Middleware that binds the authenticated principal to its school.
/// Runs after `jwt_auth_middleware` and turns the principal into the
/// [`RequestContext`] every protected handler reads.
pub async fn validate_tenant_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Get Principal from previous JWT middleware
    let principal = request
        .extensions()
        .get::<Principal>()
        .copied()
        .ok_or_else(|| {
            tracing::error!("tenant validation ran without an authenticated principal");
            ApiError::unauthorized()
        })?;

    let binding = bind_tenant(&principal, state.store.credentials()).await?;

    tracing::debug!(user = %principal.id, tenant = ?binding.tenant_id(), "tenant validated");
    request
        .extensions_mut()
        .insert(RequestContext { principal, binding });

    Ok(next.run(request).await)
}
