use axum::{extract::Request, middleware::Next, response::Response};

use crate::auth::{authorize, Operation, RequestContext};
use crate::error::ApiError;

/// Role allow-list check for one route. Installed per route with
/// `route_layer`, so it always runs after the tenant middleware.
pub async fn authorize_operation(
    operation: Operation,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = request.extensions().get::<RequestContext>().ok_or_else(|| {
        tracing::error!(?operation, "authorization ran without a request context");
        ApiError::unauthorized()
    })?;

    authorize(&context.principal, operation)?;
    Ok(next.run(request).await)
}
