use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::Enrollment;
use crate::handlers::protected::utils::{scope_for, visible, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/enrollments - Enrollments visible to the caller
///
/// Students and guardians only ever see their own enrollments here, even
/// when filtering by `classroomId`.
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Enrollment>> {
    let scope = scope_for(&state, &context, Collection::Enrollments, query.tenant).await?;
    let page = query.page(&state);
    let rows = state
        .records()
        .list_enrollments(&scope, &query.filter(), page)
        .await?;
    Ok(ApiResponse::paged(rows, page))
}

/// GET /api/enrollments/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Enrollment> {
    let scope = scope_for(&state, &context, Collection::Enrollments, None).await?;
    let row = state.records().find_enrollment(id).await?;
    Ok(ApiResponse::success(visible(row, &scope, "enrollment")?))
}
