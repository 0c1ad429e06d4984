use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::Assessment;
use crate::handlers::protected::utils::{scope_for, visible, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/assessments - Assessments of the classrooms visible to the caller
///
/// Accepts `classroomId`, `limit`, `offset` and (global admins) `tenant`.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     {
///       "id": "uuid",
///       "classroomId": "uuid",
///       "title": "Prova 1",
///       "maxScore": "10.00",
///       "heldOn": "2025-03-14"
///     }
///   ]
/// }
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Assessment>> {
    let scope = scope_for(&state, &context, Collection::Assessments, query.tenant).await?;
    let page = query.page(&state);
    let rows = state
        .records()
        .list_assessments(&scope, &query.filter(), page)
        .await?;
    Ok(ApiResponse::paged(rows, page))
}

/// GET /api/assessments/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Assessment> {
    let scope = scope_for(&state, &context, Collection::Assessments, None).await?;
    let row = state.records().find_assessment(id).await?;
    Ok(ApiResponse::success(visible(row, &scope, "assessment")?))
}
