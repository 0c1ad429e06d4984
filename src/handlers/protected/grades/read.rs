use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::Grade;
use crate::handlers::protected::utils::{scope_for, visible, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/grades - Live grades visible to the caller
///
/// Filter with `assessmentId`, `enrollmentId` or `classroomId`. A teacher sees
/// every grade of the classrooms they teach; students and guardians only
/// grades attached to their own enrollments.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     {
///       "id": "uuid",
///       "tenantId": "uuid",
///       "assessmentId": "uuid",
///       "enrollmentId": "uuid",
///       "classroomId": "uuid",
///       "score": "8.5",
///       "createdAt": "2025-03-15T10:00:00Z",
///       "updatedAt": "2025-03-15T10:00:00Z"
///     }
///   ],
///   "meta": { "limit": 50, "offset": 0, "count": 1 }
/// }
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Grade>> {
    let scope = scope_for(&state, &context, Collection::Grades, query.tenant).await?;
    let page = query.page(&state);
    let rows = state
        .records()
        .list_grades(&scope, &query.filter(), page)
        .await?;
    Ok(ApiResponse::paged(rows, page))
}

/// GET /api/grades/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Grade> {
    let scope = scope_for(&state, &context, Collection::Grades, None).await?;
    let row = state.records().find_grade(id).await?;
    Ok(ApiResponse::success(visible(row, &scope, "grade")?))
}
