use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::Classroom;
use crate::handlers::protected::utils::{scope_for, visible, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/classrooms - Classrooms visible to the caller
///
/// Teachers see classrooms with an open assignment, students and guardians
/// the classrooms of active enrollments, secretaries their whole school.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     { "id": "uuid", "tenantId": "uuid", "name": "7A", "schoolYear": 2025 }
///   ],
///   "meta": { "limit": 50, "offset": 0, "count": 1 }
/// }
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Classroom>> {
    let scope = scope_for(&state, &context, Collection::Classrooms, query.tenant).await?;
    let page = query.page(&state);
    let rows = state.records().list_classrooms(&scope, page).await?;
    Ok(ApiResponse::paged(rows, page))
}

/// GET /api/classrooms/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Classroom> {
    let scope = scope_for(&state, &context, Collection::Classrooms, None).await?;
    let row = state.records().find_classroom(id).await?;
    Ok(ApiResponse::success(visible(row, &scope, "classroom")?))
}
