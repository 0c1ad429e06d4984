use axum::extract::{Extension, Query, State};

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::AttendanceRecord;
use crate::handlers::protected::utils::{scope_for, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/attendance/records - Per-student presence marks
///
/// Filter with `sessionId`, `classroomId` or `enrollmentId`. Students and
/// guardians get only the marks of their own enrollments.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": [
///     { "id": "uuid", "sessionId": "uuid", "enrollmentId": "uuid", "status": "PRESENTE" }
///   ]
/// }
/// ```
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<AttendanceRecord>> {
    let scope = scope_for(&state, &context, Collection::AttendanceRecords, query.tenant).await?;
    let page = query.page(&state);
    let rows = state
        .records()
        .list_attendance_records(&scope, &query.filter(), page)
        .await?;
    Ok(ApiResponse::paged(rows, page))
}
