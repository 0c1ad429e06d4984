use axum::extract::{Extension, Path, Query, State};
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::AttendanceSession;
use crate::handlers::protected::utils::{scope_for, visible, ListQuery};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

/// GET /api/attendance/sessions - Roll-call sessions of visible classrooms
pub async fn list(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<AttendanceSession>> {
    let scope = scope_for(&state, &context, Collection::AttendanceSessions, query.tenant).await?;
    let page = query.page(&state);
    let rows = state
        .records()
        .list_attendance_sessions(&scope, &query.filter(), page)
        .await?;
    Ok(ApiResponse::paged(rows, page))
}

/// GET /api/attendance/sessions/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<AttendanceSession> {
    let scope = scope_for(&state, &context, Collection::AttendanceSessions, None).await?;
    let row = state.records().find_attendance_session(id).await?;
    Ok(ApiResponse::success(visible(row, &scope, "attendance session")?))
}
