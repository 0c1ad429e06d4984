use axum::extract::{Extension, Path, State};
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::models::{Grade, GradeAudit};
use crate::handlers::protected::utils::{scope_for, visible};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Collection;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeHistory {
    pub grade: Grade,
    /// Oldest first
    pub audits: Vec<GradeAudit>,
}

/// GET /api/grades/:id/audit - Revision history of one grade
///
/// Staff only. The grade itself must be inside the caller's scope.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "grade": { "id": "uuid", "score": "9.0" },
///     "audits": [
///       {
///         "id": "uuid",
///         "studentGradeId": "uuid",
///         "oldValue": "7.0",
///         "newValue": "9.0",
///         "changedById": "uuid",
///         "changedAt": "2025-03-20T14:02:11Z"
///       }
///     ]
///   }
/// }
/// ```
pub async fn get(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<GradeHistory> {
    let scope = scope_for(&state, &context, Collection::Grades, None).await?;
    let grade = visible(state.records().find_grade(id).await?, &scope, "grade")?;
    let audits = state.records().list_grade_audits(grade.id).await?;

    Ok(ApiResponse::success(GradeHistory { grade, audits }))
}
