use axum::extract::{Extension, State};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::handlers::protected::utils::{scope_for, visible};
use crate::ledger::{upsert_grade, validate_score, GradeOutcome, UpsertGrade};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::types::Collection;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBody {
    pub assessment_id: Uuid,
    pub enrollment_id: Uuid,
    pub score: Decimal,
}

/// PUT /api/grades - Record or revise the grade of one enrollment on one assessment
///
/// Request Body:
/// ```json
/// { "assessmentId": "uuid", "enrollmentId": "uuid", "score": "8.5" }
/// ```
///
/// First write answers 201 with `"outcome": "recorded"`. Overwriting answers
/// 200 with `"outcome": "revised"` and the audit row written alongside; the
/// same score again answers 200 with `"outcome": "unchanged"`.
///
/// Expected Output:
/// ```json
/// {
///   "success": true,
///   "data": {
///     "outcome": "revised",
///     "grade": { "id": "uuid", "score": "8.5" },
///     "audit": { "oldValue": "7.0", "newValue": "8.5", "changedById": "uuid" }
///   }
/// }
/// ```
pub async fn put(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    ApiJson(body): ApiJson<GradeBody>,
) -> ApiResult<GradeOutcome> {
    let records = state.records();

    let assessment_scope = scope_for(&state, &context, Collection::Assessments, None).await?;
    let assessment = visible(
        records.find_assessment(body.assessment_id).await?,
        &assessment_scope,
        "assessment",
    )?;

    let enrollment_scope = scope_for(&state, &context, Collection::Enrollments, None).await?;
    let enrollment = visible(
        records.find_enrollment(body.enrollment_id).await?,
        &enrollment_scope,
        "enrollment",
    )?;

    if enrollment.classroom_id != assessment.classroom_id || enrollment.tenant_id != assessment.tenant_id {
        return Err(ApiError::bad_request(
            "enrollment does not belong to the assessment's classroom",
        ));
    }

    validate_score(body.score, assessment.max_score)?;

    let outcome = upsert_grade(
        state.store.grades(),
        UpsertGrade {
            tenant_id: assessment.tenant_id,
            assessment_id: assessment.id,
            enrollment_id: enrollment.id,
            classroom_id: assessment.classroom_id,
            score: body.score,
            changed_by: context.principal.id,
        },
    )
    .await?;

    if outcome.is_created() {
        Ok(ApiResponse::created(outcome))
    } else {
        Ok(ApiResponse::success(outcome))
    }
}
