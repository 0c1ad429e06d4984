//! Audited grade writes.
//!
//! A grade moves absent -> recorded -> revised -> revised ... Only a revision
//! writes a [`GradeAudit`], and it commits together with the new score.

use std::future::Future;
use std::pin::Pin;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::models::{Grade, GradeAudit, NewGrade, NewGradeAudit};
use crate::database::{DatabaseError, GradeStore, GradeTransaction};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("a grade for this assessment and enrollment was created concurrently")]
    Conflict,

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("grade write failed: {0}")]
    Store(DatabaseError),
}

impl From<DatabaseError> for LedgerError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => LedgerError::Conflict,
            other => LedgerError::Store(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpsertGrade {
    pub tenant_id: Uuid,
    pub assessment_id: Uuid,
    pub enrollment_id: Uuid,
    /// Classroom shared by the assessment and the enrollment
    pub classroom_id: Uuid,
    pub score: Decimal,
    pub changed_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "outcome")]
pub enum GradeOutcome {
    /// First grade for the pair, no audit
    Recorded { grade: Grade },
    /// Score overwritten, one audit row
    Revised { grade: Grade, audit: GradeAudit },
    /// Same score as stored, nothing written
    Unchanged { grade: Grade },
}

impl GradeOutcome {
    pub fn grade(&self) -> &Grade {
        match self {
            GradeOutcome::Recorded { grade }
            | GradeOutcome::Revised { grade, .. }
            | GradeOutcome::Unchanged { grade } => grade,
        }
    }

    /// True when a new grade row came into existence
    pub fn is_created(&self) -> bool {
        matches!(self, GradeOutcome::Recorded { .. })
    }
}

/// Decimal places a stored score keeps (`numeric(5, 2)`)
pub const SCORE_SCALE: u32 = 2;

/// Largest score the `numeric(5, 2)` column holds
pub fn max_storable_score() -> Decimal {
    Decimal::new(99_999, SCORE_SCALE)
}

/// Score must be non-negative, fit the stored precision exactly and, when the
/// assessment has one, be at most its maximum
pub fn validate_score(score: Decimal, max_score: Option<Decimal>) -> Result<(), LedgerError> {
    if score < Decimal::ZERO {
        return Err(LedgerError::InvalidScore(format!("{} is negative", score)));
    }
    // 8.50 is fine, 8.555 would be rounded on write
    if score.normalize().scale() > SCORE_SCALE {
        return Err(LedgerError::InvalidScore(format!(
            "{} has more than {} decimal places",
            score, SCORE_SCALE
        )));
    }
    if score > max_storable_score() {
        return Err(LedgerError::InvalidScore(format!(
            "{} exceeds the largest storable score {}",
            score,
            max_storable_score()
        )));
    }
    if let Some(max) = max_score {
        if score > max {
            return Err(LedgerError::InvalidScore(format!("{} exceeds maximum {}", score, max)));
        }
    }
    Ok(())
}

pub type WorkFuture<'t, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 't>>;

/// Run `work` inside one grade transaction. Commits when it returns `Ok`;
/// any error drops the transaction, which rolls every write back.
pub async fn in_unit_of_work<T, F>(store: &dyn GradeStore, work: F) -> Result<T, LedgerError>
where
    F: for<'t> FnOnce(&'t mut dyn GradeTransaction) -> WorkFuture<'t, T>,
{
    let mut tx = store.begin().await?;
    let value = work(tx.as_mut()).await?;
    tx.commit().await?;
    Ok(value)
}

pub async fn upsert_grade(store: &dyn GradeStore, request: UpsertGrade) -> Result<GradeOutcome, LedgerError> {
    let outcome = in_unit_of_work(store, move |tx| apply(tx, request)).await?;

    match &outcome {
        GradeOutcome::Recorded { grade } => {
            info!(grade = %grade.id, score = %grade.score, "grade recorded")
        }
        GradeOutcome::Revised { grade, audit } => info!(
            grade = %grade.id,
            old = %audit.old_value,
            new = %audit.new_value,
            changed_by = %audit.changed_by_id,
            "grade revised"
        ),
        GradeOutcome::Unchanged { grade } => debug!(grade = %grade.id, "grade unchanged"),
    }

    Ok(outcome)
}

// Read-modify-write under the row lock taken by lock_live_grade
fn apply(tx: &mut dyn GradeTransaction, request: UpsertGrade) -> WorkFuture<'_, GradeOutcome> {
    Box::pin(async move {
        let existing = tx
            .lock_live_grade(request.tenant_id, request.assessment_id, request.enrollment_id)
            .await?;

        let Some(existing) = existing else {
            let grade = tx
                .insert_grade(NewGrade {
                    tenant_id: request.tenant_id,
                    assessment_id: request.assessment_id,
                    enrollment_id: request.enrollment_id,
                    classroom_id: request.classroom_id,
                    score: request.score,
                })
                .await?;
            return Ok(GradeOutcome::Recorded { grade });
        };

        if existing.score == request.score {
            return Ok(GradeOutcome::Unchanged { grade: existing });
        }

        let audit = tx
            .append_audit(NewGradeAudit {
                tenant_id: request.tenant_id,
                student_grade_id: existing.id,
                old_value: existing.score,
                new_value: request.score,
                changed_by_id: request.changed_by,
            })
            .await?;
        let grade = tx.update_score(existing.id, request.score).await?;

        Ok(GradeOutcome::Revised { grade, audit })
    })
}
