use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::{ScopeTarget, Scoped};

/// Live grade for one (assessment, enrollment) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub assessment_id: Uuid,
    pub enrollment_id: Uuid,
    /// Classroom of the assessment, carried for scope checks
    pub classroom_id: Uuid,
    pub score: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGrade {
    pub tenant_id: Uuid,
    pub assessment_id: Uuid,
    pub enrollment_id: Uuid,
    pub classroom_id: Uuid,
    pub score: Decimal,
}

/// Immutable record of one overwrite. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GradeAudit {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_grade_id: Uuid,
    pub old_value: Decimal,
    pub new_value: Decimal,
    pub changed_by_id: Uuid,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewGradeAudit {
    pub tenant_id: Uuid,
    pub student_grade_id: Uuid,
    pub old_value: Decimal,
    pub new_value: Decimal,
    pub changed_by_id: Uuid,
}

impl Scoped for Grade {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.classroom_id),
            enrollment_id: Some(self.enrollment_id),
        }
    }
}
