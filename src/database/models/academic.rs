use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::scope::{ScopeTarget, Scoped};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Ativa,
    Transferida,
    Cancelada,
    Concluida,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Ativa => "ATIVA",
            EnrollmentStatus::Transferida => "TRANSFERIDA",
            EnrollmentStatus::Cancelada => "CANCELADA",
            EnrollmentStatus::Concluida => "CONCLUIDA",
        }
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "ATIVA" => Ok(EnrollmentStatus::Ativa),
            "TRANSFERIDA" => Ok(EnrollmentStatus::Transferida),
            "CANCELADA" => Ok(EnrollmentStatus::Cancelada),
            "CONCLUIDA" => Ok(EnrollmentStatus::Concluida),
            _ => Err(UnknownStatus(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Presente,
    Falta,
    Justificada,
}

impl TryFrom<String> for AttendanceStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "PRESENTE" => Ok(AttendanceStatus::Presente),
            "FALTA" => Ok(AttendanceStatus::Falta),
            "JUSTIFICADA" => Ok(AttendanceStatus::Justificada),
            _ => Err(UnknownStatus(value)),
        }
    }
}

// ---
// Relationship edges (read by the scope resolver, never written by it)
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeacherClassroomLink {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub teacher_id: Uuid,
    pub classroom_id: Uuid,
    pub subject_id: Uuid,
    pub valid_from: DateTime<Utc>,
    pub valid_to: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TeacherClassroomLink {
    /// An open `valid_to` means the assignment is current
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.deleted_at.is_none()
            && self.valid_from <= now
            && self.valid_to.map_or(true, |until| until > now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GuardianStudentLink {
    pub tenant_id: Uuid,
    pub guardian_id: Uuid,
    pub student_id: Uuid,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Student profile, 1:1 with a STUDENT user inside one school
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub student_id: Uuid,
    pub classroom_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    pub enrolled_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Ativa && self.deleted_at.is_none()
    }
}

/// (enrollment, classroom) pair of an ATIVA enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEnrollment {
    pub id: Uuid,
    pub classroom_id: Uuid,
}

// ---
// Academic records read through the scope filter
// ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub school_year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub classroom_id: Uuid,
    pub subject_id: Uuid,
    pub title: String,
    pub max_score: Option<Decimal>,
    pub held_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub classroom_id: Uuid,
    pub held_on: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub session_id: Uuid,
    pub classroom_id: Uuid,
    pub enrollment_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
}

impl Scoped for Classroom {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.id),
            enrollment_id: None,
        }
    }
}

impl Scoped for Assessment {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.classroom_id),
            enrollment_id: None,
        }
    }
}

impl Scoped for Enrollment {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.classroom_id),
            enrollment_id: Some(self.id),
        }
    }
}

impl Scoped for AttendanceSession {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.classroom_id),
            enrollment_id: None,
        }
    }
}

impl Scoped for AttendanceRecord {
    fn scope_target(&self) -> ScopeTarget {
        ScopeTarget {
            tenant_id: self.tenant_id,
            classroom_id: Some(self.classroom_id),
            enrollment_id: Some(self.enrollment_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn link(valid_to: Option<DateTime<Utc>>) -> TeacherClassroomLink {
        TeacherClassroomLink {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            classroom_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            valid_from: Utc::now() - Duration::days(30),
            valid_to,
            deleted_at: None,
        }
    }

    #[test]
    fn open_link_is_active() {
        assert!(link(None).is_active_at(Utc::now()));
    }

    #[test]
    fn closed_link_is_inactive() {
        let closed = link(Some(Utc::now() - Duration::days(1)));
        assert!(!closed.is_active_at(Utc::now()));
    }

    #[test]
    fn future_end_is_still_active() {
        assert!(link(Some(Utc::now() + Duration::days(1))).is_active_at(Utc::now()));
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!(
            EnrollmentStatus::try_from("ATIVA".to_string()).unwrap(),
            EnrollmentStatus::Ativa
        );
        assert!(AttendanceStatus::try_from("presente".to_string()).is_err());
    }
}
