//! Store seams consumed by the access-control core.
//!
//! Every lookup here already applies the "still live" predicate: soft-deleted
//! and hard-absent rows both come back as `None` (or are left out of lists),
//! so callers never special-case soft deletion.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::*;
use crate::scope::ScopeFilter;

/// Users, password hashes and schools
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active, non-deleted user by id
    async fn find_active_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, DatabaseError>;

    /// Active, non-deleted user by email inside one school. `tenant_id = None`
    /// only matches tenant-less (global) accounts.
    async fn find_active_user_by_tenant_and_email(
        &self,
        tenant_id: Option<Uuid>,
        email: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError>;

    /// Active, non-deleted school by id
    async fn find_active_tenant_by_id(&self, id: Uuid) -> Result<Option<ActiveTenant>, DatabaseError>;
}

/// Relationship graph the scope resolver walks
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Classrooms with a currently open teacher link
    async fn active_teacher_classrooms(
        &self,
        teacher_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError>;

    async fn student_profile(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<StudentProfile>, DatabaseError>;

    /// ATIVA enrollments of one student
    async fn active_enrollments(
        &self,
        student_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<ActiveEnrollment>, DatabaseError>;

    /// Student ids linked to a guardian user
    async fn guardian_links(&self, guardian_id: Uuid, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError>;
}

/// Offset pagination, already clamped by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Page {
    pub fn new(limit: Option<u32>, offset: Option<u32>, default_limit: u32, max_limit: u32) -> Self {
        Self {
            limit: limit.unwrap_or(default_limit).clamp(1, max_limit.max(1)),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Optional narrowing a caller asks for on top of its scope
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilter {
    pub classroom_id: Option<Uuid>,
    pub assessment_id: Option<Uuid>,
    pub enrollment_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

/// Scoped reads over academic records. List methods must apply `scope`;
/// `find_*` methods return the row unfiltered so the caller can tell
/// "absent" from "out of scope".
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_classrooms(&self, scope: &ScopeFilter, page: Page) -> Result<Vec<Classroom>, DatabaseError>;
    async fn find_classroom(&self, id: Uuid) -> Result<Option<Classroom>, DatabaseError>;

    async fn list_assessments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Assessment>, DatabaseError>;
    async fn find_assessment(&self, id: Uuid) -> Result<Option<Assessment>, DatabaseError>;

    async fn list_enrollments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Enrollment>, DatabaseError>;
    async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError>;

    async fn list_grades(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Grade>, DatabaseError>;
    async fn find_grade(&self, id: Uuid) -> Result<Option<Grade>, DatabaseError>;
    async fn list_grade_audits(&self, grade_id: Uuid) -> Result<Vec<GradeAudit>, DatabaseError>;

    async fn list_attendance_sessions(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceSession>, DatabaseError>;
    async fn find_attendance_session(&self, id: Uuid) -> Result<Option<AttendanceSession>, DatabaseError>;

    async fn list_attendance_records(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError>;
}

/// Unit of work for grade writes. Dropping a transaction without calling
/// [`GradeTransaction::commit`] rolls every staged write back.
#[async_trait]
pub trait GradeStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn GradeTransaction>, DatabaseError>;
}

#[async_trait]
pub trait GradeTransaction: Send {
    /// Live grade for the pair, locked until commit/rollback
    async fn lock_live_grade(
        &mut self,
        tenant_id: Uuid,
        assessment_id: Uuid,
        enrollment_id: Uuid,
    ) -> Result<Option<Grade>, DatabaseError>;

    async fn insert_grade(&mut self, grade: NewGrade) -> Result<Grade, DatabaseError>;

    async fn append_audit(&mut self, entry: NewGradeAudit) -> Result<GradeAudit, DatabaseError>;

    async fn update_score(&mut self, grade_id: Uuid, score: Decimal) -> Result<Grade, DatabaseError>;

    async fn commit(&mut self) -> Result<(), DatabaseError>;
}

/// One backend serving every seam
#[async_trait]
pub trait Store: Send + Sync {
    fn credentials(&self) -> &dyn CredentialStore;
    fn relationships(&self) -> &dyn RelationshipStore;
    fn records(&self) -> &dyn RecordStore;
    fn grades(&self) -> &dyn GradeStore;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_bounds() {
        assert_eq!(Page::new(None, None, 50, 100), Page { limit: 50, offset: 0 });
        assert_eq!(Page::new(Some(1000), Some(20), 50, 100), Page { limit: 100, offset: 20 });
        assert_eq!(Page::new(Some(0), None, 50, 100).limit, 1);
    }
}
