//! In-process store used by the test suite and for running the API without
//! Postgres. Same contracts as [`super::postgres::PgStore`].

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::*;
use super::store::*;
use crate::scope::{ScopeFilter, Scoped};

#[derive(Debug, Default)]
struct MemoryState {
    schools: Vec<School>,
    users: Vec<User>,
    students: Vec<StudentProfile>,
    teacher_links: Vec<TeacherClassroomLink>,
    guardian_links: Vec<GuardianStudentLink>,
    classrooms: Vec<Classroom>,
    assessments: Vec<Assessment>,
    enrollments: Vec<Enrollment>,
    grades: Vec<Grade>,
    grade_audits: Vec<GradeAudit>,
    attendance_sessions: Vec<AttendanceSession>,
    attendance_records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    // Serializes grade transactions the way a row lock would
    grade_writes: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_school(&self, school: School) {
        self.write().schools.push(school);
    }

    pub fn insert_user(&self, user: User) {
        self.write().users.push(user);
    }

    pub fn insert_student(&self, student: StudentProfile) {
        self.write().students.push(student);
    }

    pub fn link_teacher(&self, link: TeacherClassroomLink) {
        self.write().teacher_links.push(link);
    }

    pub fn link_guardian(&self, link: GuardianStudentLink) {
        self.write().guardian_links.push(link);
    }

    pub fn insert_classroom(&self, classroom: Classroom) {
        self.write().classrooms.push(classroom);
    }

    pub fn insert_assessment(&self, assessment: Assessment) {
        self.write().assessments.push(assessment);
    }

    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        self.write().enrollments.push(enrollment);
    }

    pub fn insert_grade(&self, grade: Grade) {
        self.write().grades.push(grade);
    }

    pub fn insert_attendance_session(&self, session: AttendanceSession) {
        self.write().attendance_sessions.push(session);
    }

    pub fn insert_attendance_record(&self, record: AttendanceRecord) {
        self.write().attendance_records.push(record);
    }

    /// Mutate a user in place (deactivation, soft delete, role change)
    pub fn update_user(&self, id: Uuid, change: impl FnOnce(&mut User)) -> bool {
        let mut state = self.write();
        match state.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                change(user);
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn update_school(&self, id: Uuid, change: impl FnOnce(&mut School)) -> bool {
        let mut state = self.write();
        match state.schools.iter_mut().find(|s| s.id == id) {
            Some(school) => {
                change(school);
                school.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn grade_audits(&self) -> Vec<GradeAudit> {
        self.read().grade_audits.clone()
    }

    pub fn grades(&self) -> Vec<Grade> {
        self.read().grades.clone()
    }
}

fn select_page<'a, T>(
    rows: impl Iterator<Item = &'a T>,
    scope: &ScopeFilter,
    matches: impl Fn(&T) -> bool,
    page: Page,
) -> Vec<T>
where
    T: Scoped + Clone + 'a,
{
    if scope.is_empty() {
        return Vec::new();
    }
    rows.filter(|row| scope.permits(&row.scope_target()) && matches(row))
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

fn opt_eq(wanted: Option<Uuid>, actual: Uuid) -> bool {
    wanted.map_or(true, |id| id == actual)
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_active_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, DatabaseError> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.id == id && u.is_live())
            .map(User::identity))
    }

    async fn find_active_user_by_tenant_and_email(
        &self,
        tenant_id: Option<Uuid>,
        email: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.tenant_id == tenant_id && u.email.eq_ignore_ascii_case(email) && u.is_live())
            .map(User::credentials))
    }

    async fn find_active_tenant_by_id(&self, id: Uuid) -> Result<Option<ActiveTenant>, DatabaseError> {
        Ok(self
            .read()
            .schools
            .iter()
            .find(|s| s.id == id && s.is_live())
            .map(|s| ActiveTenant {
                id: s.id,
                name: s.name.clone(),
            }))
    }
}

#[async_trait]
impl RelationshipStore for MemoryStore {
    async fn active_teacher_classrooms(
        &self,
        teacher_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let now = Utc::now();
        let mut ids: Vec<Uuid> = self
            .read()
            .teacher_links
            .iter()
            .filter(|l| l.teacher_id == teacher_id && l.tenant_id == tenant_id && l.is_active_at(now))
            .map(|l| l.classroom_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn student_profile(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<StudentProfile>, DatabaseError> {
        Ok(self
            .read()
            .students
            .iter()
            .find(|s| s.user_id == user_id && s.tenant_id == tenant_id && s.deleted_at.is_none())
            .cloned())
    }

    async fn active_enrollments(
        &self,
        student_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<ActiveEnrollment>, DatabaseError> {
        Ok(self
            .read()
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.tenant_id == tenant_id && e.is_active())
            .map(|e| ActiveEnrollment {
                id: e.id,
                classroom_id: e.classroom_id,
            })
            .collect())
    }

    async fn guardian_links(&self, guardian_id: Uuid, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        Ok(self
            .read()
            .guardian_links
            .iter()
            .filter(|l| l.guardian_id == guardian_id && l.tenant_id == tenant_id && l.deleted_at.is_none())
            .map(|l| l.student_id)
            .collect())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_classrooms(&self, scope: &ScopeFilter, page: Page) -> Result<Vec<Classroom>, DatabaseError> {
        Ok(select_page(self.read().classrooms.iter(), scope, |_| true, page))
    }

    async fn find_classroom(&self, id: Uuid) -> Result<Option<Classroom>, DatabaseError> {
        Ok(self.read().classrooms.iter().find(|c| c.id == id).cloned())
    }

    async fn list_assessments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Assessment>, DatabaseError> {
        Ok(select_page(
            self.read().assessments.iter(),
            scope,
            |a| opt_eq(filter.classroom_id, a.classroom_id),
            page,
        ))
    }

    async fn find_assessment(&self, id: Uuid) -> Result<Option<Assessment>, DatabaseError> {
        Ok(self.read().assessments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_enrollments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        Ok(select_page(
            self.read().enrollments.iter().filter(|e| e.deleted_at.is_none()),
            scope,
            |e| opt_eq(filter.classroom_id, e.classroom_id) && opt_eq(filter.enrollment_id, e.id),
            page,
        ))
    }

    async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        Ok(self
            .read()
            .enrollments
            .iter()
            .find(|e| e.id == id && e.deleted_at.is_none())
            .cloned())
    }

    async fn list_grades(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Grade>, DatabaseError> {
        Ok(select_page(
            self.read().grades.iter(),
            scope,
            |g| {
                opt_eq(filter.classroom_id, g.classroom_id)
                    && opt_eq(filter.assessment_id, g.assessment_id)
                    && opt_eq(filter.enrollment_id, g.enrollment_id)
            },
            page,
        ))
    }

    async fn find_grade(&self, id: Uuid) -> Result<Option<Grade>, DatabaseError> {
        Ok(self.read().grades.iter().find(|g| g.id == id).cloned())
    }

    async fn list_grade_audits(&self, grade_id: Uuid) -> Result<Vec<GradeAudit>, DatabaseError> {
        Ok(self
            .read()
            .grade_audits
            .iter()
            .filter(|a| a.student_grade_id == grade_id)
            .cloned()
            .collect())
    }

    async fn list_attendance_sessions(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceSession>, DatabaseError> {
        Ok(select_page(
            self.read().attendance_sessions.iter(),
            scope,
            |s| opt_eq(filter.classroom_id, s.classroom_id),
            page,
        ))
    }

    async fn find_attendance_session(&self, id: Uuid) -> Result<Option<AttendanceSession>, DatabaseError> {
        Ok(self.read().attendance_sessions.iter().find(|s| s.id == id).cloned())
    }

    async fn list_attendance_records(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        Ok(select_page(
            self.read().attendance_records.iter(),
            scope,
            |r| {
                opt_eq(filter.classroom_id, r.classroom_id)
                    && opt_eq(filter.session_id, r.session_id)
                    && opt_eq(filter.enrollment_id, r.enrollment_id)
            },
            page,
        ))
    }
}

/// Writes are staged locally and only reach the shared state on commit
struct MemoryGradeTransaction {
    state: Arc<RwLock<MemoryState>>,
    _lock: OwnedMutexGuard<()>,
    staged_grades: Vec<Grade>,
    staged_audits: Vec<GradeAudit>,
    finished: bool,
}

impl MemoryGradeTransaction {
    fn ensure_open(&self) -> Result<(), DatabaseError> {
        if self.finished {
            Err(DatabaseError::TransactionClosed)
        } else {
            Ok(())
        }
    }

    fn current(&self, matches: impl Fn(&Grade) -> bool) -> Option<Grade> {
        if let Some(staged) = self.staged_grades.iter().rev().find(|g| matches(g)) {
            return Some(staged.clone());
        }
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.grades.iter().find(|g| matches(g)).cloned()
    }
}

#[async_trait]
impl GradeTransaction for MemoryGradeTransaction {
    async fn lock_live_grade(
        &mut self,
        tenant_id: Uuid,
        assessment_id: Uuid,
        enrollment_id: Uuid,
    ) -> Result<Option<Grade>, DatabaseError> {
        self.ensure_open()?;
        Ok(self.current(|g| {
            g.tenant_id == tenant_id && g.assessment_id == assessment_id && g.enrollment_id == enrollment_id
        }))
    }

    async fn insert_grade(&mut self, grade: NewGrade) -> Result<Grade, DatabaseError> {
        self.ensure_open()?;
        let duplicate = self.current(|g| {
            g.tenant_id == grade.tenant_id
                && g.assessment_id == grade.assessment_id
                && g.enrollment_id == grade.enrollment_id
        });
        if duplicate.is_some() {
            return Err(DatabaseError::Conflict(
                "student_grades(assessment_id, enrollment_id)".to_string(),
            ));
        }

        let now = Utc::now();
        let row = Grade {
            id: Uuid::new_v4(),
            tenant_id: grade.tenant_id,
            assessment_id: grade.assessment_id,
            enrollment_id: grade.enrollment_id,
            classroom_id: grade.classroom_id,
            score: grade.score,
            created_at: now,
            updated_at: now,
        };
        self.staged_grades.push(row.clone());
        Ok(row)
    }

    async fn append_audit(&mut self, entry: NewGradeAudit) -> Result<GradeAudit, DatabaseError> {
        self.ensure_open()?;
        let row = GradeAudit {
            id: Uuid::new_v4(),
            tenant_id: entry.tenant_id,
            student_grade_id: entry.student_grade_id,
            old_value: entry.old_value,
            new_value: entry.new_value,
            changed_by_id: entry.changed_by_id,
            changed_at: Utc::now(),
        };
        self.staged_audits.push(row.clone());
        Ok(row)
    }

    async fn update_score(&mut self, grade_id: Uuid, score: Decimal) -> Result<Grade, DatabaseError> {
        self.ensure_open()?;
        let mut grade = self
            .current(|g| g.id == grade_id)
            .ok_or_else(|| DatabaseError::InvalidRow(format!("grade {} vanished", grade_id)))?;
        grade.score = score;
        grade.updated_at = Utc::now();
        self.staged_grades.push(grade.clone());
        Ok(grade)
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        self.ensure_open()?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        for grade in self.staged_grades.drain(..) {
            match state.grades.iter_mut().find(|g| g.id == grade.id) {
                Some(existing) => *existing = grade,
                None => state.grades.push(grade),
            }
        }
        state.grade_audits.append(&mut self.staged_audits);
        self.finished = true;
        Ok(())
    }
}

#[async_trait]
impl GradeStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn GradeTransaction>, DatabaseError> {
        let lock = self.grade_writes.clone().lock_owned().await;
        Ok(Box::new(MemoryGradeTransaction {
            state: self.state.clone(),
            _lock: lock,
            staged_grades: Vec::new(),
            staged_audits: Vec::new(),
            finished: false,
        }))
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn credentials(&self) -> &dyn CredentialStore {
        self
    }

    fn relationships(&self) -> &dyn RelationshipStore {
        self
    }

    fn records(&self) -> &dyn RecordStore {
        self
    }

    fn grades(&self) -> &dyn GradeStore {
        self
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
