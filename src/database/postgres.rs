//! Postgres backend. Table layout lives in `sql/schema.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::*;
use super::store::*;
use crate::scope::ScopeFilter;

const GRADE_COLUMNS: &str = "g.id, g.tenant_id, g.assessment_id, g.enrollment_id, a.classroom_id, \
     g.score, g.created_at, g.updated_at";

/// Column names a scope filter is applied to in one query
struct ScopeColumns {
    tenant: &'static str,
    classroom: &'static str,
    enrollment: Option<&'static str>,
}

/// Append the scope predicate. The query must already contain a WHERE clause.
fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, columns: &ScopeColumns) {
    if let Some(tenant_id) = scope.tenant_id() {
        qb.push(format!(" AND {} = ", columns.tenant));
        qb.push_bind(tenant_id);
    }
    if let Some(ids) = scope.classroom_ids() {
        qb.push(format!(" AND {} = ANY(", columns.classroom));
        qb.push_bind(ids.iter().copied().collect::<Vec<Uuid>>());
        qb.push(")");
    }
    if let Some(ids) = scope.enrollment_ids() {
        match columns.enrollment {
            Some(column) => {
                qb.push(format!(" AND {} = ANY(", column));
                qb.push_bind(ids.iter().copied().collect::<Vec<Uuid>>());
                qb.push(")");
            }
            // Enrollment-restricted scope over rows without an enrollment
            None => {
                qb.push(" AND FALSE");
            }
        }
    }
}

fn push_eq(qb: &mut QueryBuilder<'_, Postgres>, column: &str, value: Option<Uuid>) {
    if let Some(id) = value {
        qb.push(format!(" AND {} = ", column));
        qb.push_bind(id);
    }
}

fn push_page(qb: &mut QueryBuilder<'_, Postgres>, order_by: &str, page: Page) {
    qb.push(format!(" ORDER BY {}", order_by));
    qb.push(" LIMIT ");
    qb.push_bind(i64::from(page.limit));
    qb.push(" OFFSET ");
    qb.push_bind(i64::from(page.offset));
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_active_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, DatabaseError> {
        let row = sqlx::query_as::<_, UserIdentity>(
            r#"
            SELECT id, tenant_id, role
            FROM users
            WHERE id = $1
            AND is_active = true
            AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_active_user_by_tenant_and_email(
        &self,
        tenant_id: Option<Uuid>,
        email: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError> {
        let row = sqlx::query_as::<_, UserCredentials>(
            r#"
            SELECT id, tenant_id, role, password_hash
            FROM users
            WHERE tenant_id IS NOT DISTINCT FROM $1
            AND lower(email) = lower($2)
            AND is_active = true
            AND deleted_at IS NULL
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_active_tenant_by_id(&self, id: Uuid) -> Result<Option<ActiveTenant>, DatabaseError> {
        let row = sqlx::query_as::<_, ActiveTenant>(
            r#"
            SELECT id, name
            FROM schools
            WHERE id = $1
            AND is_active = true
            AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl RelationshipStore for PgStore {
    async fn active_teacher_classrooms(
        &self,
        teacher_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT classroom_id
            FROM teacher_classrooms
            WHERE teacher_id = $1
            AND tenant_id = $2
            AND deleted_at IS NULL
            AND valid_from <= now()
            AND (valid_to IS NULL OR valid_to > now())
            "#,
        )
        .bind(teacher_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn student_profile(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<StudentProfile>, DatabaseError> {
        let row = sqlx::query_as::<_, StudentProfile>(
            r#"
            SELECT id, tenant_id, user_id, name, deleted_at
            FROM students
            WHERE user_id = $1
            AND tenant_id = $2
            AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn active_enrollments(
        &self,
        student_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<ActiveEnrollment>, DatabaseError> {
        let rows = sqlx::query_as::<_, ActiveEnrollment>(
            r#"
            SELECT id, classroom_id
            FROM enrollments
            WHERE student_id = $1
            AND tenant_id = $2
            AND status = 'ATIVA'
            AND deleted_at IS NULL
            "#,
        )
        .bind(student_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn guardian_links(&self, guardian_id: Uuid, tenant_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT student_id
            FROM guardian_students
            WHERE guardian_id = $1
            AND tenant_id = $2
            AND deleted_at IS NULL
            "#,
        )
        .bind(guardian_id)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list_classrooms(&self, scope: &ScopeFilter, page: Page) -> Result<Vec<Classroom>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT c.id, c.tenant_id, c.name, c.school_year FROM classrooms c WHERE c.deleted_at IS NULL",
        );
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "c.tenant_id",
                classroom: "c.id",
                enrollment: None,
            },
        );
        push_page(&mut qb, "c.name, c.id", page);
        Ok(qb.build_query_as::<Classroom>().fetch_all(&self.pool).await?)
    }

    async fn find_classroom(&self, id: Uuid) -> Result<Option<Classroom>, DatabaseError> {
        let row = sqlx::query_as::<_, Classroom>(
            "SELECT id, tenant_id, name, school_year FROM classrooms WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_assessments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Assessment>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT a.id, a.tenant_id, a.classroom_id, a.subject_id, a.title, a.max_score, a.held_on \
             FROM assessments a WHERE a.deleted_at IS NULL",
        );
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "a.tenant_id",
                classroom: "a.classroom_id",
                enrollment: None,
            },
        );
        push_eq(&mut qb, "a.classroom_id", filter.classroom_id);
        push_page(&mut qb, "a.held_on DESC, a.id", page);
        Ok(qb.build_query_as::<Assessment>().fetch_all(&self.pool).await?)
    }

    async fn find_assessment(&self, id: Uuid) -> Result<Option<Assessment>, DatabaseError> {
        let row = sqlx::query_as::<_, Assessment>(
            r#"
            SELECT id, tenant_id, classroom_id, subject_id, title, max_score, held_on
            FROM assessments
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_enrollments(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Enrollment>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT e.id, e.tenant_id, e.student_id, e.classroom_id, e.status, e.enrolled_at, e.deleted_at \
             FROM enrollments e WHERE e.deleted_at IS NULL",
        );
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "e.tenant_id",
                classroom: "e.classroom_id",
                enrollment: Some("e.id"),
            },
        );
        push_eq(&mut qb, "e.classroom_id", filter.classroom_id);
        push_eq(&mut qb, "e.id", filter.enrollment_id);
        push_page(&mut qb, "e.enrolled_at, e.id", page);
        Ok(qb.build_query_as::<Enrollment>().fetch_all(&self.pool).await?)
    }

    async fn find_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        let row = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, tenant_id, student_id, classroom_id, status, enrolled_at, deleted_at
            FROM enrollments
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_grades(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<Grade>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM student_grades g JOIN assessments a ON a.id = g.assessment_id \
             WHERE g.deleted_at IS NULL",
            GRADE_COLUMNS
        ));
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "g.tenant_id",
                classroom: "a.classroom_id",
                enrollment: Some("g.enrollment_id"),
            },
        );
        push_eq(&mut qb, "a.classroom_id", filter.classroom_id);
        push_eq(&mut qb, "g.assessment_id", filter.assessment_id);
        push_eq(&mut qb, "g.enrollment_id", filter.enrollment_id);
        push_page(&mut qb, "g.created_at, g.id", page);
        Ok(qb.build_query_as::<Grade>().fetch_all(&self.pool).await?)
    }

    async fn find_grade(&self, id: Uuid) -> Result<Option<Grade>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM student_grades g JOIN assessments a ON a.id = g.assessment_id \
             WHERE g.id = $1 AND g.deleted_at IS NULL",
            GRADE_COLUMNS
        );
        let row = sqlx::query_as::<_, Grade>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_grade_audits(&self, grade_id: Uuid) -> Result<Vec<GradeAudit>, DatabaseError> {
        let rows = sqlx::query_as::<_, GradeAudit>(
            r#"
            SELECT id, tenant_id, student_grade_id, old_value, new_value, changed_by_id, changed_at
            FROM grade_audits
            WHERE student_grade_id = $1
            ORDER BY changed_at, id
            "#,
        )
        .bind(grade_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_attendance_sessions(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceSession>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT s.id, s.tenant_id, s.classroom_id, s.held_on FROM attendance_sessions s \
             WHERE s.deleted_at IS NULL",
        );
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "s.tenant_id",
                classroom: "s.classroom_id",
                enrollment: None,
            },
        );
        push_eq(&mut qb, "s.classroom_id", filter.classroom_id);
        push_page(&mut qb, "s.held_on DESC, s.id", page);
        Ok(qb.build_query_as::<AttendanceSession>().fetch_all(&self.pool).await?)
    }

    async fn find_attendance_session(&self, id: Uuid) -> Result<Option<AttendanceSession>, DatabaseError> {
        let row = sqlx::query_as::<_, AttendanceSession>(
            "SELECT id, tenant_id, classroom_id, held_on FROM attendance_sessions WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_attendance_records(
        &self,
        scope: &ScopeFilter,
        filter: &ListFilter,
        page: Page,
    ) -> Result<Vec<AttendanceRecord>, DatabaseError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT r.id, r.tenant_id, r.session_id, s.classroom_id, r.enrollment_id, r.status \
             FROM attendance_records r JOIN attendance_sessions s ON s.id = r.session_id \
             WHERE r.deleted_at IS NULL AND s.deleted_at IS NULL",
        );
        push_scope(
            &mut qb,
            scope,
            &ScopeColumns {
                tenant: "r.tenant_id",
                classroom: "s.classroom_id",
                enrollment: Some("r.enrollment_id"),
            },
        );
        push_eq(&mut qb, "s.classroom_id", filter.classroom_id);
        push_eq(&mut qb, "r.session_id", filter.session_id);
        push_eq(&mut qb, "r.enrollment_id", filter.enrollment_id);
        push_page(&mut qb, "s.held_on DESC, r.id", page);
        Ok(qb.build_query_as::<AttendanceRecord>().fetch_all(&self.pool).await?)
    }
}

/// Wraps one Postgres transaction; dropping it unfinished rolls back
pub struct PgGradeTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgGradeTransaction {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>, DatabaseError> {
        self.tx.as_mut().ok_or(DatabaseError::TransactionClosed)
    }
}

#[async_trait]
impl GradeTransaction for PgGradeTransaction {
    async fn lock_live_grade(
        &mut self,
        tenant_id: Uuid,
        assessment_id: Uuid,
        enrollment_id: Uuid,
    ) -> Result<Option<Grade>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM student_grades g JOIN assessments a ON a.id = g.assessment_id \
             WHERE g.tenant_id = $1 AND g.assessment_id = $2 AND g.enrollment_id = $3 \
             AND g.deleted_at IS NULL FOR UPDATE OF g",
            GRADE_COLUMNS
        );
        let tx = self.tx()?;
        let row = sqlx::query_as::<_, Grade>(&sql)
            .bind(tenant_id)
            .bind(assessment_id)
            .bind(enrollment_id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row)
    }

    async fn insert_grade(&mut self, grade: NewGrade) -> Result<Grade, DatabaseError> {
        let id = Uuid::new_v4();
        let tx = self.tx()?;
        // Read the score back as stored, the column fixes its scale
        let (score, created_at, updated_at): (Decimal, DateTime<Utc>, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO student_grades (id, tenant_id, assessment_id, enrollment_id, score)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING score, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(grade.tenant_id)
        .bind(grade.assessment_id)
        .bind(grade.enrollment_id)
        .bind(grade.score)
        .fetch_one(&mut **tx)
        .await?;

        Ok(Grade {
            id,
            tenant_id: grade.tenant_id,
            assessment_id: grade.assessment_id,
            enrollment_id: grade.enrollment_id,
            classroom_id: grade.classroom_id,
            score,
            created_at,
            updated_at,
        })
    }

    async fn append_audit(&mut self, entry: NewGradeAudit) -> Result<GradeAudit, DatabaseError> {
        let tx = self.tx()?;
        let row = sqlx::query_as::<_, GradeAudit>(
            r#"
            INSERT INTO grade_audits (id, tenant_id, student_grade_id, old_value, new_value, changed_by_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, tenant_id, student_grade_id, old_value, new_value, changed_by_id, changed_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.tenant_id)
        .bind(entry.student_grade_id)
        .bind(entry.old_value)
        .bind(entry.new_value)
        .bind(entry.changed_by_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn update_score(&mut self, grade_id: Uuid, score: Decimal) -> Result<Grade, DatabaseError> {
        let tx = self.tx()?;
        let row = sqlx::query_as::<_, Grade>(
            r#"
            UPDATE student_grades g
            SET score = $2, updated_at = now()
            FROM assessments a
            WHERE g.id = $1 AND a.id = g.assessment_id
            RETURNING g.id, g.tenant_id, g.assessment_id, g.enrollment_id, a.classroom_id,
                      g.score, g.created_at, g.updated_at
            "#,
        )
        .bind(grade_id)
        .bind(score)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row)
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        let tx = self.tx.take().ok_or(DatabaseError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl GradeStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn GradeTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgGradeTransaction { tx: Some(tx) }))
    }
}

#[async_trait]
impl Store for PgStore {
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
        DatabaseManager::health_check(&self.pool).await
    }
}
