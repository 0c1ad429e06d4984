//! Per-role scope strategies.
//!
//! | Role         | Classroom-level rows          | Enrollment-level rows        |
//! |--------------|-------------------------------|------------------------------|
//! | ADMIN_GLOBAL | everything (or `?tenant=`)    | everything (or `?tenant=`)   |
//! | SECRETARY    | own school                    | own school                   |
//! | TEACHER      | classrooms with an open link  | same classrooms              |
//! | STUDENT      | classrooms of ATIVA enrollments | own enrollments only       |
//! | GUARDIAN     | union over linked students    | union over linked students   |

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use super::filter::ScopeFilter;
use crate::auth::{AccessError, RequestContext};
use crate::database::models::ActiveEnrollment;
use crate::database::RelationshipStore;
use crate::types::{Collection, Role};

/// What a caller asked to see
#[derive(Debug, Clone, Copy)]
pub struct ScopeRequest<'a> {
    pub context: &'a RequestContext,
    pub collection: Collection,
    /// Explicit `tenant` query parameter, if any
    pub tenant_hint: Option<Uuid>,
}

impl ScopeRequest<'_> {
    /// School of a tenant-bound caller. A hint naming another school is refused.
    fn own_tenant(&self) -> Result<Uuid, AccessError> {
        let tenant_id = self
            .context
            .tenant_id()
            .ok_or(AccessError::Forbidden("caller is not bound to a school"))?;

        match self.tenant_hint {
            Some(hint) if hint != tenant_id => {
                warn!(
                    user = %self.context.principal.id,
                    own = %tenant_id,
                    requested = %hint,
                    "cross-school scope requested"
                );
                Err(AccessError::Forbidden("tenant outside caller scope"))
            }
            _ => Ok(tenant_id),
        }
    }
}

#[async_trait]
pub trait RoleScope: Send + Sync {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError>;
}

pub struct GlobalScope;
pub struct SecretaryScope;
pub struct TeacherScope;
pub struct StudentScope;
pub struct GuardianScope;

#[async_trait]
impl RoleScope for GlobalScope {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        _relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError> {
        Ok(ScopeFilter::unrestricted(request.collection, request.tenant_hint))
    }
}

#[async_trait]
impl RoleScope for SecretaryScope {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        _relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError> {
        let tenant_id = request.own_tenant()?;
        Ok(ScopeFilter::tenant(request.collection, tenant_id))
    }
}

#[async_trait]
impl RoleScope for TeacherScope {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError> {
        let tenant_id = request.own_tenant()?;
        let teacher_id = request.context.principal.id;

        let classrooms = relationships.active_teacher_classrooms(teacher_id, tenant_id).await?;
        if classrooms.is_empty() {
            debug!(teacher = %teacher_id, "teacher has no active classroom links");
        }

        Ok(ScopeFilter::classrooms(request.collection, tenant_id, classrooms))
    }
}

#[async_trait]
impl RoleScope for StudentScope {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError> {
        let tenant_id = request.own_tenant()?;
        let user_id = request.context.principal.id;

        let profile = relationships
            .student_profile(user_id, tenant_id)
            .await?
            .ok_or_else(|| {
                warn!(user = %user_id, "student user has no student profile");
                AccessError::Forbidden("student profile missing")
            })?;

        let enrollments = relationships.active_enrollments(profile.id, tenant_id).await?;
        Ok(ScopeFilter::enrollments(
            request.collection,
            tenant_id,
            enrollments.into_iter().map(pair),
        ))
    }
}

#[async_trait]
impl RoleScope for GuardianScope {
    async fn resolve(
        &self,
        request: ScopeRequest<'_>,
        relationships: &dyn RelationshipStore,
    ) -> Result<ScopeFilter, AccessError> {
        let tenant_id = request.own_tenant()?;
        let guardian_id = request.context.principal.id;

        let students = relationships.guardian_links(guardian_id, tenant_id).await?;
        if students.is_empty() {
            warn!(guardian = %guardian_id, "guardian has no linked students");
            return Err(AccessError::Forbidden("guardian has no linked students"));
        }

        let mut enrollments = BTreeSet::new();
        for student_id in students {
            let active = relationships.active_enrollments(student_id, tenant_id).await?;
            enrollments.extend(active.into_iter().map(pair));
        }

        Ok(ScopeFilter::enrollments(request.collection, tenant_id, enrollments))
    }
}

fn pair(enrollment: ActiveEnrollment) -> (Uuid, Uuid) {
    (enrollment.id, enrollment.classroom_id)
}

static GLOBAL: GlobalScope = GlobalScope;
static SECRETARY: SecretaryScope = SecretaryScope;
static TEACHER: TeacherScope = TeacherScope;
static STUDENT: StudentScope = StudentScope;
static GUARDIAN: GuardianScope = GuardianScope;

/// The one place a role picks its scope strategy
pub fn strategy_for(role: Role) -> &'static dyn RoleScope {
    match role {
        Role::AdminGlobal => &GLOBAL,
        Role::Secretary => &SECRETARY,
        Role::Teacher => &TEACHER,
        Role::Student => &STUDENT,
        Role::Guardian => &GUARDIAN,
    }
}

pub async fn resolve_scope(
    context: &RequestContext,
    collection: Collection,
    tenant_hint: Option<Uuid>,
    relationships: &dyn RelationshipStore,
) -> Result<ScopeFilter, AccessError> {
    let request = ScopeRequest {
        context,
        collection,
        tenant_hint,
    };
    strategy_for(context.role()).resolve(request, relationships).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::auth::{Principal, TenantBinding};
    use crate::database::models::*;
    use crate::database::MemoryStore;
    use crate::scope::ScopeTarget;

    struct School {
        store: MemoryStore,
        tenant: ActiveTenant,
    }

    impl School {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                tenant: ActiveTenant {
                    id: Uuid::new_v4(),
                    name: "Escola Modelo".to_string(),
                },
            }
        }

        fn context(&self, role: Role) -> RequestContext {
            let binding = if role.is_global() {
                TenantBinding::Global
            } else {
                TenantBinding::School(self.tenant.clone())
            };
            RequestContext {
                principal: Principal {
                    id: Uuid::new_v4(),
                    tenant_id: binding.tenant_id(),
                    role,
                },
                binding,
            }
        }

        fn link_teacher(&self, teacher_id: Uuid, classroom_id: Uuid, valid_to: Option<chrono::DateTime<Utc>>) {
            self.store.link_teacher(TeacherClassroomLink {
                id: Uuid::new_v4(),
                tenant_id: self.tenant.id,
                teacher_id,
                classroom_id,
                subject_id: Uuid::new_v4(),
                valid_from: Utc::now() - Duration::days(90),
                valid_to,
                deleted_at: None,
            });
        }

        fn student(&self, user_id: Uuid) -> Uuid {
            let id = Uuid::new_v4();
            self.store.insert_student(StudentProfile {
                id,
                tenant_id: self.tenant.id,
                user_id,
                name: "Aluno".to_string(),
                deleted_at: None,
            });
            id
        }

        fn enroll(&self, student_id: Uuid, classroom_id: Uuid, status: EnrollmentStatus) -> Uuid {
            let id = Uuid::new_v4();
            self.store.insert_enrollment(Enrollment {
                id,
                tenant_id: self.tenant.id,
                student_id,
                classroom_id,
                status,
                enrolled_at: Utc::now(),
                deleted_at: None,
            });
            id
        }
    }

    #[tokio::test]
    async fn every_role_has_a_strategy() {
        let school = School::new();
        for role in Role::ALL {
            let context = school.context(role);
            // Student and guardian without relationships are refused, the rest resolve
            let result = resolve_scope(&context, Collection::Classrooms, None, &school.store).await;
            match role {
                Role::Student | Role::Guardian => assert!(result.is_err(), "{role}"),
                _ => assert!(result.is_ok(), "{role}"),
            }
        }
    }

    #[tokio::test]
    async fn admin_hint_narrows_to_one_school() {
        let school = School::new();
        let context = school.context(Role::AdminGlobal);
        let other = Uuid::new_v4();

        let filter = resolve_scope(&context, Collection::Grades, Some(other), &school.store)
            .await
            .unwrap();
        assert_eq!(filter.tenant_id(), Some(other));
    }

    #[tokio::test]
    async fn secretary_cannot_name_another_school() {
        let school = School::new();
        let context = school.context(Role::Secretary);

        let own = resolve_scope(&context, Collection::Enrollments, Some(school.tenant.id), &school.store).await;
        assert_eq!(own.unwrap().tenant_id(), Some(school.tenant.id));

        let other = resolve_scope(&context, Collection::Enrollments, Some(Uuid::new_v4()), &school.store).await;
        assert!(matches!(other, Err(AccessError::Forbidden(_))));
    }

    #[tokio::test]
    async fn teacher_closed_link_grants_nothing() {
        let school = School::new();
        let context = school.context(Role::Teacher);
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        school.link_teacher(context.principal.id, c1, None);
        school.link_teacher(context.principal.id, c2, Some(Utc::now() - Duration::days(1)));

        let filter = resolve_scope(&context, Collection::Grades, None, &school.store)
            .await
            .unwrap();
        assert_eq!(filter.classroom_ids(), Some(&BTreeSet::from([c1])));
        assert_eq!(filter.enrollment_ids(), None);
    }

    #[tokio::test]
    async fn teacher_without_links_gets_empty_scope() {
        let school = School::new();
        let context = school.context(Role::Teacher);
        let filter = resolve_scope(&context, Collection::Assessments, None, &school.store)
            .await
            .unwrap();
        assert!(filter.is_empty());
    }

    #[tokio::test]
    async fn student_sees_only_active_enrollments() {
        let school = School::new();
        let context = school.context(Role::Student);
        let student_id = school.student(context.principal.id);
        let current = Uuid::new_v4();
        let former = Uuid::new_v4();
        let enrollment = school.enroll(student_id, current, EnrollmentStatus::Ativa);
        school.enroll(student_id, former, EnrollmentStatus::Transferida);

        let grades = resolve_scope(&context, Collection::Grades, None, &school.store)
            .await
            .unwrap();
        assert_eq!(grades.classroom_ids(), Some(&BTreeSet::from([current])));
        assert_eq!(grades.enrollment_ids(), Some(&BTreeSet::from([enrollment])));

        let assessments = resolve_scope(&context, Collection::Assessments, None, &school.store)
            .await
            .unwrap();
        assert_eq!(assessments.enrollment_ids(), None);
    }

    #[tokio::test]
    async fn student_without_profile_is_forbidden() {
        let school = School::new();
        let context = school.context(Role::Student);
        let result = resolve_scope(&context, Collection::Grades, None, &school.store).await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));
    }

    #[tokio::test]
    async fn guardian_spans_all_linked_students() {
        let school = School::new();
        let context = school.context(Role::Guardian);
        let (c1, c2, c3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let s1 = school.student(Uuid::new_v4());
        let s2 = school.student(Uuid::new_v4());
        let s3 = school.student(Uuid::new_v4());
        let e1 = school.enroll(s1, c1, EnrollmentStatus::Ativa);
        let e2 = school.enroll(s2, c2, EnrollmentStatus::Ativa);
        school.enroll(s3, c3, EnrollmentStatus::Ativa);

        for student_id in [s1, s2] {
            school.store.link_guardian(GuardianStudentLink {
                tenant_id: school.tenant.id,
                guardian_id: context.principal.id,
                student_id,
                deleted_at: None,
            });
        }

        let filter = resolve_scope(&context, Collection::Assessments, None, &school.store)
            .await
            .unwrap();
        assert_eq!(filter.classroom_ids(), Some(&BTreeSet::from([c1, c2])));

        let grades = resolve_scope(&context, Collection::Grades, None, &school.store)
            .await
            .unwrap();
        assert!(grades.permits(&ScopeTarget {
            tenant_id: school.tenant.id,
            classroom_id: Some(c2),
            enrollment_id: Some(e2),
        }));
        assert_eq!(grades.enrollment_ids(), Some(&BTreeSet::from([e1, e2])));
    }

    #[tokio::test]
    async fn guardian_without_links_is_forbidden() {
        let school = School::new();
        let context = school.context(Role::Guardian);
        let result = resolve_scope(&context, Collection::Classrooms, None, &school.store).await;
        assert!(matches!(result, Err(AccessError::Forbidden(_))));
    }
}
