use std::collections::BTreeSet;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::AccessError;
use crate::types::{Collection, ScopeLevel};

/// Restriction on one identifier dimension of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "ids")]
pub enum IdScope {
    All,
    Only(BTreeSet<Uuid>),
}

impl IdScope {
    pub fn only(ids: impl IntoIterator<Item = Uuid>) -> Self {
        IdScope::Only(ids.into_iter().collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, IdScope::Only(ids) if ids.is_empty())
    }

    /// `None` as the candidate means the row carries no such identifier,
    /// which only an unrestricted dimension accepts.
    pub fn admits(&self, candidate: Option<Uuid>) -> bool {
        match self {
            IdScope::All => true,
            IdScope::Only(ids) => candidate.is_some_and(|id| ids.contains(&id)),
        }
    }

    pub fn ids(&self) -> Option<&BTreeSet<Uuid>> {
        match self {
            IdScope::All => None,
            IdScope::Only(ids) => Some(ids),
        }
    }
}

/// Identifiers a single row exposes to scope checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeTarget {
    pub tenant_id: Uuid,
    pub classroom_id: Option<Uuid>,
    pub enrollment_id: Option<Uuid>,
}

/// Filter every query over a collection must apply for one principal.
///
/// Built only by the scope resolver. Stores translate it into their own
/// predicate language; handlers use [`ScopeFilter::ensure`] on single rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeFilter {
    collection: Collection,
    tenant_id: Option<Uuid>,
    classrooms: IdScope,
    enrollments: IdScope,
}

impl ScopeFilter {
    /// Global scope, optionally narrowed to one school
    pub fn unrestricted(collection: Collection, tenant_id: Option<Uuid>) -> Self {
        Self {
            collection,
            tenant_id,
            classrooms: IdScope::All,
            enrollments: IdScope::All,
        }
    }

    pub fn tenant(collection: Collection, tenant_id: Uuid) -> Self {
        Self::unrestricted(collection, Some(tenant_id))
    }

    pub fn classrooms(
        collection: Collection,
        tenant_id: Uuid,
        classroom_ids: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        Self {
            collection,
            tenant_id: Some(tenant_id),
            classrooms: IdScope::only(classroom_ids),
            enrollments: IdScope::All,
        }
    }

    /// Two-level scope for students and guardians: classroom-level
    /// collections see the classrooms, enrollment-level collections only
    /// the listed enrollments.
    pub fn enrollments(
        collection: Collection,
        tenant_id: Uuid,
        enrollments: impl IntoIterator<Item = (Uuid, Uuid)>,
    ) -> Self {
        let (enrollment_ids, classroom_ids): (BTreeSet<Uuid>, BTreeSet<Uuid>) =
            enrollments.into_iter().unzip();
        let enrollments = match collection.level() {
            ScopeLevel::Classroom => IdScope::All,
            ScopeLevel::Enrollment => IdScope::Only(enrollment_ids),
        };
        Self {
            collection,
            tenant_id: Some(tenant_id),
            classrooms: IdScope::Only(classroom_ids),
            enrollments,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.tenant_id
    }

    pub fn classroom_ids(&self) -> Option<&BTreeSet<Uuid>> {
        self.classrooms.ids()
    }

    pub fn enrollment_ids(&self) -> Option<&BTreeSet<Uuid>> {
        self.enrollments.ids()
    }

    /// True when no row can possibly match; list queries short-circuit to
    /// an empty page.
    pub fn is_empty(&self) -> bool {
        self.classrooms.is_empty() || self.enrollments.is_empty()
    }

    pub fn permits(&self, target: &ScopeTarget) -> bool {
        if let Some(tenant_id) = self.tenant_id {
            if tenant_id != target.tenant_id {
                return false;
            }
        }
        self.classrooms.admits(target.classroom_id) && self.enrollments.admits(target.enrollment_id)
    }

    /// Single-record gate: an existing row outside the scope is `Forbidden`,
    /// never silently dropped.
    pub fn ensure(&self, target: &ScopeTarget) -> Result<(), AccessError> {
        if self.permits(target) {
            Ok(())
        } else {
            tracing::warn!(
                collection = ?self.collection,
                tenant = %target.tenant_id,
                classroom = ?target.classroom_id,
                enrollment = ?target.enrollment_id,
                "record outside caller scope"
            );
            Err(AccessError::Forbidden("record outside scope"))
        }
    }
}

/// Rows that can be checked against a [`ScopeFilter`]
pub trait Scoped {
    fn scope_target(&self) -> ScopeTarget;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(tenant_id: Uuid, classroom: Uuid, enrollment: Option<Uuid>) -> ScopeTarget {
        ScopeTarget {
            tenant_id,
            classroom_id: Some(classroom),
            enrollment_id: enrollment,
        }
    }

    #[test]
    fn unrestricted_permits_any_tenant() {
        let filter = ScopeFilter::unrestricted(Collection::Grades, None);
        assert!(filter.permits(&target(Uuid::new_v4(), Uuid::new_v4(), Some(Uuid::new_v4()))));
        assert!(!filter.is_empty());
    }

    #[test]
    fn tenant_filter_rejects_other_school() {
        let school = Uuid::new_v4();
        let filter = ScopeFilter::tenant(Collection::Classrooms, school);
        assert!(filter.permits(&target(school, Uuid::new_v4(), None)));
        assert!(!filter.permits(&target(Uuid::new_v4(), Uuid::new_v4(), None)));
    }

    #[test]
    fn empty_classroom_set_is_empty_not_error() {
        let filter = ScopeFilter::classrooms(Collection::Assessments, Uuid::new_v4(), []);
        assert!(filter.is_empty());
        assert!(filter.ensure(&target(Uuid::new_v4(), Uuid::new_v4(), None)).is_err());
    }

    #[test]
    fn enrollment_level_requires_own_enrollment() {
        let school = Uuid::new_v4();
        let classroom = Uuid::new_v4();
        let mine = Uuid::new_v4();
        let classmate = Uuid::new_v4();
        let filter = ScopeFilter::enrollments(Collection::Grades, school, [(mine, classroom)]);

        assert!(filter.permits(&target(school, classroom, Some(mine))));
        assert!(!filter.permits(&target(school, classroom, Some(classmate))));
        // Enrollment-level rows must carry an enrollment id to be admitted
        assert!(!filter.permits(&target(school, classroom, None)));
    }

    #[test]
    fn classroom_level_ignores_enrollments() {
        let school = Uuid::new_v4();
        let classroom = Uuid::new_v4();
        let filter =
            ScopeFilter::enrollments(Collection::Assessments, school, [(Uuid::new_v4(), classroom)]);
        assert_eq!(filter.enrollment_ids(), None);
        assert!(filter.permits(&target(school, classroom, None)));
        assert!(!filter.permits(&target(school, Uuid::new_v4(), None)));
    }
}
