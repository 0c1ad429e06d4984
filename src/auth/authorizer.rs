use tracing::warn;

use super::context::Principal;
use super::error::AccessError;
use crate::types::Role;
use crate::types::Role::{AdminGlobal, Guardian, Secretary, Student, Teacher};

const EVERYONE: &[Role] = &[AdminGlobal, Secretary, Teacher, Student, Guardian];
const STAFF: &[Role] = &[AdminGlobal, Secretary, Teacher];

/// Every protected route names exactly one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    WhoAmI,
    ReadClassrooms,
    ReadAssessments,
    ReadEnrollments,
    ReadGrades,
    WriteGrade,
    ReadGradeAudit,
    ReadAttendance,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::WhoAmI,
        Operation::ReadClassrooms,
        Operation::ReadAssessments,
        Operation::ReadEnrollments,
        Operation::ReadGrades,
        Operation::WriteGrade,
        Operation::ReadGradeAudit,
        Operation::ReadAttendance,
    ];

    /// Roles that may call the operation at all. Which records they reach is
    /// the scope resolver's concern.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Operation::WhoAmI
            | Operation::ReadClassrooms
            | Operation::ReadAssessments
            | Operation::ReadEnrollments
            | Operation::ReadGrades
            | Operation::ReadAttendance => EVERYONE,
            Operation::WriteGrade | Operation::ReadGradeAudit => STAFF,
        }
    }
}

pub fn authorize(principal: &Principal, operation: Operation) -> Result<(), AccessError> {
    if operation.allowed_roles().contains(&principal.role) {
        return Ok(());
    }
    warn!(user = %principal.id, role = %principal.role, ?operation, "role not allowed for operation");
    Err(AccessError::Forbidden("role not allowed"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            tenant_id: Some(Uuid::new_v4()),
            role,
        }
    }

    #[test]
    fn students_and_guardians_cannot_write_grades() {
        for role in [Student, Guardian] {
            assert!(authorize(&principal(role), Operation::WriteGrade).is_err());
            assert!(authorize(&principal(role), Operation::ReadGradeAudit).is_err());
        }
    }

    #[test]
    fn staff_can_write_grades() {
        for role in [AdminGlobal, Secretary, Teacher] {
            assert!(authorize(&principal(role), Operation::WriteGrade).is_ok());
        }
    }

    #[test]
    fn every_operation_admits_the_global_admin() {
        for operation in Operation::ALL {
            assert!(operation.allowed_roles().contains(&AdminGlobal), "{operation:?}");
        }
    }
}
