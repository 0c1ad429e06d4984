/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five account roles. Closed set: every match over it is exhaustive,
/// which is what keeps the scope table and the route allow-lists honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    AdminGlobal,
    Secretary,
    Teacher,
    Student,
    Guardian,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::AdminGlobal,
        Role::Secretary,
        Role::Teacher,
        Role::Student,
        Role::Guardian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::AdminGlobal => "ADMIN_GLOBAL",
            Role::Secretary => "SECRETARY",
            Role::Teacher => "TEACHER",
            Role::Student => "STUDENT",
            Role::Guardian => "GUARDIAN",
        }
    }

    /// Only the global administrator lives outside a school
    pub fn is_global(&self) -> bool {
        matches!(self, Role::AdminGlobal)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Record collections the scope resolver knows how to narrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Classrooms,
    Assessments,
    Enrollments,
    Grades,
    AttendanceSessions,
    AttendanceRecords,
}

/// Granularity at which a collection's rows hang off the relationship graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeLevel {
    /// Rows belong to a classroom (classrooms, assessments, attendance sessions)
    Classroom,
    /// Rows belong to a single enrollment (enrollments, grades, attendance records)
    Enrollment,
}

impl Collection {
    pub fn level(&self) -> ScopeLevel {
        match self {
            Collection::Classrooms | Collection::Assessments | Collection::AttendanceSessions => {
                ScopeLevel::Classroom
            }
            Collection::Enrollments | Collection::Grades | Collection::AttendanceRecords => {
                ScopeLevel::Enrollment
            }
        }
    }
}
