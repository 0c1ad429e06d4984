// handlers/protected/academic - Scoped reads over classrooms, assessments and enrollments
pub mod assessments;
pub mod classrooms;
pub mod enrollments;

// Re-export handler functions for use in routing
pub use classrooms::get as classroom_get;
pub use classrooms::list as classrooms_list;

pub use assessments::get as assessment_get;
pub use assessments::list as assessments_list;

pub use enrollments::get as enrollment_get;
pub use enrollments::list as enrollments_list;
