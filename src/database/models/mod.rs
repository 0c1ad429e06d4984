pub mod academic;
pub mod grade;
pub mod tenant;
pub mod user;

pub use academic::*;
pub use grade::{Grade, GradeAudit, NewGrade, NewGradeAudit};
pub use tenant::{ActiveTenant, School};
pub use user::{User, UserCredentials, UserIdentity};
