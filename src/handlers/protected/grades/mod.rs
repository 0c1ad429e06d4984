// handlers/protected/grades - Scoped grade reads and the audited grade upsert
pub mod audit;
pub mod read;
pub mod write;

pub use audit::get as grade_audit_get;
pub use read::get as grade_get;
pub use read::list as grades_list;
pub use write::put as grade_put;
