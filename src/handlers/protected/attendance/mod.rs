// handlers/protected/attendance - Attendance sessions (classroom level) and records (enrollment level)
pub mod records;
pub mod sessions;

pub use records::list as records_list;
pub use sessions::get as session_get;
pub use sessions::list as sessions_list;
