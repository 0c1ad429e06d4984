//! Failure taxonomy shared by the authenticator, tenant guard, authorizer
//! and scope resolver.

use thiserror::Error;

use crate::database::DatabaseError;

/// Terminal failure of an access-control stage. The `&'static str` payloads
/// are log-only reasons; HTTP responses never echo them.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error(transparent)]
    Store(#[from] DatabaseError),
}

impl AccessError {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}
