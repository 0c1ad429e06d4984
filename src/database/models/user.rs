use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Active and not soft-deleted
    pub fn is_live(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            tenant_id: self.tenant_id,
            role: self.role,
        }
    }

    pub fn credentials(&self) -> UserCredentials {
        UserCredentials {
            id: self.id,
            tenant_id: self.tenant_id,
            role: self.role,
            password_hash: self.password_hash.clone(),
        }
    }
}

/// Live identity as the credential store reports it right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

/// What login needs to check a password
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub password_hash: String,
}
