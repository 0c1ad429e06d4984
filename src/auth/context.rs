use serde::Serialize;
use uuid::Uuid;

use crate::database::models::ActiveTenant;
use crate::types::Role;

/// Authenticated caller, rebuilt from the credential store on every request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
}

/// Where a principal's requests are allowed to land
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TenantBinding {
    /// ADMIN_GLOBAL, not pinned to any school
    Global,
    /// Exactly one active school
    School(ActiveTenant),
}

impl TenantBinding {
    pub fn tenant_id(&self) -> Option<Uuid> {
        match self {
            TenantBinding::Global => None,
            TenantBinding::School(tenant) => Some(tenant.id),
        }
    }
}

/// Per-request access context, inserted into request extensions by the
/// tenant middleware and read by every protected handler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub principal: Principal,
    pub binding: TenantBinding,
}

impl RequestContext {
    pub fn role(&self) -> Role {
        self.principal.role
    }

    pub fn tenant_id(&self) -> Option<Uuid> {
        self.binding.tenant_id()
    }
}
