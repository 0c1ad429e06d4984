use tracing::warn;
use uuid::Uuid;

use super::context::{Principal, TenantBinding};
use super::error::AccessError;
use crate::database::models::ActiveTenant;
use crate::database::CredentialStore;

/// Bind a principal to its school. Runs on every request, so deactivating a
/// school cuts off its members immediately.
pub async fn bind_tenant(
    principal: &Principal,
    store: &dyn CredentialStore,
) -> Result<TenantBinding, AccessError> {
    if principal.role.is_global() {
        return Ok(TenantBinding::Global);
    }

    let tenant_id = principal.tenant_id.ok_or_else(|| {
        warn!(user = %principal.id, role = %principal.role, "non-global user has no tenant");
        AccessError::Forbidden("user is not placed in a school")
    })?;

    let tenant = require_active_tenant(tenant_id, store).await?;
    Ok(TenantBinding::School(tenant))
}

/// Active, non-deleted school or `Forbidden`
pub async fn require_active_tenant(
    tenant_id: Uuid,
    store: &dyn CredentialStore,
) -> Result<ActiveTenant, AccessError> {
    store.find_active_tenant_by_id(tenant_id).await?.ok_or_else(|| {
        warn!(tenant = %tenant_id, "school is inactive or deleted");
        AccessError::Forbidden("school inactive")
    })
}
