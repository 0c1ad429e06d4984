use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::RequestContext;
use crate::database::{ListFilter, Page};
use crate::error::ApiError;
use crate::scope::{resolve_scope, ScopeFilter, Scoped};
use crate::types::Collection;

/// Query string accepted by every list endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Global admins narrow to one school; everyone else may only name their own
    pub tenant: Option<Uuid>,
    pub classroom_id: Option<Uuid>,
    pub assessment_id: Option<Uuid>,
    pub enrollment_id: Option<Uuid>,
    pub session_id: Option<Uuid>,
}

impl ListQuery {
    pub fn page(&self, state: &AppState) -> Page {
        Page::new(
            self.limit,
            self.offset,
            state.config.api.default_page_size,
            state.config.api.max_page_size,
        )
    }

    pub fn filter(&self) -> ListFilter {
        ListFilter {
            classroom_id: self.classroom_id,
            assessment_id: self.assessment_id,
            enrollment_id: self.enrollment_id,
            session_id: self.session_id,
        }
    }
}

/// Scope for this caller over `collection`, resolved before any record lookup
pub async fn scope_for(
    state: &AppState,
    context: &RequestContext,
    collection: Collection,
    tenant_hint: Option<Uuid>,
) -> Result<ScopeFilter, ApiError> {
    Ok(resolve_scope(context, collection, tenant_hint, state.store.relationships()).await?)
}

/// Absent -> 404, present but outside scope -> 403
pub fn visible<T: Scoped>(row: Option<T>, scope: &ScopeFilter, what: &str) -> Result<T, ApiError> {
    let row = row.ok_or_else(|| ApiError::not_found(format!("{} not found", what)))?;
    scope.ensure(&row.scope_target())?;
    Ok(row)
}
