use axum::http::{header::AUTHORIZATION, HeaderMap};
use tracing::warn;

use super::context::Principal;
use super::error::AccessError;
use super::token::TokenCodec;
use crate::database::CredentialStore;

/// Pull the token out of `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AccessError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AccessError::Unauthenticated("missing authorization header"))?
        .to_str()
        .map_err(|_| AccessError::Unauthenticated("authorization header is not ascii"))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AccessError::Unauthenticated("authorization header is not a bearer token")),
    }
}

/// Verify the token, then re-read the subject so a deactivated or deleted
/// user loses access on the very next request.
pub async fn authenticate(
    token: &str,
    codec: &TokenCodec,
    store: &dyn CredentialStore,
) -> Result<Principal, AccessError> {
    let verified = codec
        .verify(token)
        .map_err(|_| AccessError::Unauthenticated("token failed verification"))?;

    let user = store
        .find_active_user_by_id(verified.subject_id)
        .await?
        .ok_or_else(|| {
            warn!(subject = %verified.subject_id, "token subject is inactive or gone");
            AccessError::Unauthenticated("subject no longer active")
        })?;

    if user.tenant_id != verified.tenant_id {
        warn!(
            subject = %user.id,
            token_tenant = ?verified.tenant_id,
            live_tenant = ?user.tenant_id,
            "token tenant no longer matches the user"
        );
        return Err(AccessError::Unauthenticated("stale tenant in token"));
    }

    if user.role != verified.role {
        tracing::debug!(subject = %user.id, from = %verified.role, to = %user.role, "role changed since token issue");
    }

    Ok(Principal {
        id: user.id,
        tenant_id: user.tenant_id,
        role: user.role,
    })
}
