//! Session tokens: HS256 JWTs carrying `{sub, tenantId, role}`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("JWT signing secret is empty")]
    EmptySecret,

    #[error("JWT generation error: {0}")]
    Signing(String),

    /// Malformed, expired, wrong issuer or bad signature. Never split further.
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionClaims {
    sub: Uuid,
    tenant_id: Option<Uuid>,
    role: Role,
    iss: String,
    iat: i64,
    exp: i64,
}

/// Claims of a token whose signature, issuer and expiry all checked out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &SecurityConfig) -> Result<Self, TokenError> {
        if config.jwt_secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            issuer: config.jwt_issuer.clone(),
            ttl: Duration::hours(config.jwt_expiry_hours as i64),
        })
    }

    /// Lifetime applied by login
    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(
        &self,
        subject_id: Uuid,
        tenant_id: Option<Uuid>,
        role: Role,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = SessionClaims {
            sub: subject_id,
            tenant_id,
            role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            tracing::debug!("token rejected: {}", e);
            TokenError::InvalidToken
        })?;
        let claims = data.claims;

        let issued_at = Utc.timestamp_opt(claims.iat, 0).single().ok_or(TokenError::InvalidToken)?;
        let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or(TokenError::InvalidToken)?;

        Ok(VerifiedToken {
            subject_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}
