//! Password login and the brute-force limiter in front of it.
//!
//! Every credential failure (unknown email, wrong password, inactive school,
//! malformed stored hash) collapses into [`LoginError::InvalidCredentials`].
//! The concrete reason only reaches the logs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::context::Principal;
use super::error::AccessError;
use super::password::{verify_dummy, verify_password};
use super::tenant_guard::require_active_tenant;
use super::token::{TokenCodec, TokenError};
use crate::config::{LoginLimitConfig, SecurityConfig};
use crate::database::{CredentialStore, DatabaseError};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("too many login attempts, retry in {}s", .0.as_secs())]
    RateLimited(Duration),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("password check failed: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Absent for the global administrator
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSuccess {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Principal,
}

#[derive(Debug, Clone)]
struct LimitEntry {
    request_count: u32,
    failed_attempts: u32,
    window_start: Instant,
    lockout_until: Option<Instant>,
}

impl LimitEntry {
    fn new() -> Self {
        Self {
            request_count: 0,
            failed_attempts: 0,
            window_start: Instant::now(),
            lockout_until: None,
        }
    }
}

/// Checks between sweeps of idle entries
const CLEANUP_EVERY: u64 = 1024;

/// Fixed window per `tenant:email`, plus a lockout after repeated failures
pub struct LoginRateLimiter {
    max_attempts: u32,
    window: Duration,
    max_failures: u32,
    lockout: Duration,
    entries: RwLock<HashMap<String, LimitEntry>>,
    checks: AtomicU64,
}

impl LoginRateLimiter {
    pub fn new(config: &LoginLimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_secs),
            max_failures: config.max_failures,
            lockout: Duration::from_secs(config.lockout_secs),
            entries: RwLock::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    /// Drop entries whose window has run out and that are not locked out
    pub fn cleanup(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.window_start.elapsed() <= self.window || entry.lockout_until.is_some_and(|until| until > now)
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, remaining = entries.len(), "login limiter entries cleaned up");
        }
    }

    /// Number of keys currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// `Err(retry_after)` when the key is locked out or over its window budget
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        if (self.checks.fetch_add(1, Ordering::Relaxed) + 1) % CLEANUP_EVERY == 0 {
            self.cleanup();
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert_with(LimitEntry::new);
        let now = Instant::now();

        if let Some(until) = entry.lockout_until {
            if now < until {
                return Err(until - now);
            }
            entry.lockout_until = None;
            entry.failed_attempts = 0;
        }

        if entry.window_start.elapsed() > self.window {
            entry.request_count = 0;
            entry.window_start = now;
        }

        if entry.request_count >= self.max_attempts {
            return Err(self.window.saturating_sub(entry.window_start.elapsed()));
        }

        entry.request_count += 1;
        Ok(())
    }

    pub fn record_failure(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.to_string()).or_insert_with(LimitEntry::new);

        entry.failed_attempts += 1;
        if entry.failed_attempts >= self.max_failures {
            entry.lockout_until = Some(Instant::now() + self.lockout);
            warn!(key, failures = entry.failed_attempts, "login locked out");
        }
    }

    pub fn record_success(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get_mut(key) {
            entry.failed_attempts = 0;
            entry.lockout_until = None;
        }
    }
}

pub struct LoginService {
    codec: Arc<TokenCodec>,
    limiter: Option<LoginRateLimiter>,
    pepper: Option<String>,
}

impl LoginService {
    pub fn new(codec: Arc<TokenCodec>, security: &SecurityConfig, limits: &LoginLimitConfig) -> Self {
        Self {
            codec,
            limiter: limits.enabled.then(|| LoginRateLimiter::new(limits)),
            pepper: security.password_pepper.clone(),
        }
    }

    pub async fn login(
        &self,
        request: LoginRequest,
        store: &dyn CredentialStore,
    ) -> Result<LoginSuccess, LoginError> {
        let key = limiter_key(request.tenant_id, &request.email);

        if let Some(limiter) = &self.limiter {
            limiter.check(&key).map_err(LoginError::RateLimited)?;
        }

        let result = self.attempt(request, store).await;

        if let Some(limiter) = &self.limiter {
            match &result {
                Ok(_) => limiter.record_success(&key),
                Err(LoginError::InvalidCredentials) => limiter.record_failure(&key),
                Err(_) => {}
            }
        }

        result
    }

    async fn attempt(
        &self,
        request: LoginRequest,
        store: &dyn CredentialStore,
    ) -> Result<LoginSuccess, LoginError> {
        // Inactive school fails before any password work
        if let Some(tenant_id) = request.tenant_id {
            match require_active_tenant(tenant_id, store).await {
                Ok(_) => {}
                Err(AccessError::Store(e)) => return Err(LoginError::Store(e)),
                Err(_) => return Err(LoginError::InvalidCredentials),
            }
        }

        let user = store
            .find_active_user_by_tenant_and_email(request.tenant_id, &request.email)
            .await?;

        let pepper = self.pepper.clone();
        let password = request.password;
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());

        let matched = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => verify_password(&password, &hash, pepper.as_deref()).unwrap_or_else(|e| {
                warn!("stored password hash rejected: {}", e);
                // Same Argon2 cost as a real mismatch
                verify_dummy(&password, pepper.as_deref());
                false
            }),
            None => {
                verify_dummy(&password, pepper.as_deref());
                false
            }
        })
        .await
        .map_err(|e| LoginError::Internal(e.to_string()))?;

        let user = match user {
            Some(user) if matched => user,
            Some(_) => {
                warn!(tenant = ?request.tenant_id, "login failed: wrong password");
                return Err(LoginError::InvalidCredentials);
            }
            None => {
                warn!(tenant = ?request.tenant_id, "login failed: unknown email");
                return Err(LoginError::InvalidCredentials);
            }
        };

        if user.tenant_id.is_none() && !user.role.is_global() {
            warn!(user = %user.id, "tenant-less account with a school role");
            return Err(LoginError::InvalidCredentials);
        }

        let issued = self
            .codec
            .issue(user.id, user.tenant_id, user.role, self.codec.default_ttl())?;

        info!(user = %user.id, role = %user.role, "login succeeded");

        Ok(LoginSuccess {
            token: issued.token,
            expires_at: issued.expires_at,
            user: Principal {
                id: user.id,
                tenant_id: user.tenant_id,
                role: user.role,
            },
        })
    }
}

fn limiter_key(tenant_id: Option<Uuid>, email: &str) -> String {
    match tenant_id {
        Some(id) => format!("{}:{}", id, email.trim().to_lowercase()),
        None => format!("global:{}", email.trim().to_lowercase()),
    }
}
