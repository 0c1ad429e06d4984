use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub login: LoginLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_request_logging: bool,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiry_hours: u64,
    #[serde(skip_serializing)]
    pub password_pepper: Option<String>,
}

/// Brute-force protection for POST /auth/login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginLimitConfig {
    pub enabled: bool,
    pub max_attempts: u32,
    pub window_secs: u64,
    pub max_failures: u32,
    pub lockout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("ESCOLA_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_REQUEST_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = v.parse().unwrap_or(self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = v.parse().unwrap_or(self.api.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_ISSUER") {
            self.security.jwt_issuer = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("PASSWORD_PEPPER") {
            self.security.password_pepper = Some(v).filter(|p| !p.is_empty());
        }

        // Login limiter overrides
        if let Ok(v) = env::var("LOGIN_RATE_LIMIT_ENABLED") {
            self.login.enabled = v.parse().unwrap_or(self.login.enabled);
        }
        if let Ok(v) = env::var("LOGIN_RATE_LIMIT_ATTEMPTS") {
            self.login.max_attempts = v.parse().unwrap_or(self.login.max_attempts);
        }
        if let Ok(v) = env::var("LOGIN_RATE_LIMIT_WINDOW_SECS") {
            self.login.window_secs = v.parse().unwrap_or(self.login.window_secs);
        }
        if let Ok(v) = env::var("LOGIN_RATE_LIMIT_MAX_FAILURES") {
            self.login.max_failures = v.parse().unwrap_or(self.login.max_failures);
        }
        if let Ok(v) = env::var("LOGIN_RATE_LIMIT_LOCKOUT_SECS") {
            self.login.lockout_secs = v.parse().unwrap_or(self.login.lockout_secs);
        }

        self
    }

    /// Refuse configurations that would issue unverifiable or unsafe tokens
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET must be set".to_string());
        }
        if self.security.jwt_expiry_hours == 0 || self.security.jwt_expiry_hours > 24 {
            return Err(format!(
                "SECURITY_JWT_EXPIRY_HOURS must be between 1 and 24 (got {})",
                self.security.jwt_expiry_hours
            ));
        }
        if self.api.max_page_size == 0 {
            return Err("API_MAX_PAGE_SIZE must be positive".to_string());
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                request_timeout_secs: 30,
                enable_request_logging: true,
                default_page_size: 50,
                max_page_size: 500,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                jwt_secret: "escola-development-secret".to_string(),
                jwt_issuer: "escola-api".to_string(),
                jwt_expiry_hours: 8,
                password_pepper: None,
            },
            login: LoginLimitConfig {
                enabled: true,
                max_attempts: 30,
                window_secs: 60,
                max_failures: 10,
                lockout_secs: 60,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                request_timeout_secs: 15,
                enable_request_logging: true,
                default_page_size: 50,
                max_page_size: 200,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.escola.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: "escola-api".to_string(),
                jwt_expiry_hours: 4,
                password_pepper: None,
            },
            login: LoginLimitConfig {
                enabled: true,
                max_attempts: 10,
                window_secs: 60,
                max_failures: 5,
                lockout_secs: 300,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                request_timeout_secs: 10,
                enable_request_logging: false,
                default_page_size: 25,
                max_page_size: 100,
            },
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.escola.example.com".to_string()],
                jwt_secret: String::new(),
                jwt_issuer: "escola-api".to_string(),
                jwt_expiry_hours: 2,
                password_pepper: None,
            },
            login: LoginLimitConfig {
                enabled: true,
                max_attempts: 5,
                window_secs: 60,
                max_failures: 5,
                lockout_secs: 900,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
