use chrono::Duration;
use std::env;

pub const DEFAULT_ACCESS_SECRET: &str = "supersecretkey";
pub const DEFAULT_REFRESH_SECRET: &str = "refreshsecret";

/// Signing secrets and token lifetimes for the token service. Built once in
/// `main` and handed to `TokenService::new`, never read from the environment
/// ad hoc.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let access_ttl_secs = env::var("ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15 * 60);
        let refresh_ttl_secs = env::var("REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(7 * 24 * 60 * 60);

        AuthConfig {
            access_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| DEFAULT_ACCESS_SECRET.to_string()),
            refresh_secret: env::var("REFRESH_SECRET")
                .unwrap_or_else(|_| DEFAULT_REFRESH_SECRET.to_string()),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// True when either signing secret is still a compiled-in default.
    pub fn uses_default_secrets(&self) -> bool {
        self.access_secret == DEFAULT_ACCESS_SECRET || self.refresh_secret == DEFAULT_REFRESH_SECRET
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: String,
    pub db_path: String,
    /// Marks session cookies `Secure`; enabled when APP_ENV=production.
    pub cookie_secure: bool,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT").unwrap_or_else(|_| "8080".to_string()),
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "./data/crm.db".to_string()),
            cookie_secure: env::var("APP_ENV").map(|v| v == "production").unwrap_or(false),
            auth: AuthConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
