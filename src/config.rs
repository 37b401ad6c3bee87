use std::env;
use thiserror::Error;

const LOCAL_SESSION_SECRET: &str = "stayhub-local-session-secret-not-for-production";
const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// AppConfig
///
/// Immutable configuration loaded once at startup and pulled into handlers
/// and extractors through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` selects the in-memory store (Local only).
    pub db_url: Option<String>,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
    // Runtime environment marker. Controls the dev sign-in and the x-user-id bypass.
    pub env: Env,
    // HMAC secret for signing and verifying session tokens.
    pub session_secret: String,
    // Lifetime of an issued session token and its cookie.
    pub session_ttl_hours: i64,
}

/// Env
///
/// Separates development conveniences from the hardened production setup.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{var} has an invalid value: {value}")]
    Invalid { var: &'static str, value: String },
}

impl Default for AppConfig {
    /// Local settings with the in-memory store, for test setup.
    fn default() -> Self {
        Self {
            db_url: None,
            bind_addr: DEFAULT_ADDR.to_string(),
            env: Env::Local,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the environment. Production refuses to
    /// start without `DATABASE_URL` and `SESSION_SECRET`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let session_secret = env::var("SESSION_SECRET").ok().filter(|s| !s.is_empty());

        let (db_url, session_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                session_secret.ok_or(ConfigError::Missing("SESSION_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                session_secret.unwrap_or_else(|| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => match raw.parse::<i64>() {
                Ok(hours) if hours > 0 => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SESSION_TTL_HOURS",
                        value: raw,
                    });
                }
            },
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            db_url,
            bind_addr: env::var("APP_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string()),
            env,
            session_secret,
            session_ttl_hours,
        })
    }
}
