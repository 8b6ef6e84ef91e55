//! Configuration management for the session service
//!
//! Loads settings from:
//! 1. Environment variables
//! 2. .env file (local development, debug builds only)
//!
//! # Example
//!
//! ```no_run
//! use session_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("Revocation backend: {}", settings.revocation.backend);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use crypto_core::{parse_algorithm, JwtCodec};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub jwt: JwtSettings,
    pub session: SessionSettings,
    pub revocation: RevocationSettings,
    pub redis: RedisSettings,
    pub identity_provider: IdentityProviderSettings,
    pub database: DatabaseSettings,
    pub bootstrap: BootstrapSettings,
}

impl Settings {
    /// Load settings, reading a `.env` file first in debug builds
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) && dotenvy::dotenv().is_ok() {
            info!("Loaded .env file for development");
        }

        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let settings = Settings {
            jwt: JwtSettings::from_env()?,
            session: SessionSettings::from_env()?,
            revocation: RevocationSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            identity_provider: IdentityProviderSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            bootstrap: BootstrapSettings::from_env()?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject configurations that would only fail later, per request
    pub fn validate(&self) -> Result<()> {
        self.jwt.codec()?;
        self.session.validate()?;
        if self.revocation.backend == RevocationBackend::Redis && self.redis.url.is_none() {
            bail!("REDIS_URL must be set when REVOCATION_BACKEND=redis");
        }
        Ok(())
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().with_context(|| format!("Invalid {key}")),
        Err(_) => Ok(default),
    }
}

/// JWT signing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    /// Shared secret (HS*) or PEM private key (RS*)
    pub signing_key: String,
    /// PEM public key, required for RS*
    pub validation_key: Option<String>,
    pub algorithm: String,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("signing_key", &"<redacted>")
            .field("validation_key", &self.validation_key.as_ref().map(|_| "<redacted>"))
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            signing_key: String::new(),
            validation_key: None,
            algorithm: "HS256".to_string(),
        }
    }
}

impl JwtSettings {
    /// Shared-secret settings with the default HS256 algorithm
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            signing_key: secret.into(),
            ..Self::default()
        }
    }

    fn from_env() -> Result<Self> {
        // PEM key pair takes precedence over a shared secret.
        if let Ok(private_pem) = env::var("JWT_PRIVATE_KEY") {
            let public_pem = env::var("JWT_PUBLIC_KEY")
                .context("JWT_PUBLIC_KEY must be set when JWT_PRIVATE_KEY is configured")?;
            let algorithm = env::var("JWT_ALGORITHM").unwrap_or_else(|_| "RS256".to_string());

            return Ok(Self {
                signing_key: private_pem,
                validation_key: Some(public_pem),
                algorithm,
            });
        }

        let signing_key = env::var("JWT_SECRET")
            .or_else(|_| env::var("SECRET_KEY"))
            .context("JWT_SECRET must be set when no PEM keys are configured")?;

        let algorithm = env::var("JWT_ALGORITHM")
            .or_else(|_| env::var("HASH_ALGORITHM"))
            .unwrap_or_else(|_| "HS256".to_string());

        Ok(Self {
            signing_key,
            validation_key: None,
            algorithm,
        })
    }

    /// Build the token codec described by these settings
    pub fn codec(&self) -> Result<JwtCodec> {
        let algorithm = parse_algorithm(&self.algorithm).context("Invalid JWT_ALGORITHM")?;

        let codec = match &self.validation_key {
            Some(public_pem) => JwtCodec::from_rsa_pem(&self.signing_key, public_pem, algorithm),
            None => JwtCodec::from_secret(&self.signing_key, algorithm),
        }
        .context("Invalid JWT key material")?;

        Ok(codec)
    }
}

/// Upper bounds on configured token lifetimes
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TOKEN_EXPIRE_DAYS: i64 = 365;
pub const MAX_SIGNUP_TOKEN_EXPIRE_MINUTES: i64 = 24 * 60;

/// Token lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_days: i64,
    pub signup_token_expire_minutes: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            access_token_expire_minutes: 60,
            refresh_token_expire_days: 7,
            signup_token_expire_minutes: 5,
        }
    }
}

impl SessionSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            access_token_expire_minutes: env_or(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                defaults.access_token_expire_minutes,
            )?,
            refresh_token_expire_days: env_or(
                "REFRESH_TOKEN_EXPIRE_DAYS",
                defaults.refresh_token_expire_days,
            )?,
            signup_token_expire_minutes: env_or(
                "SIGNUP_TOKEN_EXPIRE_MINUTES",
                defaults.signup_token_expire_minutes,
            )?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_range(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            self.access_token_expire_minutes,
            MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
        )?;
        check_range(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            self.refresh_token_expire_days,
            MAX_REFRESH_TOKEN_EXPIRE_DAYS,
        )?;
        check_range(
            "SIGNUP_TOKEN_EXPIRE_MINUTES",
            self.signup_token_expire_minutes,
            MAX_SIGNUP_TOKEN_EXPIRE_MINUTES,
        )
    }
}

fn check_range(key: &str, value: i64, max: i64) -> Result<()> {
    if value <= 0 {
        bail!("{key} must be positive");
    }
    if value > max {
        bail!("{key} must be at most {max}, got {value}");
    }
    Ok(())
}

/// Which revocation store backend to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationBackend {
    /// Process-local map; single instance or development only
    #[default]
    Memory,
    /// External Redis; required for multi-instance deployments
    Redis,
}

#[derive(Debug, Error)]
#[error("unknown revocation backend: {0} (expected `memory` or `redis`)")]
pub struct UnknownBackend(String);

impl FromStr for RevocationBackend {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "in_memory" => Ok(RevocationBackend::Memory),
            "redis" => Ok(RevocationBackend::Redis),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for RevocationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevocationBackend::Memory => f.write_str("memory"),
            RevocationBackend::Redis => f.write_str("redis"),
        }
    }
}

/// Revocation store selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationSettings {
    pub backend: RevocationBackend,
    /// Key namespace for renewal ids in an external store
    pub key_prefix: String,
}

impl Default for RevocationSettings {
    fn default() -> Self {
        Self {
            backend: RevocationBackend::Memory,
            key_prefix: "session:renewal:".to_string(),
        }
    }
}

impl RevocationSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let backend = match env::var("REVOCATION_BACKEND") {
            Ok(raw) => raw
                .parse::<RevocationBackend>()
                .context("Invalid REVOCATION_BACKEND")?,
            // Older deployments toggle Redis with a boolean.
            Err(_) => {
                if env_or("USE_REDIS", false)? {
                    RevocationBackend::Redis
                } else {
                    defaults.backend
                }
            }
        };

        Ok(Self {
            backend,
            key_prefix: env::var("REVOCATION_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        })
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: Option<String>,
    /// Seconds to wait for the initial connection
    pub connection_timeout: u64,
    /// Seconds to wait for a single command
    pub response_timeout: u64,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: None,
            connection_timeout: 5,
            response_timeout: 5,
        }
    }
}

impl RedisSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: env::var("REDIS_URL").ok(),
            connection_timeout: env_or("REDIS_CONNECTION_TIMEOUT", defaults.connection_timeout)?,
            response_timeout: env_or("REDIS_RESPONSE_TIMEOUT", defaults.response_timeout)?,
        })
    }
}

/// External identity provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderSettings {
    /// Profile endpoint queried with the caller's bearer token
    pub userinfo_url: String,
    /// Prefix of the groups that map to internal roles
    pub group_prefix: String,
    /// Seconds before a profile request is abandoned
    pub request_timeout: u64,
}

impl Default for IdentityProviderSettings {
    fn default() -> Self {
        Self {
            userinfo_url: "https://gitlab.com/oauth/userinfo".to_string(),
            group_prefix: "lsit-tutoring-platform/".to_string(),
            request_timeout: 10,
        }
    }
}

impl IdentityProviderSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            userinfo_url: env::var("IDP_USERINFO_URL")
                .or_else(|_| env::var("GITLAB_API_URL"))
                .unwrap_or(defaults.userinfo_url),
            group_prefix: env::var("IDP_GROUP_PREFIX").unwrap_or(defaults.group_prefix),
            request_timeout: env_or("IDP_REQUEST_TIMEOUT", defaults.request_timeout)?,
        })
    }
}

/// User directory database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Absent means the in-process user directory is used
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: env::var("DATABASE_URL").ok(),
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }
}

/// Local admin bootstrap settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapSettings {
    /// Bootstrap sessions are refused unless this is set
    pub local_mode: bool,
    pub admin_name: String,
    pub admin_email: String,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            local_mode: false,
            admin_name: "Admin".to_string(),
            admin_email: "admin@example.com".to_string(),
        }
    }
}

impl BootstrapSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            local_mode: env_or("LOCAL_MODE", defaults.local_mode)?,
            admin_name: env::var("ADMIN_NAME").unwrap_or(defaults.admin_name),
            admin_email: env::var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
        })
    }
}
