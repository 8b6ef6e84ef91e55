use crate::models::Role;
use crypto_core::CodecError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Wrong token kind presented")]
    WrongTokenKind,

    #[error("Renewal token revoked or expired")]
    Revoked,

    #[error("Token subject no longer exists")]
    UnknownSubject,

    #[error("Identity provider authentication failed (status {status:?}): {message}")]
    ExternalAuthFailure {
        status: Option<u16>,
        message: String,
    },

    #[error("Insufficient privileges, requires one of {required:?}")]
    Forbidden { required: Vec<Role> },

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Admin bootstrap is only available in local mode")]
    BootstrapDisabled,

    #[error("Revocation store error: {0}")]
    Store(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// What a caller is allowed to learn about a failure
///
/// Every credential-check failure collapses into `Unauthenticated` so a
/// client cannot probe which check rejected its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Unauthenticated,
    LoginFailed,
    Forbidden,
    Conflict,
    Internal,
}

impl AuthOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            AuthOutcome::Unauthenticated | AuthOutcome::LoginFailed => 401,
            AuthOutcome::Forbidden => 403,
            AuthOutcome::Conflict => 409,
            AuthOutcome::Internal => 500,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthOutcome::Unauthenticated => "Not authenticated, please log in again",
            AuthOutcome::LoginFailed => "Authentication with the identity provider failed, please retry login",
            AuthOutcome::Forbidden => "Insufficient privileges",
            AuthOutcome::Conflict => "User already exists",
            AuthOutcome::Internal => "Internal server error",
        }
    }
}

impl SessionError {
    /// Map to the user-visible outcome
    pub fn outcome(&self) -> AuthOutcome {
        match self {
            SessionError::MalformedToken(_)
            | SessionError::InvalidSignature
            | SessionError::Expired
            | SessionError::WrongTokenKind
            | SessionError::Revoked
            | SessionError::UnknownSubject => AuthOutcome::Unauthenticated,
            SessionError::ExternalAuthFailure { .. } => AuthOutcome::LoginFailed,
            SessionError::Forbidden { .. } | SessionError::BootstrapDisabled => {
                AuthOutcome::Forbidden
            }
            SessionError::UserAlreadyExists => AuthOutcome::Conflict,
            SessionError::Store(_)
            | SessionError::Database(_)
            | SessionError::Configuration(_)
            | SessionError::Internal(_) => {
                // Don't leak internal details
                AuthOutcome::Internal
            }
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.outcome() == AuthOutcome::Unauthenticated
    }

    /// Only a failed exchange with the identity provider is worth retrying,
    /// by restarting the login flow. Everything else needs fresh credentials.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::ExternalAuthFailure { .. })
    }
}

// Conversions from external error types
impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedToken(msg) => SessionError::MalformedToken(msg),
            CodecError::InvalidSignature => SessionError::InvalidSignature,
            CodecError::Expired => SessionError::Expired,
            CodecError::InvalidKey(msg) => SessionError::Configuration(msg),
            CodecError::Encoding(msg) => {
                tracing::error!("Token encoding failed: {}", msg);
                SessionError::Internal(msg)
            }
        }
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        tracing::error!("Redis error: {}", err);
        SessionError::Store(err.to_string())
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        SessionError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        tracing::warn!("Identity provider request failed: {}", err);
        SessionError::ExternalAuthFailure {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
