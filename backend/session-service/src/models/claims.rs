//! Claim sets for the three token kinds
//!
//! Every token carries a `token_type` discriminator. Decoding always goes
//! through [`TokenClaims`], so a caller holding a decoded token has to match
//! on its kind before it can reach kind-specific fields.
use super::Role;
use crypto_core::Expiring;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Revocation handle shared by a renewal token and the session tokens minted from it
///
/// Generated fresh for every renewal token from a v4 UUID (122 random bits)
/// and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenewalId(Uuid);

impl RenewalId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for RenewalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for RenewalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for RenewalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a session token relates to the revocation store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBinding {
    /// Tied to a live renewal token; revoking the id ends the session family
    Renewable(RenewalId),
    /// Local admin bootstrap session with no renewal token, never refreshable
    Bootstrap,
}

impl SessionBinding {
    pub fn renewal_id(&self) -> Option<&RenewalId> {
        match self {
            SessionBinding::Renewable(id) => Some(id),
            SessionBinding::Bootstrap => None,
        }
    }
}

/// Short-lived session ("access") token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Session flag; false on anything that is not a session token
    pub logged_in: bool,
    pub iat: i64,
    pub exp: i64,
    pub binding: SessionBinding,
}

/// Long-lived renewal ("refresh") token claims
///
/// Carries only the subject id on purpose: profile fields are re-read from
/// the user directory on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalClaims {
    pub sub: Uuid,
    /// Renewal flag
    pub refresh: bool,
    pub iat: i64,
    pub exp: i64,
    pub refresh_token_id: RenewalId,
}

/// One-time signup token for an identity that has no user record yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupClaims {
    /// Identity-provider subject, not an internal user id
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub logged_in: bool,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    Signup,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Signup => "signup",
        };
        f.write_str(name)
    }
}

/// Any decoded token, tagged by its `token_type` claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token_type", rename_all = "snake_case")]
pub enum TokenClaims {
    Access(SessionClaims),
    Refresh(RenewalClaims),
    Signup(SignupClaims),
}

impl TokenClaims {
    pub fn kind(&self) -> TokenKind {
        match self {
            TokenClaims::Access(_) => TokenKind::Access,
            TokenClaims::Refresh(_) => TokenKind::Refresh,
            TokenClaims::Signup(_) => TokenKind::Signup,
        }
    }
}

impl Expiring for TokenClaims {
    fn expires_at(&self) -> i64 {
        match self {
            TokenClaims::Access(c) => c.exp,
            TokenClaims::Refresh(c) => c.exp,
            TokenClaims::Signup(c) => c.exp,
        }
    }
}
