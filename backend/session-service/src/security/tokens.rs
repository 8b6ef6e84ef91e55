//! Token minting for the three token kinds
//!
//! `TokenMinter` is the only place that builds claim sets. Verification of a
//! specific kind lives with the caller that expects it (gate, refresh,
//! signup), on top of the kind-agnostic [`TokenMinter::decode_at`].
use crate::config::SessionSettings;
use crate::error::{Result, SessionError};
use crate::models::{
    RenewalClaims, RenewalId, Role, SessionBinding, SessionClaims, SignupClaims, TokenClaims,
    UserRecord,
};
use crypto_core::JwtCodec;
use std::time::Duration;
use uuid::Uuid;

/// Token lifetimes in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_secs: i64,
    pub refresh_secs: i64,
    pub signup_secs: i64,
}

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_DAY: i64 = 24 * 60 * 60;

fn to_secs(value: i64, unit_secs: i64, name: &str) -> Result<i64> {
    value.checked_mul(unit_secs).ok_or_else(|| {
        SessionError::Configuration(format!("{name} is too large to express in seconds"))
    })
}

impl TokenLifetimes {
    pub fn from_settings(settings: &SessionSettings) -> Result<Self> {
        Ok(Self {
            access_secs: to_secs(
                settings.access_token_expire_minutes,
                SECS_PER_MINUTE,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
            )?,
            refresh_secs: to_secs(
                settings.refresh_token_expire_days,
                SECS_PER_DAY,
                "REFRESH_TOKEN_EXPIRE_DAYS",
            )?,
            signup_secs: to_secs(
                settings.signup_token_expire_minutes,
                SECS_PER_MINUTE,
                "SIGNUP_TOKEN_EXPIRE_MINUTES",
            )?,
        })
    }

    /// Revocation store TTL for a renewal id
    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.refresh_secs).unwrap_or(0))
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access_secs: 60 * SECS_PER_MINUTE,
            refresh_secs: 7 * SECS_PER_DAY,
            signup_secs: 5 * SECS_PER_MINUTE,
        }
    }
}

fn expiry(issued_at: i64, lifetime_secs: i64) -> Result<i64> {
    issued_at.checked_add(lifetime_secs).ok_or_else(|| {
        SessionError::Configuration("token expiry overflows the timestamp range".to_string())
    })
}

/// A signed token and its `exp` instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedToken {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct TokenMinter {
    codec: JwtCodec,
    lifetimes: TokenLifetimes,
}

impl TokenMinter {
    pub fn new(codec: JwtCodec, lifetimes: TokenLifetimes) -> Self {
        Self { codec, lifetimes }
    }

    pub fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    pub fn mint_access_at(
        &self,
        user: &UserRecord,
        binding: SessionBinding,
        issued_at: i64,
    ) -> Result<MintedToken> {
        let expires_at = expiry(issued_at, self.lifetimes.access_secs)?;
        let claims = TokenClaims::Access(SessionClaims {
            sub: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            logged_in: true,
            iat: issued_at,
            exp: expires_at,
            binding,
        });

        Ok(MintedToken {
            token: self.codec.encode(&claims)?,
            expires_at,
        })
    }

    pub fn mint_refresh_at(
        &self,
        user_id: Uuid,
        renewal_id: &RenewalId,
        issued_at: i64,
    ) -> Result<MintedToken> {
        let expires_at = expiry(issued_at, self.lifetimes.refresh_secs)?;
        let claims = TokenClaims::Refresh(RenewalClaims {
            sub: user_id,
            refresh: true,
            iat: issued_at,
            exp: expires_at,
            refresh_token_id: renewal_id.clone(),
        });

        Ok(MintedToken {
            token: self.codec.encode(&claims)?,
            expires_at,
        })
    }

    pub fn mint_signup_at(
        &self,
        provider_subject: &str,
        name: &str,
        email: &str,
        role: Role,
        issued_at: i64,
    ) -> Result<MintedToken> {
        let expires_at = expiry(issued_at, self.lifetimes.signup_secs)?;
        let claims = TokenClaims::Signup(SignupClaims {
            sub: provider_subject.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            role,
            logged_in: false,
            iat: issued_at,
            exp: expires_at,
        });

        Ok(MintedToken {
            token: self.codec.encode(&claims)?,
            expires_at,
        })
    }

    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        self.decode_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify signature and expiry as of `now`, returning whichever kind the token is
    pub fn decode_at(&self, token: &str, now: i64) -> Result<TokenClaims> {
        Ok(self.codec.decode_at(token, now)?)
    }
}
