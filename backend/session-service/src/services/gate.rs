/// Verification gate for protected requests
///
/// Every check here is a precondition for every protected call, so the gate
/// re-checks the session flag and expiry itself instead of trusting that the
/// codec did.
use crate::error::{Result, SessionError};
use crate::models::{AuthenticatedUser, TokenClaims};
use crate::security::{RoleGuard, TokenMinter};
use chrono::Utc;
use tracing::debug;

#[derive(Clone)]
pub struct VerificationGate {
    minter: TokenMinter,
}

impl VerificationGate {
    pub fn new(minter: TokenMinter) -> Self {
        Self { minter }
    }

    pub fn authenticate(&self, session_token: &str) -> Result<AuthenticatedUser> {
        self.authenticate_at(session_token, Utc::now().timestamp())
    }

    pub fn authenticate_at(&self, session_token: &str, now: i64) -> Result<AuthenticatedUser> {
        let claims = self.minter.decode_at(session_token, now).map_err(|err| {
            debug!(reason = %err, "Session token rejected");
            err
        })?;

        let claims = match claims {
            TokenClaims::Access(claims) => claims,
            other => {
                debug!(kind = %other.kind(), "Non-session token presented to the gate");
                return Err(SessionError::WrongTokenKind);
            }
        };

        if !claims.logged_in {
            debug!(user_id = %claims.sub, "Session flag not set");
            return Err(SessionError::WrongTokenKind);
        }

        if now >= claims.exp {
            debug!(user_id = %claims.sub, "Session token expired");
            return Err(SessionError::Expired);
        }

        Ok(AuthenticatedUser::from(claims))
    }

    /// Authenticate, then apply a role guard
    pub fn authorize(&self, session_token: &str, guard: &RoleGuard) -> Result<AuthenticatedUser> {
        let identity = self.authenticate(session_token)?;
        guard.check(&identity)?;
        Ok(identity)
    }
}
