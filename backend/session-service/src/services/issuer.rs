/// Session issuance and revocation
///
/// ## Issuance order
///
/// 1. Fresh renewal id
/// 2. Renewal token signed
/// 3. Renewal id written to the revocation store
/// 4. Session token signed with the same renewal id
///
/// If the store write fails nothing is returned. A crash between 3 and 4
/// leaves an unused store entry that expires on its own.
use crate::error::Result;
use crate::models::{AuthenticatedUser, RenewalId, SessionBinding, TokenPair, UserRecord};
use crate::revocation::RevocationStore;
use crate::security::{MintedToken, TokenMinter};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Session token plus the renewal token it is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub renewal_id: RenewalId,
    pub access: MintedToken,
    pub refresh: MintedToken,
}

impl IssuedSession {
    pub fn into_token_pair(self, expires_in: i64) -> TokenPair {
        TokenPair::logged_in(self.access.token, Some(self.refresh.token), expires_in)
    }
}

#[derive(Clone)]
pub struct SessionIssuer {
    minter: TokenMinter,
    store: Arc<dyn RevocationStore>,
}

impl SessionIssuer {
    pub fn new(minter: TokenMinter, store: Arc<dyn RevocationStore>) -> Self {
        Self { minter, store }
    }

    pub fn minter(&self) -> &TokenMinter {
        &self.minter
    }

    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    pub async fn issue_session(&self, user: &UserRecord) -> Result<IssuedSession> {
        self.issue_session_at(user, Utc::now().timestamp()).await
    }

    pub async fn issue_session_at(&self, user: &UserRecord, now: i64) -> Result<IssuedSession> {
        let renewal_id = RenewalId::generate();

        let refresh = self.minter.mint_refresh_at(user.id, &renewal_id, now)?;

        self.store
            .put(
                &renewal_id,
                &user.id.to_string(),
                self.minter.lifetimes().refresh_ttl(),
            )
            .await?;

        let access = self.minter.mint_access_at(
            user,
            SessionBinding::Renewable(renewal_id.clone()),
            now,
        )?;

        info!(
            user_id = %user.id,
            role = %user.role,
            renewal_id = %renewal_id,
            backend = self.store.backend_name(),
            "Session issued"
        );

        Ok(IssuedSession {
            renewal_id,
            access,
            refresh,
        })
    }

    /// Session token with no renewal token and no store entry
    pub fn issue_bootstrap_session(&self, user: &UserRecord) -> Result<TokenPair> {
        let access =
            self.minter
                .mint_access_at(user, SessionBinding::Bootstrap, Utc::now().timestamp())?;

        info!(user_id = %user.id, role = %user.role, "Bootstrap session issued");

        Ok(TokenPair::logged_in(
            access.token,
            None,
            self.minter.lifetimes().access_secs,
        ))
    }

    /// Revoke a renewal id; revoking an unknown id is not an error
    pub async fn revoke(&self, renewal_id: &RenewalId) -> Result<()> {
        self.store.delete(renewal_id).await?;
        info!(renewal_id = %renewal_id, "Renewal id revoked");
        Ok(())
    }

    pub async fn logout(&self, identity: &AuthenticatedUser) -> Result<()> {
        match identity.renewal_id() {
            Some(renewal_id) => self.revoke(renewal_id).await,
            None => {
                debug!(user_id = %identity.user_id, "Logout of bootstrap session, nothing to revoke");
                Ok(())
            }
        }
    }
}
