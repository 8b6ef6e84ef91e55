/// Refresh flow: new session token from a live renewal token
///
/// The renewal token carries only the subject id. Name, email and role are
/// re-read from the user directory on every refresh so changes show up in
/// the next session token. The renewal token itself is not rotated.
use crate::db::UserDirectory;
use crate::error::{Result, SessionError};
use crate::models::{SessionBinding, TokenClaims, TokenPair};
use crate::revocation::RevocationStore;
use crate::security::TokenMinter;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct RefreshFlow {
    minter: TokenMinter,
    store: Arc<dyn RevocationStore>,
    users: Arc<dyn UserDirectory>,
}

impl RefreshFlow {
    pub fn new(
        minter: TokenMinter,
        store: Arc<dyn RevocationStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            minter,
            store,
            users,
        }
    }

    pub async fn refresh(&self, renewal_token: &str) -> Result<TokenPair> {
        self.refresh_at(renewal_token, Utc::now().timestamp()).await
    }

    pub async fn refresh_at(&self, renewal_token: &str, now: i64) -> Result<TokenPair> {
        let claims = match self.minter.decode_at(renewal_token, now)? {
            TokenClaims::Refresh(claims) if claims.refresh => claims,
            other => {
                warn!(kind = %other.kind(), "Non-renewal token presented for refresh");
                return Err(SessionError::WrongTokenKind);
            }
        };

        if now >= claims.exp {
            return Err(SessionError::Expired);
        }

        let renewal_id = &claims.refresh_token_id;
        match self.store.get(renewal_id).await? {
            Some(subject) if subject == claims.sub.to_string() => {}
            Some(_) => {
                warn!(
                    user_id = %claims.sub,
                    renewal_id = %renewal_id,
                    "Renewal id bound to a different subject"
                );
                return Err(SessionError::Revoked);
            }
            None => {
                info!(user_id = %claims.sub, renewal_id = %renewal_id, "Refresh with revoked renewal id");
                return Err(SessionError::Revoked);
            }
        }

        let user = self
            .users
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "Refresh for a user that no longer exists");
                SessionError::UnknownSubject
            })?;

        let access = self.minter.mint_access_at(
            &user,
            SessionBinding::Renewable(renewal_id.clone()),
            now,
        )?;

        info!(user_id = %user.id, role = %user.role, renewal_id = %renewal_id, "Session refreshed");

        Ok(TokenPair::logged_in(
            access.token,
            Some(renewal_token.to_string()),
            self.minter.lifetimes().access_secs,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockUserDirectory;
    use crate::models::{RenewalClaims, RenewalId, Role, UserRecord};
    use crate::revocation::MemoryRevocationStore;
    use crate::security::TokenLifetimes;
    use crypto_core::{Algorithm, JwtCodec};
    use std::time::Duration;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;

    fn codec() -> JwtCodec {
        JwtCodec::from_secret("refresh-test-secret", Algorithm::HS256).unwrap()
    }

    fn minter() -> TokenMinter {
        TokenMinter::new(codec(), TokenLifetimes::default())
    }

    fn user(id: Uuid, role: Role) -> UserRecord {
        UserRecord {
            id,
            name: "Ada".into(),
            email: "ada@example.com".into(),
            role,
        }
    }

    async fn live_renewal(store: &MemoryRevocationStore, minter: &TokenMinter, sub: Uuid) -> String {
        let rid = RenewalId::generate();
        store
            .put(&rid, &sub.to_string(), Duration::from_secs(600))
            .await
            .unwrap();
        minter.mint_refresh_at(sub, &rid, NOW).unwrap().token
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let minter = minter();
        let store = Arc::new(MemoryRevocationStore::new());
        let sub = Uuid::new_v4();
        let token = live_renewal(&store, &minter, sub).await;

        let mut users = MockUserDirectory::new();
        users
            .expect_find_user_by_id()
            .withf(move |id| *id == sub)
            .times(1)
            .returning(move |id| Ok(Some(user(id, Role::Admin))));

        let flow = RefreshFlow::new(minter.clone(), store, Arc::new(users));
        let pair = flow.refresh_at(&token, NOW + 60).await.unwrap();

        assert_eq!(pair.refresh_token.as_deref(), Some(token.as_str()));
        match minter.decode_at(&pair.access_token, NOW + 60).unwrap() {
            TokenClaims::Access(claims) => assert_eq!(claims.role, Role::Admin),
            other => panic!("expected access token, got {}", other.kind()),
        }
    }

    #[tokio::test]
    async fn test_revoked_id_fails_before_directory_lookup() {
        let minter = minter();
        let store = Arc::new(MemoryRevocationStore::new());
        let token = minter
            .mint_refresh_at(Uuid::new_v4(), &RenewalId::generate(), NOW)
            .unwrap()
            .token;

        let mut users = MockUserDirectory::new();
        users.expect_find_user_by_id().times(0);

        let flow = RefreshFlow::new(minter, store, Arc::new(users));
        let err = flow.refresh_at(&token, NOW).await.unwrap_err();
        assert!(matches!(err, SessionError::Revoked));
    }

    #[tokio::test]
    async fn test_subject_mismatch_is_revoked() {
        let minter = minter();
        let store = Arc::new(MemoryRevocationStore::new());
        let rid = RenewalId::generate();
        store
            .put(&rid, &Uuid::new_v4().to_string(), Duration::from_secs(600))
            .await
            .unwrap();
        let token = minter.mint_refresh_at(Uuid::new_v4(), &rid, NOW).unwrap().token;

        let flow = RefreshFlow::new(minter, store, Arc::new(MockUserDirectory::new()));
        let err = flow.refresh_at(&token, NOW).await.unwrap_err();
        assert!(matches!(err, SessionError::Revoked));
    }

    #[tokio::test]
    async fn test_deleted_user_is_unknown_subject() {
        let minter = minter();
        let store = Arc::new(MemoryRevocationStore::new());
        let token = live_renewal(&store, &minter, Uuid::new_v4()).await;

        let mut users = MockUserDirectory::new();
        users.expect_find_user_by_id().returning(|_| Ok(None));

        let flow = RefreshFlow::new(minter, store, Arc::new(users));
        let err = flow.refresh_at(&token, NOW).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSubject));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn test_renewal_token_without_refresh_flag_rejected() {
        let store = Arc::new(MemoryRevocationStore::new());
        let sub = Uuid::new_v4();
        let rid = RenewalId::generate();
        store
            .put(&rid, &sub.to_string(), Duration::from_secs(600))
            .await
            .unwrap();
        let token = codec()
            .encode(&TokenClaims::Refresh(RenewalClaims {
                sub,
                refresh: false,
                iat: NOW,
                exp: NOW + 600,
                refresh_token_id: rid,
            }))
            .unwrap();

        let mut users = MockUserDirectory::new();
        users.expect_find_user_by_id().times(0);

        let flow = RefreshFlow::new(minter(), store, Arc::new(users));
        let err = flow.refresh_at(&token, NOW).await.unwrap_err();
        assert!(matches!(err, SessionError::WrongTokenKind));
    }

    #[tokio::test]
    async fn test_session_token_rejected() {
        let minter = minter();
        let session = minter
            .mint_access_at(
                &user(Uuid::new_v4(), Role::Student),
                SessionBinding::Renewable(RenewalId::generate()),
                NOW,
            )
            .unwrap();

        let flow = RefreshFlow::new(
            minter,
            Arc::new(MemoryRevocationStore::new()),
            Arc::new(MockUserDirectory::new()),
        );
        let err = flow.refresh_at(&session.token, NOW).await.unwrap_err();
        assert!(matches!(err, SessionError::WrongTokenKind));
    }

    #[tokio::test]
    async fn test_expired_renewal_token() {
        let minter = minter();
        let store = Arc::new(MemoryRevocationStore::new());
        let token = live_renewal(&store, &minter, Uuid::new_v4()).await;
        let expires_at = NOW + minter.lifetimes().refresh_secs;

        let flow = RefreshFlow::new(minter, store, Arc::new(MockUserDirectory::new()));
        let err = flow.refresh_at(&token, expires_at).await.unwrap_err();
        assert!(matches!(err, SessionError::Expired));
    }
}
