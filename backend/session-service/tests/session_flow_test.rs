//! End-to-end session lifecycle against the in-memory backends

#[cfg(test)]
mod session_flow_tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use session_service::config::{JwtSettings, Settings};
    use session_service::db::{InMemoryUserDirectory, UserDirectory};
    use session_service::models::{NewUser, Role, TokenClaims, UserRecord};
    use session_service::revocation::{MemoryRevocationStore, RevocationStore};
    use session_service::security::require_role;
    use session_service::services::{IdentityProvider, ProviderProfile};
    use session_service::{AuthOutcome, Result, SessionContext, SessionError};

    const NOW: i64 = 1_700_000_000;

    struct StaticProvider(ProviderProfile);

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        async fn fetch_profile(&self, _bearer_token: &str) -> Result<ProviderProfile> {
            Ok(self.0.clone())
        }
    }

    struct Harness {
        context: SessionContext,
        store: Arc<MemoryRevocationStore>,
        users: Arc<InMemoryUserDirectory>,
    }

    fn harness_with_secret(secret: &str) -> Harness {
        let settings = Settings {
            jwt: JwtSettings::hmac(secret),
            ..Settings::default()
        };
        let store = Arc::new(MemoryRevocationStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let provider = StaticProvider(ProviderProfile {
            sub: "ext-u1".into(),
            name: "u1".into(),
            email: "u1@example.com".into(),
            groups: vec![],
        });

        let context = SessionContext::assemble(
            &settings,
            store.clone(),
            users.clone(),
            Arc::new(provider),
        )
        .unwrap();

        Harness {
            context,
            store,
            users,
        }
    }

    fn harness() -> Harness {
        harness_with_secret("session-flow-test-secret")
    }

    async fn student_u1(harness: &Harness) -> UserRecord {
        harness
            .users
            .create_user(NewUser {
                name: "u1".into(),
                email: "u1@example.com".into(),
                role: Role::Student,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_revoke_blocks_refresh_but_not_live_session() {
        let harness = harness();
        let user = student_u1(&harness).await;

        let issued = harness.context.issuer.issue_session_at(&user, NOW).await.unwrap();

        let identity = harness
            .context
            .gate
            .authenticate_at(&issued.access.token, NOW + 1)
            .unwrap();
        assert_eq!(identity.role, Role::Student);
        assert_eq!(identity.user_id, user.id);

        let refreshed = harness
            .context
            .refresh
            .refresh_at(&issued.refresh.token, NOW + 2)
            .await
            .unwrap();
        assert_eq!(refreshed.refresh_token.as_deref(), Some(issued.refresh.token.as_str()));

        harness.context.issuer.revoke(&issued.renewal_id).await.unwrap();

        let err = harness
            .context
            .refresh
            .refresh_at(&issued.refresh.token, NOW + 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Revoked));
        assert_eq!(err.outcome(), AuthOutcome::Unauthenticated);

        // The renewal token itself still verifies; only the store entry is gone
        let claims = harness
            .context
            .issuer
            .minter()
            .decode_at(&issued.refresh.token, NOW + 3)
            .unwrap();
        assert!(matches!(claims, TokenClaims::Refresh(_)));

        // Outstanding session tokens live out their lifetime
        assert!(harness
            .context
            .gate
            .authenticate_at(&issued.access.token, NOW + 4)
            .is_ok());
        assert!(harness
            .context
            .gate
            .authenticate_at(&refreshed.access_token, NOW + 4)
            .is_ok());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let harness = harness();
        let user = student_u1(&harness).await;
        let issued = harness.context.issuer.issue_session_at(&user, NOW).await.unwrap();

        harness.context.issuer.revoke(&issued.renewal_id).await.unwrap();
        harness.context.issuer.revoke(&issued.renewal_id).await.unwrap();
        harness
            .context
            .issuer
            .revoke(&session_service::models::RenewalId::generate())
            .await
            .unwrap();

        assert!(harness.store.get(&issued.renewal_id).await.unwrap().is_none());
        assert!(harness.store.is_empty());
    }

    #[tokio::test]
    async fn test_logout_ends_refresh() {
        let harness = harness();
        let user = student_u1(&harness).await;
        let issued = harness.context.issuer.issue_session(&user).await.unwrap();

        let identity = harness.context.gate.authenticate(&issued.access.token).unwrap();
        harness.context.issuer.logout(&identity).await.unwrap();

        let err = harness
            .context
            .refresh
            .refresh(&issued.refresh.token)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Revoked));
    }

    #[tokio::test]
    async fn test_session_expiry_boundary() {
        let harness = harness();
        let user = student_u1(&harness).await;
        let issued = harness.context.issuer.issue_session_at(&user, NOW).await.unwrap();
        let exp = issued.access.expires_at;

        assert!(harness.context.gate.authenticate_at(&issued.access.token, exp - 1).is_ok());
        let err = harness
            .context
            .gate
            .authenticate_at(&issued.access.token, exp)
            .unwrap_err();
        assert!(matches!(err, SessionError::Expired));
        assert!(harness
            .context
            .gate
            .authenticate_at(&issued.access.token, exp + 1)
            .is_err());
    }

    #[tokio::test]
    async fn test_foreign_secret_is_invalid_signature() {
        let issuer_side = harness_with_secret("secret-of-another-deployment");
        let verifier_side = harness();
        let user = student_u1(&issuer_side).await;

        let issued = issuer_side
            .context
            .issuer
            .issue_session_at(&user, NOW)
            .await
            .unwrap();

        for token in [&issued.access.token, &issued.refresh.token] {
            let err = verifier_side
                .context
                .gate
                .authenticate_at(token, NOW)
                .unwrap_err();
            assert!(matches!(err, SessionError::InvalidSignature), "{err:?}");
        }

        let err = verifier_side
            .context
            .refresh
            .refresh_at(&issued.refresh.token, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_token_kinds_are_not_interchangeable() {
        let harness = harness();
        let user = student_u1(&harness).await;
        let issued = harness.context.issuer.issue_session_at(&user, NOW).await.unwrap();

        let err = harness
            .context
            .gate
            .authenticate_at(&issued.refresh.token, NOW)
            .unwrap_err();
        assert!(matches!(err, SessionError::WrongTokenKind));

        let err = harness
            .context
            .refresh
            .refresh_at(&issued.access.token, NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::WrongTokenKind));
    }

    #[tokio::test]
    async fn test_refresh_reflects_directory_changes() {
        let harness = harness();
        let user = student_u1(&harness).await;
        let issued = harness.context.issuer.issue_session_at(&user, NOW).await.unwrap();

        harness
            .users
            .upsert_user(NewUser {
                name: "u1 renamed".into(),
                email: "u1@example.com".into(),
                role: Role::Tutor,
            })
            .await
            .unwrap();

        let pair = harness
            .context
            .refresh
            .refresh_at(&issued.refresh.token, NOW + 10)
            .await
            .unwrap();
        let identity = harness
            .context
            .gate
            .authenticate_at(&pair.access_token, NOW + 10)
            .unwrap();
        assert_eq!(identity.role, Role::Tutor);
        assert_eq!(identity.display_name, "u1 renamed");

        harness.users.remove_user(user.id).await;
        let err = harness
            .context
            .refresh
            .refresh_at(&issued.refresh.token, NOW + 20)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownSubject));
    }

    #[tokio::test]
    async fn test_role_guards_on_authenticated_identity() {
        let harness = harness();
        let tutor = harness
            .users
            .create_user(NewUser {
                name: "t".into(),
                email: "t@example.com".into(),
                role: Role::Tutor,
            })
            .await
            .unwrap();
        let admin = harness
            .users
            .create_user(NewUser {
                name: "a".into(),
                email: "a@example.com".into(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        let tutor_session = harness.context.issuer.issue_session_at(&tutor, NOW).await.unwrap();
        let admin_session = harness.context.issuer.issue_session_at(&admin, NOW).await.unwrap();

        let tutor_identity = harness
            .context
            .gate
            .authenticate_at(&tutor_session.access.token, NOW)
            .unwrap();
        let admin_identity = harness
            .context
            .gate
            .authenticate_at(&admin_session.access.token, NOW)
            .unwrap();

        let err = require_role(&tutor_identity, &[Role::Admin]).unwrap_err();
        assert_eq!(err.outcome(), AuthOutcome::Forbidden);
        assert!(require_role(&admin_identity, &[Role::Admin, Role::Tutor]).is_ok());
    }

    #[tokio::test]
    async fn test_login_for_existing_user_issues_linked_pair() {
        let harness = harness();
        let user = student_u1(&harness).await;

        let outcome = harness.context.login.login("provider-token").await.unwrap();
        let session_service::models::LoginOutcome::LoggedIn(pair) = outcome else {
            panic!("expected logged in outcome");
        };

        let identity = harness.context.gate.authenticate(&pair.access_token).unwrap();
        assert_eq!(identity.user_id, user.id);
        assert_eq!(harness.store.len(), 1);

        let refresh_token = pair.refresh_token.unwrap();
        let refreshed = harness.context.refresh.refresh(&refresh_token).await.unwrap();
        assert_eq!(refreshed.status, "logged_in");
        assert_eq!(refreshed.token_type, "bearer");
    }
}
