//! Identity provider profile exchange against a stubbed userinfo endpoint

#[cfg(test)]
mod identity_exchange_tests {
    use std::sync::Arc;

    use session_service::config::{IdentityProviderSettings, Settings};
    use session_service::db::{InMemoryUserDirectory, UserDirectory};
    use session_service::models::{LoginOutcome, Role};
    use session_service::revocation::MemoryRevocationStore;
    use session_service::services::{HttpIdentityProvider, IdentityProvider};
    use session_service::{config::JwtSettings, SessionContext, SessionError};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USERINFO_PATH: &str = "/oauth/userinfo";

    fn settings_for(server: &MockServer) -> IdentityProviderSettings {
        IdentityProviderSettings {
            userinfo_url: format!("{}{}", server.uri(), USERINFO_PATH),
            request_timeout: 2,
            ..IdentityProviderSettings::default()
        }
    }

    fn profile_body(groups: &[&str]) -> serde_json::Value {
        serde_json::json!({
            "sub": "1234",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "groups": groups,
        })
    }

    #[tokio::test]
    async fn test_fetch_profile_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .and(header("authorization", "Bearer provider-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile_body(&["lsit-tutoring-platform/tutors"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&settings_for(&server)).unwrap();
        let profile = provider.fetch_profile("provider-token").await.unwrap();

        assert_eq!(profile.sub, "1234");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.groups, vec!["lsit-tutoring-platform/tutors"]);
    }

    #[tokio::test]
    async fn test_profile_with_groups_and_groups_direct() {
        let server = MockServer::start().await;
        let mut body = profile_body(&["lsit-tutoring-platform/admins"]);
        body["groups_direct"] = serde_json::json!(["lsit-tutoring-platform/students"]);
        body["preferred_username"] = serde_json::json!("ada");
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&settings_for(&server)).unwrap();
        let profile = provider.fetch_profile("provider-token").await.unwrap();

        assert_eq!(profile.groups, vec!["lsit-tutoring-platform/admins"]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&settings_for(&server)).unwrap();
        let err = provider.fetch_profile("expired").await.unwrap_err();

        match err {
            SessionError::ExternalAuthFailure { status, .. } => assert_eq!(status, Some(401)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreadable_profile_is_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let provider = HttpIdentityProvider::new(&settings_for(&server)).unwrap();
        let err = provider.fetch_profile("provider-token").await.unwrap_err();

        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_external_failure() {
        let settings = IdentityProviderSettings {
            userinfo_url: "http://127.0.0.1:1/oauth/userinfo".to_string(),
            request_timeout: 1,
            ..IdentityProviderSettings::default()
        };

        let provider = HttpIdentityProvider::new(&settings).unwrap();
        let err = provider.fetch_profile("provider-token").await.unwrap_err();

        assert!(matches!(err, SessionError::ExternalAuthFailure { .. }));
    }

    #[tokio::test]
    async fn test_login_through_http_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USERINFO_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(profile_body(&["lsit-tutoring-platform/admins"])),
            )
            .mount(&server)
            .await;

        let settings = Settings {
            jwt: JwtSettings::hmac("identity-exchange-test-secret"),
            identity_provider: settings_for(&server),
            ..Settings::default()
        };
        let users = Arc::new(InMemoryUserDirectory::new());
        let provider = HttpIdentityProvider::new(&settings.identity_provider).unwrap();
        let context = SessionContext::assemble(
            &settings,
            Arc::new(MemoryRevocationStore::new()),
            users.clone(),
            Arc::new(provider),
        )
        .unwrap();

        let outcome = context.login.login("provider-token").await.unwrap();
        let LoginOutcome::SignupRequired(signup) = outcome else {
            panic!("expected signup for a new identity");
        };

        let pair = context
            .login
            .complete_signup(&signup.signup_token)
            .await
            .unwrap();
        let identity = context.gate.authenticate(&pair.access_token).unwrap();
        assert_eq!(identity.role, Role::Admin);

        let stored = users
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, identity.user_id);
    }
}
