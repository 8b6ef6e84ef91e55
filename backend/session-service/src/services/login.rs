/// Login, signup completion and local admin bootstrap
///
/// ## Login
///
/// 1. Fetch the caller's profile from the identity provider
/// 2. Resolve the role from the profile groups
/// 3. Known email: issue a session for the user record
/// 4. Unknown email: hand back a short-lived signup token instead
///
/// The identity provider stays authoritative for roles: when a known user's
/// groups now resolve to a different role, the directory record is updated
/// before the session is issued, so later refreshes agree with it.
use crate::config::BootstrapSettings;
use crate::db::UserDirectory;
use crate::error::{Result, SessionError};
use crate::models::{LoginOutcome, NewUser, Role, SignupRequired, TokenClaims, TokenPair};
use crate::security::RoleResolver;
use crate::services::identity_exchange::IdentityProvider;
use crate::services::issuer::SessionIssuer;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct LoginService {
    identity_provider: Arc<dyn IdentityProvider>,
    resolver: RoleResolver,
    users: Arc<dyn UserDirectory>,
    issuer: SessionIssuer,
    bootstrap: BootstrapSettings,
}

impl LoginService {
    pub fn new(
        identity_provider: Arc<dyn IdentityProvider>,
        resolver: RoleResolver,
        users: Arc<dyn UserDirectory>,
        issuer: SessionIssuer,
        bootstrap: BootstrapSettings,
    ) -> Self {
        Self {
            identity_provider,
            resolver,
            users,
            issuer,
            bootstrap,
        }
    }

    pub async fn login(&self, provider_bearer: &str) -> Result<LoginOutcome> {
        let profile = self.identity_provider.fetch_profile(provider_bearer).await?;
        let role = self.resolver.resolve(profile.groups.as_slice());

        let existing = self.users.find_user_by_email(&profile.email).await?;
        let Some(mut user) = existing else {
            let signup = self.issuer.minter().mint_signup_at(
                &profile.sub,
                &profile.name,
                &profile.email,
                role,
                Utc::now().timestamp(),
            )?;
            info!(role = %role, "Unknown identity, signup required");
            return Ok(LoginOutcome::SignupRequired(SignupRequired::new(
                signup.token,
            )));
        };

        if user.role != role {
            info!(
                user_id = %user.id,
                from = %user.role,
                to = %role,
                "Role changed at the identity provider, syncing user record"
            );
            user = self
                .users
                .upsert_user(NewUser {
                    name: user.name.clone(),
                    email: user.email.clone(),
                    role,
                })
                .await?;
        }

        let issued = self.issuer.issue_session(&user).await?;
        Ok(LoginOutcome::LoggedIn(
            issued.into_token_pair(self.issuer.minter().lifetimes().access_secs),
        ))
    }

    pub async fn complete_signup(&self, signup_token: &str) -> Result<TokenPair> {
        self.complete_signup_at(signup_token, Utc::now().timestamp())
            .await
    }

    pub async fn complete_signup_at(&self, signup_token: &str, now: i64) -> Result<TokenPair> {
        let claims = match self.issuer.minter().decode_at(signup_token, now)? {
            TokenClaims::Signup(claims) if !claims.logged_in => claims,
            other => {
                warn!(kind = %other.kind(), "Non-signup token presented for signup");
                return Err(SessionError::WrongTokenKind);
            }
        };

        if now >= claims.exp {
            return Err(SessionError::Expired);
        }

        if self.users.find_user_by_email(&claims.email).await?.is_some() {
            debug!("Signup for an email that already has a user record");
            return Err(SessionError::UserAlreadyExists);
        }

        let user = self
            .users
            .create_user(NewUser {
                name: claims.name,
                email: claims.email,
                role: claims.role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "Signup completed");

        let issued = self.issuer.issue_session_at(&user, now).await?;
        Ok(issued.into_token_pair(self.issuer.minter().lifetimes().access_secs))
    }

    /// Admin session for local development, never refreshable
    pub async fn bootstrap_admin(&self) -> Result<TokenPair> {
        if !self.bootstrap.local_mode {
            warn!("Admin bootstrap requested outside local mode");
            return Err(SessionError::BootstrapDisabled);
        }

        let admin = self
            .users
            .upsert_user(NewUser {
                name: self.bootstrap.admin_name.clone(),
                email: self.bootstrap.admin_email.clone(),
                role: Role::Admin,
            })
            .await?;

        self.issuer.issue_bootstrap_session(&admin)
    }
}
