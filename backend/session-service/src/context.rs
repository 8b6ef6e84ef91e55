//! Wiring of the session core from configuration
//!
//! Backends are chosen here once. Everything downstream holds trait objects
//! and never branches on which backend is active.
use crate::config::Settings;
use crate::db::{InMemoryUserDirectory, PgUserDirectory, UserDirectory};
use crate::revocation::{self, RevocationStore};
use crate::security::{RoleResolver, TokenLifetimes, TokenMinter};
use crate::services::{
    HttpIdentityProvider, IdentityProvider, LoginService, RefreshFlow, SessionIssuer,
    VerificationGate,
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct SessionContext {
    pub issuer: SessionIssuer,
    pub gate: VerificationGate,
    pub refresh: RefreshFlow,
    pub login: LoginService,
    pub store: Arc<dyn RevocationStore>,
    pub users: Arc<dyn UserDirectory>,
}

impl SessionContext {
    /// Connect configured backends and assemble the flows
    ///
    /// Runs database migrations when a database is configured.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let store = revocation::build_store(settings)
            .await
            .context("Failed to initialize revocation store")?;

        let users: Arc<dyn UserDirectory> = match connect_database(settings).await? {
            Some(pool) => Arc::new(PgUserDirectory::new(pool)),
            None => {
                info!("DATABASE_URL not set, using in-memory user directory");
                Arc::new(InMemoryUserDirectory::new())
            }
        };

        let identity_provider = HttpIdentityProvider::new(&settings.identity_provider)
            .context("Failed to build identity provider client")?;

        Self::assemble(settings, store, users, Arc::new(identity_provider))
    }

    /// Assemble the flows around caller-supplied backends
    pub fn assemble(
        settings: &Settings,
        store: Arc<dyn RevocationStore>,
        users: Arc<dyn UserDirectory>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self> {
        let codec = settings.jwt.codec()?;
        let lifetimes = TokenLifetimes::from_settings(&settings.session)?;
        let minter = TokenMinter::new(codec, lifetimes);
        let resolver = RoleResolver::with_group_prefix(&settings.identity_provider.group_prefix);

        let issuer = SessionIssuer::new(minter.clone(), store.clone());
        let gate = VerificationGate::new(minter.clone());
        let refresh = RefreshFlow::new(minter, store.clone(), users.clone());
        let login = LoginService::new(
            identity_provider,
            resolver,
            users.clone(),
            issuer.clone(),
            settings.bootstrap.clone(),
        );

        Ok(Self {
            issuer,
            gate,
            refresh,
            login,
            store,
            users,
        })
    }
}

async fn connect_database(settings: &Settings) -> Result<Option<PgPool>> {
    let Some(url) = settings.database.url.as_deref() else {
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    Ok(Some(pool))
}
