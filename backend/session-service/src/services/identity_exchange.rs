/// Identity provider profile exchange
///
/// Trades a caller's provider bearer token for the provider's view of who
/// the caller is. The provider's OAuth protocol itself is out of scope; this
/// module only defines the profile shape the session core consumes and
/// fetches it from the userinfo endpoint.
use crate::config::IdentityProviderSettings;
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Profile returned by the provider's userinfo endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserinfoPayload")]
pub struct ProviderProfile {
    /// Stable external subject id
    pub sub: String,
    pub name: String,
    pub email: String,
    pub groups: Vec<String>,
}

/// Userinfo body as sent; unknown fields are ignored
#[derive(Deserialize)]
struct UserinfoPayload {
    sub: String,
    name: String,
    email: String,
    #[serde(default)]
    groups: Vec<String>,
    #[serde(default)]
    groups_direct: Vec<String>,
}

impl From<UserinfoPayload> for ProviderProfile {
    fn from(payload: UserinfoPayload) -> Self {
        // `groups` wins; `groups_direct` only fills in when it is absent or empty
        let groups = if payload.groups.is_empty() {
            payload.groups_direct
        } else {
            payload.groups
        };

        Self {
            sub: payload.sub,
            name: payload.name,
            email: payload.email,
            groups,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_profile(&self, bearer_token: &str) -> Result<ProviderProfile>;
}

#[derive(Clone)]
pub struct HttpIdentityProvider {
    userinfo_url: String,
    http: Client,
}

impl HttpIdentityProvider {
    pub fn new(settings: &IdentityProviderSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout))
            .build()
            .map_err(|e| {
                SessionError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            userinfo_url: settings.userinfo_url.clone(),
            http,
        })
    }

    pub fn userinfo_url(&self) -> &str {
        &self.userinfo_url
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn fetch_profile(&self, bearer_token: &str) -> Result<ProviderProfile> {
        debug!(url = %self.userinfo_url, "Fetching identity provider profile");

        // No lock is held here; the request is the slowest step of a login.
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(bearer_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Identity provider rejected profile request");
            return Err(SessionError::ExternalAuthFailure {
                status: Some(status.as_u16()),
                message: format!("profile request returned {status}"),
            });
        }

        let profile = response.json::<ProviderProfile>().await.map_err(|e| {
            warn!(error = %e, "Identity provider returned an unreadable profile");
            SessionError::ExternalAuthFailure {
                status: Some(status.as_u16()),
                message: format!("invalid profile payload: {e}"),
            }
        })?;

        debug!(groups = profile.groups.len(), "Identity provider profile received");
        Ok(profile)
    }
}
