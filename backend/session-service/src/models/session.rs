use serde::{Deserialize, Serialize};

pub const STATUS_LOGGED_IN: &str = "logged_in";
pub const STATUS_SIGNUP_REQUIRED: &str = "signup_required";

/// Tokens handed to a client after login, signup, refresh or bootstrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Absent for bootstrap sessions, which cannot be refreshed
    pub refresh_token: Option<String>,
    pub token_type: String,
    /// Session token lifetime in seconds
    pub expires_in: i64,
    pub status: String,
}

impl TokenPair {
    pub fn logged_in(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
            status: STATUS_LOGGED_IN.to_string(),
        }
    }
}

/// Returned when the identity provider knows the caller but no user record exists yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupRequired {
    pub message: String,
    pub status: String,
    pub signup_token: String,
    pub redirect_to: String,
}

impl SignupRequired {
    pub fn new(signup_token: String) -> Self {
        Self {
            message: "New user, sign up required".to_string(),
            status: STATUS_SIGNUP_REQUIRED.to_string(),
            redirect_to: format!("/auth/signup?token={signup_token}"),
            signup_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum LoginOutcome {
    LoggedIn(TokenPair),
    SignupRequired(SignupRequired),
}
