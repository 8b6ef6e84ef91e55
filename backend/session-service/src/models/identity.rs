use super::{RenewalId, Role, SessionBinding, SessionClaims};
use serde::Serialize;
use uuid::Uuid;

/// Identity established by a verified session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub binding: SessionBinding,
}

impl AuthenticatedUser {
    pub fn renewal_id(&self) -> Option<&RenewalId> {
        self.binding.renewal_id()
    }
}

impl From<SessionClaims> for AuthenticatedUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            display_name: claims.name,
            email: claims.email,
            role: claims.role,
            binding: claims.binding,
        }
    }
}
