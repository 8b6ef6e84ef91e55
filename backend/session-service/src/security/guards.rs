//! Role-based authorization guards
//!
//! Everything funnels through [`require_role`]; the named guards only pick
//! the allowed set.
use crate::error::{Result, SessionError};
use crate::models::{AuthenticatedUser, Role};
use tracing::warn;

/// Pass `identity` through if its role is one of `allowed_roles`
pub fn require_role<'a>(
    identity: &'a AuthenticatedUser,
    allowed_roles: &[Role],
) -> Result<&'a AuthenticatedUser> {
    if allowed_roles.contains(&identity.role) {
        return Ok(identity);
    }

    warn!(
        user_id = %identity.user_id,
        role = %identity.role,
        required = ?allowed_roles,
        "Role check failed"
    );
    Err(SessionError::Forbidden {
        required: allowed_roles.to_vec(),
    })
}

/// A reusable allowed-role set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGuard {
    allowed: Vec<Role>,
}

impl RoleGuard {
    pub fn any_of(roles: &[Role]) -> Self {
        Self {
            allowed: roles.to_vec(),
        }
    }

    pub fn admin_only() -> Self {
        Self::any_of(&[Role::Admin])
    }

    pub fn student_only() -> Self {
        Self::any_of(&[Role::Student])
    }

    pub fn tutor_only() -> Self {
        Self::any_of(&[Role::Tutor])
    }

    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    pub fn check<'a>(&self, identity: &'a AuthenticatedUser) -> Result<&'a AuthenticatedUser> {
        require_role(identity, &self.allowed)
    }
}
