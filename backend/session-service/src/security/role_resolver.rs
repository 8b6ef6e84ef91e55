//! Group membership to role mapping
//!
//! The mapping table is ordered and the first matching entry wins, so a
//! subject in several mapped groups gets the role listed earliest.
use crate::models::Role;

pub const DEFAULT_GROUP_PREFIX: &str = "lsit-tutoring-platform/";

#[derive(Debug, Clone)]
pub struct RoleResolver {
    mappings: Vec<(String, Role)>,
    default_role: Role,
}

impl RoleResolver {
    pub fn new(mappings: Vec<(String, Role)>, default_role: Role) -> Self {
        Self {
            mappings,
            default_role,
        }
    }

    /// Standard table: `<prefix>admins`, `<prefix>students`, `<prefix>tutors`,
    /// in that order, defaulting to STUDENT
    pub fn with_group_prefix(prefix: &str) -> Self {
        Self::new(
            vec![
                (format!("{prefix}admins"), Role::Admin),
                (format!("{prefix}students"), Role::Student),
                (format!("{prefix}tutors"), Role::Tutor),
            ],
            Role::Student,
        )
    }

    pub fn mappings(&self) -> &[(String, Role)] {
        &self.mappings
    }

    /// Role of the first table entry whose group is in `groups`
    pub fn resolve<S: AsRef<str>>(&self, groups: &[S]) -> Role {
        self.mappings
            .iter()
            .find(|(group, _)| groups.iter().any(|g| g.as_ref() == group))
            .map(|(_, role)| *role)
            .unwrap_or(self.default_role)
    }
}

impl Default for RoleResolver {
    fn default() -> Self {
        Self::with_group_prefix(DEFAULT_GROUP_PREFIX)
    }
}
