/// User directory access
///
/// The session core reads the directory on login and on every refresh, and
/// writes to it on signup and when a login changes a user's role.
pub mod memory;
pub mod users;

pub use memory::InMemoryUserDirectory;
pub use users::PgUserDirectory;

use crate::error::Result;
use crate::models::{NewUser, UserRecord};
use async_trait::async_trait;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;

    /// Insert a new user; fails with `UserAlreadyExists` if the email is taken
    async fn create_user(&self, user: NewUser) -> Result<UserRecord>;

    /// Insert, or update name and role of the user with the same email
    async fn upsert_user(&self, user: NewUser) -> Result<UserRecord>;
}
