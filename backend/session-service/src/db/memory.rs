//! In-process user directory for local runs and tests
use super::UserDirectory;
use crate::error::{Result, SessionError};
use crate::models::{NewUser, UserRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records, keeping their ids
    pub fn with_users(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    /// Drop a user, as an administrator deleting an account would
    pub async fn remove_user(&self, id: Uuid) -> Option<UserRecord> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(SessionError::UserAlreadyExists);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn upsert_user(&self, user: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().await;
        if let Some(existing) = users.values_mut().find(|u| u.email == user.email) {
            existing.name = user.name;
            existing.role = user.role;
            return Ok(existing.clone());
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            role: user.role,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }
}
