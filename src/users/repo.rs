use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::User;
use crate::error::{AppError, Result};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: User) -> Result<User>;
    async fn update(&self, user: User) -> Result<User>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn get(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Ordered by name, then email.
    async fn get_all(&self) -> Result<Vec<User>>;
    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, User>, email: &str, except: Uuid) -> bool {
    users
        .values()
        .any(|u| u.id != except && u.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn save(&self, user: User) -> Result<User> {
        let mut guard = self.users.write().await;
        if guard.contains_key(&user.id) {
            return Err(AppError::Conflict(format!("user {} already exists", user.id)));
        }
        if email_taken(&guard, &user.email, user.id) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut guard = self.users.write().await;
        if !guard.contains_key(&user.id) {
            return Err(AppError::NotFound(format!("user {}", user.id)));
        }
        if email_taken(&guard, &user.email, user.id) {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        guard.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().await.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.email.cmp(&b.email)));
        Ok(users)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<bool> {
        let mut guard = self.users.write().await;
        Ok(guard
            .get_mut(&id)
            .map(|u| u.enabled = enabled)
            .is_some())
    }
}
