use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub github_id: Option<String>,
    pub google_id: Option<String>,
}

/// The user fields exposed over the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate {field}")]
    Duplicate { field: &'static str },

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for users and sessions.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_github_id(&self, github_id: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError>;
    async fn first_user(&self) -> Result<Option<User>, StoreError>;
    async fn create_user(&self, user: User) -> Result<(), StoreError>;
    async fn update_profile(
        &self,
        id: &str,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<User, StoreError>;

    async fn insert_session(&self, session: Session) -> Result<(), StoreError>;
    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError>;
    async fn set_session_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn delete_session(&self, id: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: HashMap<String, Session>,
}

/// In-process store. Users keep insertion order so `first_user` is stable.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_user_by_github_id(&self, github_id: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.github_id.as_deref() == Some(github_id))
            .cloned())
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn first_user(&self) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.first().cloned())
    }

    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for existing in &tables.users {
            if existing.id == user.id {
                return Err(StoreError::Duplicate { field: "id" });
            }
            if existing.username == user.username {
                return Err(StoreError::Duplicate { field: "username" });
            }
            if user.email.is_some() && existing.email == user.email {
                return Err(StoreError::Duplicate { field: "email" });
            }
            if user.github_id.is_some() && existing.github_id == user.github_id {
                return Err(StoreError::Duplicate { field: "github_id" });
            }
            if user.google_id.is_some() && existing.google_id == user.google_id {
                return Err(StoreError::Duplicate { field: "google_id" });
            }
        }
        tables.users.push(user);
        Ok(())
    }

    async fn update_profile(
        &self,
        id: &str,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &email {
            if tables
                .users
                .iter()
                .any(|u| u.id != id && u.email.as_ref() == Some(email))
            {
                return Err(StoreError::Duplicate { field: "email" });
            }
        }

        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::UserNotFound(id.to_string()))?;
        if name.is_some() {
            user.name = name;
        }
        if email.is_some() {
            user.email = email;
        }
        Ok(user.clone())
    }

    async fn insert_session(&self, session: Session) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.users.iter().any(|u| u.id == session.user_id) {
            return Err(StoreError::UserNotFound(session.user_id));
        }
        tables.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.tables.read().await.sessions.get(id).cloned())
    }

    async fn set_session_expiry(
        &self,
        id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(session) = self.tables.write().await.sessions.get_mut(id) {
            session.expires_at = expires_at;
        }
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), StoreError> {
        self.tables.write().await.sessions.remove(id);
        Ok(())
    }
}
