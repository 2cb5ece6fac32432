pub mod oauth;
pub mod password;
pub mod session;
pub mod store;

pub use oauth::{OAuthError, OAuthProvider, OAuthProviders};
pub use session::{Cookie, SessionManager, ValidatedSession};
pub use store::{MemoryStore, PublicUser, Session, StoreError, User, UserStore};

use crate::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}
