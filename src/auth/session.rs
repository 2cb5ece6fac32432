use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use rand::Rng;
use std::sync::Arc;

use super::AuthError;
use super::store::{Session, User, UserStore};

pub const SESSION_COOKIE_NAME: &str = "auth_session";
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random lowercase alphanumeric identifier.
pub fn generate_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// A `Set-Cookie` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub max_age: Option<i64>,
}

impl Cookie {
    pub fn new(name: &str, value: &str, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            http_only: true,
            secure,
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, secs: i64) -> Self {
        self.max_age = Some(secs);
        self
    }

    pub fn serialize(&self) -> String {
        let mut out = format!("{}={}; Path=/; SameSite=Lax", self.name, self.value);
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={}", max_age));
        }
        out
    }
}

/// Looks up one cookie from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

/// Result of validating a session id.
#[derive(Debug, Clone)]
pub struct ValidatedSession {
    pub session: Session,
    pub user: User,
    /// The expiry was pushed out during validation; the client needs a new cookie.
    pub fresh: bool,
}

pub struct SessionManager {
    store: Arc<dyn UserStore>,
    lifetime: Duration,
    secure_cookies: bool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn UserStore>, secure_cookies: bool) -> Self {
        Self {
            store,
            lifetime: Duration::days(30),
            secure_cookies,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    pub async fn create_session(&self, user_id: &str) -> Result<Session, AuthError> {
        let session = Session {
            id: generate_id(40),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + self.lifetime,
        };
        self.store.insert_session(session.clone()).await?;
        tracing::debug!(user_id, "Created session");
        Ok(session)
    }

    /// Expired or orphaned sessions are deleted and yield `None`. A session in
    /// the second half of its lifetime is extended.
    pub async fn validate_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ValidatedSession>, AuthError> {
        let Some(mut session) = self.store.find_session(session_id).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if session.expires_at <= now {
            self.store.delete_session(session_id).await?;
            return Ok(None);
        }

        let Some(user) = self.store.find_user(&session.user_id).await? else {
            self.store.delete_session(session_id).await?;
            return Ok(None);
        };

        let mut fresh = false;
        if session.expires_at - now < self.lifetime / 2 {
            session.expires_at = now + self.lifetime;
            self.store
                .set_session_expiry(&session.id, session.expires_at)
                .await?;
            fresh = true;
        }

        Ok(Some(ValidatedSession {
            session,
            user,
            fresh,
        }))
    }

    pub async fn invalidate_session(&self, session_id: &str) -> Result<(), AuthError> {
        self.store.delete_session(session_id).await?;
        Ok(())
    }

    pub fn read_session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        read_cookie(headers, SESSION_COOKIE_NAME)
    }

    pub fn session_cookie(&self, session: &Session) -> Cookie {
        Cookie::new(SESSION_COOKIE_NAME, &session.id, self.secure_cookies)
    }

    pub fn blank_session_cookie(&self) -> Cookie {
        Cookie::new(SESSION_COOKIE_NAME, "", self.secure_cookies).with_max_age(0)
    }
}
