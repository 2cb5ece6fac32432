//! OAuth provider abstraction.
//!
//! Providers are picked from configuration at startup. The GitHub and Google
//! variants build real authorization URLs, but code exchange is not wired up:
//! `validate_authorization_code` reports the provider as unconfigured, which
//! the callback routes turn into a client-facing error.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::Url;

use crate::config::{AuthConfig, OAuthClientConfig};

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// The provider rejected the code, or the flow is not available here.
    #[error("{0}")]
    Request(String),

    #[error("invalid authorization URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Identity returned by a provider after a successful code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderUser {
    pub provider_id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn authorization_url(
        &self,
        state: &str,
        code_verifier: Option<&str>,
        scopes: &[&str],
    ) -> Result<Url, OAuthError>;

    async fn validate_authorization_code(
        &self,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<ProviderUser, OAuthError>;
}

fn random_token(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Opaque CSRF state for the authorization redirect.
pub fn generate_state() -> String {
    random_token(16)
}

/// PKCE code verifier.
pub fn generate_code_verifier() -> String {
    random_token(32)
}

/// S256 PKCE challenge for a verifier.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

pub struct GitHubProvider {
    client: OAuthClientConfig,
}

impl GitHubProvider {
    pub fn new(client: OAuthClientConfig) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn authorization_url(
        &self,
        state: &str,
        _code_verifier: Option<&str>,
        scopes: &[&str],
    ) -> Result<Url, OAuthError> {
        let mut url = Url::parse("https://github.com/login/oauth/authorize")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client.client_id)
            .append_pair("state", state)
            .append_pair("scope", &scopes.join(" "));
        Ok(url)
    }

    async fn validate_authorization_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<ProviderUser, OAuthError> {
        Err(OAuthError::Request(
            "GitHub OAuth is not configured in this environment.".to_string(),
        ))
    }
}

pub struct GoogleProvider {
    client: OAuthClientConfig,
    callback_url: String,
}

impl GoogleProvider {
    pub fn new(client: OAuthClientConfig, callback_url: &str) -> Self {
        Self {
            client,
            callback_url: callback_url.to_string(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorization_url(
        &self,
        state: &str,
        code_verifier: Option<&str>,
        scopes: &[&str],
    ) -> Result<Url, OAuthError> {
        let mut url = Url::parse("https://accounts.google.com/o/oauth2/v2/auth")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client.client_id)
                .append_pair("redirect_uri", &self.callback_url)
                .append_pair("state", state)
                .append_pair("scope", &scopes.join(" "));
            if let Some(verifier) = code_verifier {
                query
                    .append_pair("code_challenge", &code_challenge(verifier))
                    .append_pair("code_challenge_method", "S256");
            }
        }
        Ok(url)
    }

    async fn validate_authorization_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<ProviderUser, OAuthError> {
        Err(OAuthError::Request(
            "Google OAuth is not configured in this environment.".to_string(),
        ))
    }
}

/// Stand-in used when no client credentials are configured. Redirects to a
/// placeholder URL that carries the state.
pub struct UnconfiguredProvider {
    name: &'static str,
}

impl UnconfiguredProvider {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl OAuthProvider for UnconfiguredProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn authorization_url(
        &self,
        state: &str,
        _code_verifier: Option<&str>,
        _scopes: &[&str],
    ) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&format!("https://example.com/{}/oauth", self.name))?;
        url.query_pairs_mut().append_pair("state", state);
        Ok(url)
    }

    async fn validate_authorization_code(
        &self,
        _code: &str,
        _code_verifier: Option<&str>,
    ) -> Result<ProviderUser, OAuthError> {
        Err(OAuthError::Request(format!(
            "{} OAuth is not configured in this environment.",
            self.name
        )))
    }
}

#[derive(Clone)]
pub struct OAuthProviders {
    pub github: Arc<dyn OAuthProvider>,
    pub google: Arc<dyn OAuthProvider>,
}

impl OAuthProviders {
    pub fn from_config(config: &AuthConfig) -> Self {
        let github: Arc<dyn OAuthProvider> = match &config.github {
            Some(client) => Arc::new(GitHubProvider::new(client.clone())),
            None => Arc::new(UnconfiguredProvider::new("github")),
        };
        let google: Arc<dyn OAuthProvider> = match &config.google {
            Some(client) => Arc::new(GoogleProvider::new(
                client.clone(),
                &config.google_callback_url,
            )),
            None => Arc::new(UnconfiguredProvider::new("google")),
        };
        Self { github, google }
    }
}
