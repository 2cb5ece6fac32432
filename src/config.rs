use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            environment: Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub base_url: String,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub github: Option<OAuthClientConfig>,
    pub google: Option<OAuthClientConfig>,
    pub google_callback_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            github: None,
            google: None,
            google_callback_url: "http://localhost:3000/api/auth/google/callback".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

impl Config {
    /// Defaults, then the first config file found, then `.env` and the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = directories::ProjectDirs::from("com", "local", "assistd")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .filter(|path| path.exists())
            .unwrap_or_else(|| PathBuf::from("config.toml"));

        let mut config = if config_path.exists() {
            tracing::debug!("Loading config from {:?}", config_path);
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlays environment variables on top of the file configuration.
    pub fn apply_env<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {:?}: {}", port, e))?;
        }
        if let Some(env) = var("APP_ENV") {
            self.server.environment = env.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        }
        if let Some(url) = var("OLLAMA_HOST") {
            self.llm.base_url = url;
        }
        if let Some(model) = var("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = var("EMBED_SERVICE_URL") {
            self.retrieval.base_url = url;
        }
        if let (Some(client_id), Some(client_secret)) =
            (var("GITHUB_CLIENT_ID"), var("GITHUB_CLIENT_SECRET"))
        {
            self.auth.github = Some(OAuthClientConfig {
                client_id,
                client_secret,
            });
        }
        if let (Some(client_id), Some(client_secret)) =
            (var("GOOGLE_CLIENT_ID"), var("GOOGLE_CLIENT_SECRET"))
        {
            self.auth.google = Some(OAuthClientConfig {
                client_id,
                client_secret,
            });
        }
        if let Some(url) = var("GOOGLE_CALLBACK_URL") {
            self.auth.google_callback_url = url;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.environment == Environment::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_point_at_local_services() {
        let config = Config::default();
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.model, "llama3.2");
        assert_eq!(config.retrieval.base_url, "http://localhost:8000");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config: Config = toml::from_str(
            r#"
            [llm]
            model = "mistral"

            [server]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.base_url, "http://localhost:11434");

        let vars = env(&[
            ("OLLAMA_HOST", "http://gpu-box:11434"),
            ("PORT", "4000"),
            ("APP_ENV", "production"),
        ]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.llm.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.server.port, 4000);
        assert!(config.is_production());
    }

    #[test]
    fn oauth_clients_need_both_id_and_secret() {
        let mut config = Config::default();
        let vars = env(&[("GITHUB_CLIENT_ID", "abc")]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert!(config.auth.github.is_none());

        let vars = env(&[("GITHUB_CLIENT_ID", "abc"), ("GITHUB_CLIENT_SECRET", "xyz")]);
        config.apply_env(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.auth.github.unwrap().client_id, "abc");
    }

    #[test]
    fn bad_port_is_an_error() {
        let mut config = Config::default();
        let vars = env(&[("PORT", "not-a-port")]);
        assert!(config.apply_env(|k| vars.get(k).cloned()).is_err());
    }
}
