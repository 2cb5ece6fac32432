pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod rag;
pub mod redact;
pub mod server;

pub use config::Config;
pub use error::AppError;

use std::sync::Arc;

use auth::{MemoryStore, OAuthProviders, SessionManager, UserStore};
use rag::{EmbedServiceClient, OllamaClient, RagPipeline};
use server::AppState;

pub fn build_pipeline(config: &Config) -> RagPipeline {
    let generator = Arc::new(OllamaClient::new(&config.llm.base_url, &config.llm.model));
    let retriever = Arc::new(EmbedServiceClient::new(&config.retrieval.base_url));
    RagPipeline::new(retriever, generator).with_top_k(config.retrieval.top_k)
}

/// Wires the clients, stores and providers the server shares across requests.
pub fn build_state(config: &Config, store: Arc<dyn UserStore>) -> AppState {
    AppState {
        pipeline: build_pipeline(config),
        sessions: SessionManager::new(store, config.is_production()),
        oauth: OAuthProviders::from_config(&config.auth),
        production: config.is_production(),
    }
}

pub fn build_default_state(config: &Config) -> AppState {
    build_state(config, Arc::new(MemoryStore::new()))
}
