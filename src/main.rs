use anyhow::Result;
use assistd::cli::{Cli, Commands};
use assistd::config::Config;
use assistd::rag::{OllamaClient, Prompt};
use assistd::server::{self, rate_limit::RateLimiter};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { host, port } => handle_serve(&config, host, port).await?,
        Commands::Ask { prompt, json } => handle_ask(&config, &prompt, json).await?,
        Commands::Generate { prompt } => handle_generate(&config, &prompt).await?,
    }

    Ok(())
}

async fn handle_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let state = Arc::new(assistd::build_default_state(config));
    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));

    tracing::info!("LLM endpoint: {} ({})", config.llm.base_url, config.llm.model);
    let ollama = OllamaClient::new(&config.llm.base_url, &config.llm.model);
    if !ollama.health_check().await {
        tracing::warn!("Ollama is not reachable at {}; generation requests will fail", config.llm.base_url);
    }
    tracing::info!("Retrieval endpoint: {}", config.retrieval.base_url);
    if config.auth.github.is_none() || config.auth.google.is_none() {
        tracing::warn!("OAuth providers without credentials fall back to placeholders");
    }

    println!("Starting assistd on {}:{}", host, port);
    println!("Endpoints:");
    println!("  POST /api/generate - Send a prompt to the model");
    println!("  POST /api/ask      - Answer from retrieved documents");
    println!("  *    /api/auth/*   - Accounts and sessions");
    println!("  GET  /health       - Liveness probe");

    server::run_server(state, limiter, &host, port).await
}

async fn handle_ask(config: &Config, prompt: &str, json: bool) -> Result<()> {
    let prompt = Prompt::new(prompt)?;
    let pipeline = assistd::build_pipeline(config);
    let response = pipeline.answer(&prompt).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("Answer:\n{}\n", response.text);
        if !response.sources.is_empty() {
            println!("Sources:");
            for source in response.sources {
                let preview: String = source.content.chars().take(80).collect();
                match &source.id {
                    Some(id) => println!("  - {}: {}", id, preview),
                    None => println!("  - {}", preview),
                }
            }
        }
    }

    Ok(())
}

async fn handle_generate(config: &Config, prompt: &str) -> Result<()> {
    let prompt = Prompt::new(prompt)?;
    let pipeline = assistd::build_pipeline(config);
    println!("{}", pipeline.generate(&prompt).await?);
    Ok(())
}
