#![allow(dead_code)]

use assistd::auth::{MemoryStore, OAuthProviders, SessionManager};
use assistd::config::AuthConfig;
use assistd::error::{GenerationError, RetrievalError};
use assistd::rag::{Document, Generator, RagPipeline, Retriever};
use assistd::redact::PiiRedactor;
use assistd::server::{AppState, create_router, rate_limit::RateLimiter};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

pub enum Reply {
    Text(&'static str),
    Unavailable(&'static str),
    Panic,
}

pub struct FakeGenerator {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Reply::Text(text) => Ok(text.to_string()),
            Reply::Unavailable(msg) => Err(GenerationError::Unavailable(msg.to_string())),
            Reply::Panic => panic!("generator exploded"),
        }
    }
}

pub struct FakeRetriever {
    docs: Result<Vec<Document>, &'static str>,
}

impl FakeRetriever {
    pub fn with(docs: Vec<Document>) -> Arc<Self> {
        Arc::new(Self { docs: Ok(docs) })
    }

    pub fn failing(message: &'static str) -> Arc<Self> {
        Arc::new(Self { docs: Err(message) })
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, _query: &str, _top_k: usize) -> Result<Vec<Document>, RetrievalError> {
        self.docs
            .clone()
            .map_err(|m| RetrievalError::Unavailable(m.to_string()))
    }
}

pub fn state(generator: Arc<dyn Generator>, retriever: Arc<dyn Retriever>) -> AppState {
    AppState {
        pipeline: RagPipeline::new(retriever, generator),
        sessions: SessionManager::new(Arc::new(MemoryStore::new()), false),
        oauth: OAuthProviders::from_config(&AuthConfig::default()),
        production: false,
    }
}

pub fn router_with(state: AppState, limiter: RateLimiter) -> Router {
    create_router(
        Arc::new(state),
        Arc::new(limiter),
        Arc::new(PiiRedactor::new()),
    )
}

pub fn router(generator: Arc<dyn Generator>, retriever: Arc<dyn Retriever>) -> Router {
    router_with(
        state(generator, retriever),
        RateLimiter::new(100, Duration::from_secs(15 * 60)),
    )
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn json_body(resp: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = send(app, req).await;
    let status = resp.status();
    (status, json_body(resp).await)
}
