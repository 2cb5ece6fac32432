//! HTTP boundary.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/generate` | Send a prompt straight to the LLM |
//! | `POST` | `/api/ask` | Answer a prompt from retrieved documents |
//! | `*`    | `/api/auth/...` | Account and session routes |
//! | `GET`  | `/health` | Liveness probe |
//!
//! Every failure is answered with `{ "ok": false, "error": "..." }`.

pub mod auth_routes;
pub mod extract;
pub mod logging;
pub mod rate_limit;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::auth::{OAuthProviders, SessionManager};
use crate::error::{AppError, ErrorResponse, GENERIC_ERROR};
use crate::rag::{RagPipeline, RagResponse};
use crate::redact::PiiRedactor;
use extract::ValidPrompt;
use rate_limit::RateLimiter;

pub struct AppState {
    pub pipeline: RagPipeline,
    pub sessions: SessionManager,
    pub oauth: OAuthProviders,
    pub production: bool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub response: T,
}

impl<T> ApiResponse<T> {
    pub fn new(response: T) -> Self {
        Self { ok: true, response }
    }
}

pub fn create_router(
    state: Arc<AppState>,
    limiter: Arc<RateLimiter>,
    redactor: Arc<PiiRedactor>,
) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate", post(generate))
        .route("/api/ask", post(ask))
        .nest("/api/auth", auth_routes::router(state.production))
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(middleware::from_fn_with_state(redactor, logging::log_requests))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "status": "healthy" }))
}

async fn generate(
    State(state): State<Arc<AppState>>,
    ValidPrompt(prompt): ValidPrompt,
) -> Result<Json<ApiResponse<String>>, AppError> {
    let text = state.pipeline.generate(&prompt).await?;
    Ok(Json(ApiResponse::new(text)))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    ValidPrompt(prompt): ValidPrompt,
) -> Result<Json<ApiResponse<RagResponse>>, AppError> {
    let response = state.pipeline.answer(&prompt).await?;
    Ok(Json(ApiResponse::new(response)))
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!("Handler panicked: {}", detail);

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(GENERIC_ERROR)),
    )
        .into_response()
}

pub async fn run_server(
    state: Arc<AppState>,
    limiter: Arc<RateLimiter>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let app = create_router(state, limiter, Arc::new(PiiRedactor::new()));

    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
