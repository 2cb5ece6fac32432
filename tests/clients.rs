//! Exercises the HTTP clients against in-process stand-ins for Ollama and the
//! embed service.

use assistd::error::{GenerationError, RetrievalError};
use assistd::rag::{EmbedServiceClient, Generator, OllamaClient, Retriever};
use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

type Captured = Arc<Mutex<Vec<Value>>>;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn capturing(path: &str, status: StatusCode, reply: Value) -> (Router, Captured) {
    let captured: Captured = Arc::default();
    let sink = captured.clone();
    let app = Router::new().route(
        path,
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                sink.lock().unwrap().push(body);
                (status, Json(reply)).into_response()
            }
        }),
    );
    (app, captured)
}

// --- OllamaClient ---

#[tokio::test]
async fn ollama_sends_model_and_disables_streaming() {
    let (app, captured) = capturing(
        "/api/generate",
        StatusCode::OK,
        json!({ "model": "llama3.2", "response": "Hello!", "done": true }),
    );
    let base = spawn(app).await;

    let client = OllamaClient::new(&base, "llama3.2");
    let text = client.generate("Say hello").await.unwrap();

    assert_eq!(text, "Hello!");
    assert_eq!(
        captured.lock().unwrap().as_slice(),
        &[json!({ "model": "llama3.2", "prompt": "Say hello", "stream": false })]
    );
}

#[tokio::test]
async fn ollama_error_body_is_carried() {
    let (app, _) = capturing(
        "/api/generate",
        StatusCode::NOT_FOUND,
        json!({ "error": "model 'llama9' not found" }),
    );
    let base = spawn(app).await;

    let err = OllamaClient::new(&base, "llama9")
        .generate("hi")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::Unavailable(_)));
    assert_eq!(err.to_string(), "model 'llama9' not found");
}

#[tokio::test]
async fn ollama_unreachable_names_the_host() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = OllamaClient::new(&base, "llama3.2")
        .generate("hi")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), format!("Failed to connect to Ollama at {}.", base));
}

#[tokio::test]
async fn ollama_garbage_is_unexpected() {
    let (app, _) = capturing("/api/generate", StatusCode::OK, json!({ "nope": 1 }));
    let base = spawn(app).await;

    let err = OllamaClient::new(&base, "m").generate("hi").await.unwrap_err();
    assert!(matches!(err, GenerationError::Unexpected));
}

// --- EmbedServiceClient ---

#[tokio::test]
async fn retrieval_posts_query_and_returns_results_verbatim() {
    let results = json!([
        { "id": "doc2", "content": "second", "title": "Notes" },
        { "id": "doc1", "content": "first" }
    ]);
    let (app, captured) = capturing(
        "/query",
        StatusCode::OK,
        json!({ "ok": true, "results": results }),
    );
    let base = spawn(app).await;

    let docs = EmbedServiceClient::new(&format!("{}/", base))
        .retrieve("what changed?", 3)
        .await
        .unwrap();

    assert_eq!(
        captured.lock().unwrap().as_slice(),
        &[json!({ "query": "what changed?", "top_k": 3 })]
    );
    assert_eq!(serde_json::to_value(&docs).unwrap(), results);
}

#[tokio::test]
async fn retrieval_accepts_numeric_and_missing_ids() {
    let results = json!([
        { "id": 1, "content": "Standup at 9" },
        { "content": "Gym on Monday" }
    ]);
    let (app, _) = capturing("/query", StatusCode::OK, json!({ "results": results }));
    let base = spawn(app).await;

    let docs = EmbedServiceClient::new(&base)
        .retrieve("what is on?", 3)
        .await
        .unwrap();

    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].content, "Gym on Monday");
    assert_eq!(serde_json::to_value(&docs).unwrap(), results);
}

#[tokio::test]
async fn retrieval_http_error_is_reported() {
    let (app, _) = capturing(
        "/query",
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "detail": "Index is not ready or is empty." }),
    );
    let base = spawn(app).await;

    let err = EmbedServiceClient::new(&base)
        .retrieve("q", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Unavailable(_)));
    assert_eq!(err.to_string(), "Request failed with status code 503");
}

#[tokio::test]
async fn retrieval_without_results_is_malformed() {
    let (app, _) = capturing("/query", StatusCode::OK, json!({ "ok": true }));
    let base = spawn(app).await;

    let err = EmbedServiceClient::new(&base)
        .retrieve("q", 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Malformed(_)));
}

// --- end to end through the router ---

#[tokio::test]
async fn ask_end_to_end_against_stub_services() {
    let (ollama, prompts) = capturing(
        "/api/generate",
        StatusCode::OK,
        json!({ "response": "This is a RAG response." }),
    );
    let (embed, _) = capturing(
        "/query",
        StatusCode::OK,
        json!({ "results": [{ "id": "doc1", "content": "Test document content." }] }),
    );
    let mut config = assistd::Config::default();
    config.llm.base_url = spawn(ollama).await;
    config.retrieval.base_url = spawn(embed).await;

    let pipeline = assistd::build_pipeline(&config);
    let prompt = assistd::rag::Prompt::new("What is this about?").unwrap();
    let response = pipeline.answer(&prompt).await.unwrap();

    assert_eq!(response.text, "This is a RAG response.");
    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].content, "Test document content.");

    let sent = prompts.lock().unwrap();
    let sent_prompt = sent[0]["prompt"].as_str().unwrap();
    assert!(sent_prompt.contains("Context:\nTest document content.\n\nUser Question:\nWhat is this about?"));
}
