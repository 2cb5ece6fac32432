use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ErrorResponse;
use crate::redact::PiiRedactor;

const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Logs one line per request, including the JSON body with PII masked.
pub async fn log_requests(
    State(redactor): State<Arc<PiiRedactor>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let uri = req.uri().clone();

    let (parts, body) = req.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(%method, %uri, "Rejected request body: {}", e);
            let (status, message) = if exceeded_limit(&e) {
                (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
            } else {
                (StatusCode::BAD_REQUEST, "Failed to read request body")
            };
            return (status, Json(ErrorResponse::new(message))).into_response();
        }
    };

    let logged_body = serde_json::from_slice::<Value>(&bytes)
        .map(|body| redactor.redact(&body))
        .unwrap_or(Value::Null);

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    tracing::info!(
        %method,
        %uri,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        body = %logged_body,
        "request"
    );

    response
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn length_limit_is_told_apart_from_other_read_errors() {
        let too_long = axum::body::to_bytes(Body::from(vec![b'x'; 16]), 8)
            .await
            .unwrap_err();
        assert!(exceeded_limit(&too_long));

        let aborted = axum::Error::new(std::io::Error::other("connection reset"));
        assert!(!exceeded_limit(&aborted));
    }
}
