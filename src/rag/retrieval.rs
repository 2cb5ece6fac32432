use crate::error::RetrievalError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved document. Only `content` is required; `id` keeps whatever JSON
/// type the service stored, and every other field is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<Value>, content: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            content: content.into(),
            extra: Map::new(),
        }
    }
}

/// A document-query backend.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError>;
}

/// Client for the embed service's `POST /query` endpoint.
#[derive(Debug, Clone)]
pub struct EmbedServiceClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<Document>,
}

impl EmbedServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl Retriever for EmbedServiceClient {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<Document>, RetrievalError> {
        let url = format!("{}/query", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { query, top_k })
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("Failed to reach {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Unavailable(format!(
                "Request failed with status code {}",
                status.as_u16()
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;

        tracing::debug!("Retrieved {} documents for query", body.results.len());
        Ok(body.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_survive_a_pass_through() {
        let raw = json!({
            "id": "doc1",
            "content": "Standup at 9",
            "source": "calendar",
            "score": 0.82
        });
        let doc: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(doc.id, Some(json!("doc1")));
        assert_eq!(doc.extra["source"], "calendar");
        assert_eq!(serde_json::to_value(&doc).unwrap(), raw);
    }

    #[test]
    fn id_may_be_numeric_or_absent() {
        let numeric: Document =
            serde_json::from_value(json!({ "id": 7, "content": "a" })).unwrap();
        assert_eq!(numeric.id, Some(json!(7)));

        let raw = json!({ "content": "b", "title": "Notes" });
        let anonymous: Document = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(anonymous.id, None);
        assert_eq!(serde_json::to_value(&anonymous).unwrap(), raw);
    }
}
