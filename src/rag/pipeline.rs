use crate::error::{GenerationError, RagError};
use crate::rag::client::Generator;
use crate::rag::retrieval::{Document, Retriever};
use crate::rag::validate::Prompt;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_TOP_K: usize = 3;
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

pub struct RagPipeline {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagResponse {
    pub text: String,
    pub sources: Vec<Document>,
}

impl RagPipeline {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Sends the prompt straight to the generator, without retrieval.
    pub async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        self.generator.generate(prompt.as_str()).await
    }

    /// Retrieves context for the prompt, then answers from it. Retrieval
    /// finishes before generation starts; either failure aborts the request.
    pub async fn answer(&self, prompt: &Prompt) -> Result<RagResponse, RagError> {
        let sources = self
            .retriever
            .retrieve(prompt.as_str(), self.top_k)
            .await
            .map_err(|e| {
                tracing::error!("RAG retrieval failed: {}", e);
                RagError::RetrievalFailed(e)
            })?;

        tracing::debug!("Building RAG prompt from {} sources", sources.len());
        let rag_prompt = build_prompt(&sources, prompt.as_str());

        let text = self.generator.generate(&rag_prompt).await.map_err(|e| {
            tracing::error!("RAG generation failed: {}", e);
            RagError::GenerationFailed(e)
        })?;

        Ok(RagResponse { text, sources })
    }
}

pub fn build_prompt(sources: &[Document], question: &str) -> String {
    let context = sources
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_DELIMITER);

    format!(
        "Based on the following context, please answer the user's question.
If the context does not contain the answer, say that you don't know.

Context:
{}

User Question:
{}",
        context, question
    )
}
