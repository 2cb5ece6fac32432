pub mod client;
pub mod pipeline;
pub mod retrieval;
pub mod validate;

pub use client::{Generator, OllamaClient};
pub use pipeline::{RagPipeline, RagResponse};
pub use retrieval::{Document, EmbedServiceClient, Retriever};
pub use validate::Prompt;
