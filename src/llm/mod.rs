// src/llm/mod.rs

pub mod embeddings;
pub mod groq;

use anyhow::Result;
use async_trait::async_trait;

use crate::graph::state::ChatMessage;

/// Text-generation seam. Every LLM-backed component (router, memory
/// classifier, summarizer, response nodes) goes through this so the engine
/// can be exercised without a live model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// One completion over a system prompt plus conversation messages.
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Embedding seam, used by the vector store.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of the vectors this model produces.
    fn dimensions(&self) -> usize;
}
