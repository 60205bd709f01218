use sentinel_core::error::Result;
use sentinel_core::types::{ChatRequest, ChatResponse};

/// Trait for LLM chat completion providers.
pub trait LlmProvider: Send + Sync {
    /// Send a chat request and receive a completion response.
    fn chat(
        &self,
        request: ChatRequest,
    ) -> impl std::future::Future<Output = Result<ChatResponse>> + Send;

    /// Return the provider name (e.g. "openai").
    fn name(&self) -> &str;
}

/// Trait for text embedding providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one or more text strings, returning a vector of embeddings.
    fn embed(
        &self,
        texts: &[&str],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>>> + Send;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Return the provider name.
    fn name(&self) -> &str;
}
