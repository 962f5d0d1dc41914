use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::InferenceError;

pub mod llama_cpp;

/// Lazy sequence of generated text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, InferenceError>> + Send>>;

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.8,
            top_p: 0.95,
        }
    }
}

/// Inference service interface - turns a prompt into generated text.
///
/// Implementations are not expected to be reentrant for concurrent
/// generations; callers serialize requests against one model.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Generate the full completion for `prompt`
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, InferenceError>;

    /// Streaming generation - returns a stream of text fragments
    async fn generate_stream(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<TextStream, InferenceError> {
        // Default implementation falls back to non-streaming
        let text = self.generate(prompt, params).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(text) })))
    }

    /// Check that the service is reachable
    async fn check_health(&self) -> Result<(), InferenceError> {
        Ok(())
    }
}
