//! Provider adapter seam: one trait, one implementation per HTTP API.

use async_trait::async_trait;

use crucible_types::Result;

/// A single one-shot completion request. The generator never streams and
/// never uses tools, so the request shape stays deliberately small.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// The provider's answer, reduced to what the parsers need.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub model: String,
}

/// Adapter over one provider HTTP API.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;

    fn name(&self) -> &str;

    fn default_model(&self) -> &str;
}
