//! `LlmIdeaGenerator`: the real [`IdeaGenerator`] over a provider adapter.

use async_trait::async_trait;
use tracing::debug;

use crucible_types::{Analysis, CrucibleError, Perspective, Result};

use crate::{
    parse, prompts, AlternativeIdea, AnthropicAdapter, CompletionRequest, IdeaGenerator,
    OpenAiAdapter, PerspectiveReport, ProviderAdapter, ViabilityVerdict,
};

pub struct LlmIdeaGenerator {
    provider: Box<dyn ProviderAdapter>,
    model: String,
}

impl LlmIdeaGenerator {
    pub fn new(provider: impl ProviderAdapter + 'static) -> Self {
        let model = provider.default_model().to_string();
        Self {
            provider: Box::new(provider),
            model,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build from environment: `ANTHROPIC_API_KEY` wins, then
    /// `OPENAI_API_KEY`; `CRUCIBLE_MODEL` overrides the adapter default.
    pub fn from_env() -> Result<Self> {
        let mut generator = if let Ok(adapter) = AnthropicAdapter::from_env() {
            Self::new(adapter)
        } else if let Ok(adapter) = OpenAiAdapter::from_env() {
            Self::new(adapter)
        } else {
            return Err(CrucibleError::Other(
                "No LLM provider API keys found in environment".to_string(),
            ));
        };

        if let Ok(model) = std::env::var("CRUCIBLE_MODEL") {
            generator = generator.with_model(model);
        }
        Ok(generator)
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let request = CompletionRequest::new(self.model.clone(), prompts::SYSTEM, prompt);
        let response = self.provider.complete(&request).await?;
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            chars = response.text.len(),
            "generator reply"
        );
        Ok(response.text)
    }
}

#[async_trait]
impl IdeaGenerator for LlmIdeaGenerator {
    async fn analyze(&self, idea: &str, perspective: &Perspective) -> Result<PerspectiveReport> {
        let text = self
            .complete(prompts::perspective_prompt(idea, perspective))
            .await?;
        Ok(parse::parse_perspective_report(&text))
    }

    async fn evaluate_viability(
        &self,
        idea: &str,
        analyses: &[Analysis],
        initial_score: f64,
    ) -> Result<ViabilityVerdict> {
        let text = self
            .complete(prompts::viability_prompt(idea, analyses, initial_score))
            .await?;
        parse::parse_viability_verdict(&text)
    }

    async fn execution_plan(&self, idea: &str, analyses: &[Analysis]) -> Result<String> {
        let text = self
            .complete(prompts::execution_plan_prompt(idea, analyses))
            .await?;
        Ok(parse::parse_perspective_report(&text).narrative)
    }

    async fn marketing_copy(&self, idea: &str, analyses: &[Analysis]) -> Result<String> {
        let text = self
            .complete(prompts::marketing_prompt(idea, analyses))
            .await?;
        Ok(parse::parse_perspective_report(&text).narrative)
    }

    async fn revenue_projection(&self, idea: &str, analyses: &[Analysis]) -> Result<String> {
        let text = self.complete(prompts::revenue_prompt(idea, analyses)).await?;
        Ok(parse::parse_perspective_report(&text).narrative)
    }

    async fn alternatives(&self, idea: &str, analyses: &[Analysis]) -> Result<Vec<AlternativeIdea>> {
        let text = self
            .complete(prompts::alternatives_prompt(idea, analyses))
            .await?;
        parse::parse_alternatives(&text)
    }
}
