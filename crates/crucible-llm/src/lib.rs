//! The analysis-generator collaborator.
//!
//! Everything the pipeline knows about text generation lives behind the
//! [`IdeaGenerator`] trait: one method per generator call the pipeline makes.
//! [`LlmIdeaGenerator`] implements it over a [`ProviderAdapter`]
//! (Anthropic or OpenAI); tests implement it directly with scripted values.

mod anthropic;
mod generator;
mod openai;
mod parse;
mod prompts;
mod provider;

pub use anthropic::AnthropicAdapter;
pub use generator::LlmIdeaGenerator;
pub use openai::OpenAiAdapter;
pub use parse::{extract_json, parse_alternatives, parse_perspective_report, parse_viability_verdict};
pub use provider::{CompletionRequest, CompletionResponse, ProviderAdapter};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crucible_types::{Analysis, GateDecision, Perspective, Result};

// ---------------------------------------------------------------------------
// Contract types
// ---------------------------------------------------------------------------

/// What one perspective call yields: an optional 0-100 score, narrative text,
/// and whatever structured payload the generator returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerspectiveReport {
    pub score: Option<f64>,
    pub narrative: String,
    pub detail: Option<serde_json::Value>,
}

/// The viability gate's judgment. The pipeline interprets `decision`; the
/// rest is diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityVerdict {
    pub decision: GateDecision,
    pub reasoning: String,
    pub flaw_type: Option<String>,
    /// Raw payload, persisted verbatim into the session's `viability_check`.
    pub raw: serde_json::Value,
}

/// One suggested alternative idea, before it is stored as a session row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeIdea {
    pub title: String,
    pub summary: String,
}

// ---------------------------------------------------------------------------
// IdeaGenerator
// ---------------------------------------------------------------------------

/// The external text-generation collaborator. One method per pipeline call;
/// each is one-shot and may fail, in which case the pipeline skips the stage.
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Evaluate the idea through one perspective.
    async fn analyze(&self, idea: &str, perspective: &Perspective) -> Result<PerspectiveReport>;

    /// Dedicated viability assessment, invoked only when the initial score
    /// falls below the gate threshold.
    async fn evaluate_viability(
        &self,
        idea: &str,
        analyses: &[Analysis],
        initial_score: f64,
    ) -> Result<ViabilityVerdict>;

    async fn execution_plan(&self, idea: &str, analyses: &[Analysis]) -> Result<String>;

    async fn marketing_copy(&self, idea: &str, analyses: &[Analysis]) -> Result<String>;

    async fn revenue_projection(&self, idea: &str, analyses: &[Analysis]) -> Result<String>;

    /// Suggest alternative ideas. Runs for every session, whatever branch the
    /// gate chose.
    async fn alternatives(&self, idea: &str, analyses: &[Analysis]) -> Result<Vec<AlternativeIdea>>;
}
