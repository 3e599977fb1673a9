//! Persisted pipeline state: the `Session` record, its side records, and the
//! enums that describe pipeline branching.
//!
//! A `Session` is mutated exclusively by its own background pipeline task and
//! persisted as a full row after every stage; readers only ever see
//! point-in-time snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a session. Transitions monotonically
/// `Analyzing -> Completed`, exactly once. There is deliberately no `Failed`
/// state: a run that dies mid-flight stays `Analyzing` forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Analyzing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Analyzing => "analyzing",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analyzing" => Some(SessionStatus::Analyzing),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

/// Final verdict on the idea. Early exit forces `Abandon`; otherwise the
/// pipeline derives it from the final overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Pursue,
    Refine,
    Pivot,
    Abandon,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Pursue => "pursue",
            Recommendation::Refine => "refine",
            Recommendation::Pivot => "pivot",
            Recommendation::Abandon => "abandon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pursue" => Some(Recommendation::Pursue),
            "refine" => Some(Recommendation::Refine),
            "pivot" => Some(Recommendation::Pivot),
            "abandon" => Some(Recommendation::Abandon),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisMode
// ---------------------------------------------------------------------------

/// Branch mode of a session, decided by the viability gate.
///
/// This replaces a pair of independent booleans (`early_exit`, `pivot_focus`)
/// with a tagged variant so that impossible combinations cannot be
/// represented. `EarlyExit` implies pivot focus: alternatives are still
/// generated to help the user pivot away from a dead idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Normal,
    PivotFocus,
    EarlyExit,
}

impl AnalysisMode {
    /// True when the gate halted full analysis.
    pub fn early_exit(&self) -> bool {
        matches!(self, AnalysisMode::EarlyExit)
    }

    /// True when the session runs in reduced pivot-focus scope. Early exit
    /// counts: the Stop branch sets both flags.
    pub fn pivot_focus(&self) -> bool {
        !matches!(self, AnalysisMode::Normal)
    }

    /// Reconstruct from the two stored flag columns. Early exit dominates.
    pub fn from_flags(early_exit: bool, pivot_focus: bool) -> Self {
        if early_exit {
            AnalysisMode::EarlyExit
        } else if pivot_focus {
            AnalysisMode::PivotFocus
        } else {
            AnalysisMode::Normal
        }
    }
}

// ---------------------------------------------------------------------------
// GateDecision
// ---------------------------------------------------------------------------

/// Outcome of the viability gate as reported by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Continue,
    PivotFocus,
    Stop,
}

impl GateDecision {
    /// Parse the decision string a generator returns. Tolerant of the
    /// phrasings the prompt allows; anything unrecognized is `None` and the
    /// caller treats the gate call as failed.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" | "proceed" => Some(GateDecision::Continue),
            "pivot_focus" | "pivot" | "focus_on_pivots" => Some(GateDecision::PivotFocus),
            "stop" | "abandon" => Some(GateDecision::Stop),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Perspective
// ---------------------------------------------------------------------------

/// Which half of the catalog a perspective belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerspectiveGroup {
    Core,
    Harsh,
}

/// One named lens through which the idea is evaluated. The catalog of
/// perspectives is fixed and lives in the pipeline crate; this is the shape
/// each entry has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Perspective {
    /// Stable stage name, e.g. `first_principles`.
    pub name: &'static str,
    /// Human label for progress display.
    pub label: &'static str,
    /// What the generator should focus on when taking this perspective.
    pub focus: &'static str,
    pub group: PerspectiveGroup,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One analysis run. Created synchronously on request, then owned for writes
/// by a single background task until `status` becomes `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Original input text, immutable after creation.
    pub raw_idea: String,
    /// Short derived label, set once at creation.
    pub title: String,
    pub status: SessionStatus,
    /// Stage currently executing or last executed. Display only.
    pub current_stage: Option<String>,
    /// Ordered, append-only, duplicate-free list of completed stage names.
    pub stages_completed: Vec<String>,
    /// Mean of the scores present among completed analyses. Set after the
    /// core pass and recomputed at finalization.
    pub overall_score: Option<f64>,
    pub recommendation: Option<Recommendation>,
    pub mode: AnalysisMode,
    pub early_exit_reason: Option<String>,
    pub flaw_type: Option<String>,
    /// Raw gate verdict payload, set only when the gate fires.
    pub viability_check: Option<serde_json::Value>,
    /// Extracted from the first-principles analysis detail, if present.
    pub refined_idea: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a fresh session for the given idea text.
    pub fn new(raw_idea: impl Into<String>) -> Self {
        let raw_idea = raw_idea.into();
        let title = derive_title(&raw_idea);
        Self {
            id: Uuid::new_v4(),
            raw_idea,
            title,
            status: SessionStatus::Analyzing,
            current_stage: None,
            stages_completed: Vec::new(),
            overall_score: None,
            recommendation: None,
            mode: AnalysisMode::Normal,
            early_exit_reason: None,
            flaw_type: None,
            viability_check: None,
            refined_idea: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark a stage as in flight without completing it.
    pub fn begin_stage(&mut self, name: &str) {
        self.current_stage = Some(name.to_string());
    }

    /// Append a completed stage. The list never shrinks and never holds
    /// duplicates within a run.
    pub fn record_stage(&mut self, name: &str) {
        if !self.stages_completed.iter().any(|s| s == name) {
            self.stages_completed.push(name.to_string());
        }
        self.current_stage = Some(name.to_string());
    }

    pub fn early_exit(&self) -> bool {
        self.mode.early_exit()
    }

    pub fn pivot_focus(&self) -> bool {
        self.mode.pivot_focus()
    }

    /// Terminal transition. Idempotent guard is the caller's job; the
    /// pipeline calls this exactly once.
    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }
}

/// Derive a short display title from the raw idea text: the first sentence,
/// truncated to 80 characters on a char boundary.
pub fn derive_title(raw_idea: &str) -> String {
    let first_line = raw_idea.lines().next().unwrap_or("").trim();
    let sentence = first_line
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or(first_line)
        .trim_end_matches(['.', '!', '?'])
        .trim();
    let title: String = sentence.chars().take(80).collect();
    if title.is_empty() {
        "Untitled idea".to_string()
    } else {
        title
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// One per-perspective evaluation, owned exclusively by its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub session_id: Uuid,
    pub perspective: String,
    /// 0-100, absent when the generator produced no usable score.
    pub score: Option<f64>,
    pub narrative: String,
    /// Structured payload the generator returned alongside the narrative.
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Analysis {
    pub fn new(
        session_id: Uuid,
        perspective: &str,
        score: Option<f64>,
        narrative: String,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            perspective: perspective.to_string(),
            score,
            narrative,
            detail,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// Kind of a monetization/output artifact. At most one of each per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    ExecutionPlan,
    Marketing,
    RevenueProjection,
}

impl ArtifactKind {
    /// The stage name this artifact appends to `stages_completed`.
    pub fn stage_name(&self) -> &'static str {
        match self {
            ArtifactKind::ExecutionPlan => "execution_plan",
            ArtifactKind::Marketing => "marketing",
            ArtifactKind::RevenueProjection => "revenue_projection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "execution_plan" => Some(ArtifactKind::ExecutionPlan),
            "marketing" => Some(ArtifactKind::Marketing),
            "revenue_projection" => Some(ArtifactKind::RevenueProjection),
            _ => None,
        }
    }
}

/// A generated output document, owned exclusively by its session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,
    pub session_id: Uuid,
    pub kind: ArtifactKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(session_id: Uuid, kind: ArtifactKind, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            kind,
            content,
            created_at: Utc::now(),
        }
    }
}

/// One suggested alternative idea. Zero or more per session; the alternatives
/// stage is the one stage every session reaches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub id: Uuid,
    pub session_id: Uuid,
    pub title: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl Alternative {
    pub fn new(session_id: Uuid, title: String, summary: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            title,
            summary,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionDetail
// ---------------------------------------------------------------------------

/// A session together with all of its side records, as returned by the
/// read surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: Session,
    pub analyses: Vec<Analysis>,
    pub artifacts: Vec<Artifact>,
    pub alternatives: Vec<Alternative>,
}
