//! The pipeline orchestrator: drives one session from raw idea to final
//! recommendation.
//!
//! Execution order: core perspectives, initial score, viability gate (only
//! below threshold), harsh perspectives, output artifacts, alternatives,
//! finalization. Every stage transition persists the full session row so
//! concurrent progress polls always see a consistent snapshot.
//!
//! Failure policy: a failed generator call skips that one stage with a
//! `warn!` and no retry; a failed mid-run persist is logged and the run
//! continues. Only the finalization save propagates an error to the caller.

use std::sync::Arc;

use tracing::{info, warn};

use crucible_llm::IdeaGenerator;
use crucible_store::SessionStore;
use crucible_types::{
    Analysis, AnalysisMode, Artifact, ArtifactKind, GateDecision, Perspective, Recommendation,
    Result, Session,
};

use crate::catalog::{harsh_for, CORE_PERSPECTIVES};
use crate::events::{EventEmitter, PipelineEvent};
use crate::score::aggregate_score;

/// Initial scores below this trigger the viability gate.
pub const VIABILITY_GATE_THRESHOLD: f64 = 45.0;

/// Initial scores below this skip the output stages even when the gate let
/// the run continue.
pub const OUTPUT_STAGE_THRESHOLD: f64 = 40.0;

pub struct IdeaPipeline {
    generator: Arc<dyn IdeaGenerator>,
    store: Arc<dyn SessionStore>,
    events: EventEmitter,
}

impl IdeaPipeline {
    pub fn new(generator: Arc<dyn IdeaGenerator>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            generator,
            store,
            events: EventEmitter::default(),
        }
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Run the full analysis for an already-created session row. Returns the
    /// finalized session. The only error that escapes is a failed
    /// finalization save; everything before that degrades per stage.
    pub async fn run(&self, mut session: Session) -> Result<Session> {
        let idea = session.raw_idea.clone();
        info!(session_id = %session.id, "analysis started");
        self.events.emit(PipelineEvent::SessionStarted {
            session_id: session.id,
        });

        let mut analyses: Vec<Analysis> = Vec::new();

        // Core pass.
        for perspective in &CORE_PERSPECTIVES {
            self.run_perspective(&mut session, perspective, &idea, &mut analyses)
                .await;
        }

        // Initial score over whatever the core pass produced.
        let initial_score = aggregate_score(&analyses);
        session.overall_score = Some(initial_score);
        self.save_mid(&session).await;
        info!(session_id = %session.id, initial_score, "core pass finished");

        if initial_score < VIABILITY_GATE_THRESHOLD {
            self.run_gate(&mut session, &idea, &analyses, initial_score)
                .await;
        }

        // Harsh pass, skipped entirely on early exit and reduced to the
        // pivot subset under pivot focus.
        if !session.early_exit() {
            let harsh = harsh_for(session.pivot_focus());
            for perspective in harsh {
                self.run_perspective(&mut session, perspective, &idea, &mut analyses)
                    .await;
            }
        }

        // Output artifacts require a Normal-mode run over the threshold.
        if session.mode == AnalysisMode::Normal && initial_score >= OUTPUT_STAGE_THRESHOLD {
            for kind in [
                ArtifactKind::ExecutionPlan,
                ArtifactKind::Marketing,
                ArtifactKind::RevenueProjection,
            ] {
                self.run_output(&mut session, kind, &idea, &analyses).await;
            }
        }

        // Alternatives run for every session, whatever branch the gate chose.
        self.run_alternatives(&mut session, &idea, &analyses).await;

        // Finalize.
        session.overall_score = Some(aggregate_score(&analyses));
        session.recommendation = Some(if session.early_exit() {
            Recommendation::Abandon
        } else {
            recommend(aggregate_score(&analyses))
        });
        session.complete();
        self.store.save_session(&session).await?;

        info!(
            session_id = %session.id,
            overall_score = ?session.overall_score,
            recommendation = ?session.recommendation,
            "analysis completed"
        );
        self.events.emit(PipelineEvent::SessionCompleted {
            session_id: session.id,
            overall_score: session.overall_score,
            recommendation: session.recommendation,
        });
        Ok(session)
    }

    async fn run_perspective(
        &self,
        session: &mut Session,
        perspective: &Perspective,
        idea: &str,
        analyses: &mut Vec<Analysis>,
    ) {
        session.begin_stage(perspective.name);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageStarted {
            session_id: session.id,
            stage: perspective.name.to_string(),
        });

        let report = match self.generator.analyze(idea, perspective).await {
            Ok(report) => report,
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    stage = perspective.name,
                    error = %e,
                    "perspective failed, skipping"
                );
                self.events.emit(PipelineEvent::StageSkipped {
                    session_id: session.id,
                    stage: perspective.name.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let analysis = Analysis::new(
            session.id,
            perspective.name,
            report.score,
            report.narrative,
            report.detail,
        );

        if perspective.name == "first_principles" && session.refined_idea.is_none() {
            session.refined_idea = refined_idea_from(&analysis);
        }

        if let Err(e) = self.store.add_analysis(&analysis).await {
            warn!(session_id = %session.id, stage = perspective.name, error = %e,
                "failed to persist analysis");
        }
        analyses.push(analysis);

        session.record_stage(perspective.name);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageCompleted {
            session_id: session.id,
            stage: perspective.name.to_string(),
        });
    }

    async fn run_gate(
        &self,
        session: &mut Session,
        idea: &str,
        analyses: &[Analysis],
        initial_score: f64,
    ) {
        const STAGE: &str = "viability_check";
        session.begin_stage(STAGE);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageStarted {
            session_id: session.id,
            stage: STAGE.to_string(),
        });

        let verdict = match self
            .generator
            .evaluate_viability(idea, analyses, initial_score)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                // A failed gate leaves the run on the Normal branch.
                warn!(session_id = %session.id, error = %e, "viability gate failed, skipping");
                self.events.emit(PipelineEvent::StageSkipped {
                    session_id: session.id,
                    stage: STAGE.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        info!(
            session_id = %session.id,
            decision = ?verdict.decision,
            flaw_type = ?verdict.flaw_type,
            "viability gate evaluated"
        );

        session.viability_check = Some(verdict.raw);
        session.flaw_type = verdict.flaw_type;
        match verdict.decision {
            GateDecision::Continue => {}
            GateDecision::PivotFocus => {
                session.mode = AnalysisMode::PivotFocus;
            }
            GateDecision::Stop => {
                session.mode = AnalysisMode::EarlyExit;
                session.early_exit_reason = Some(verdict.reasoning);
                session.recommendation = Some(Recommendation::Abandon);
            }
        }

        session.record_stage(STAGE);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::GateEvaluated {
            session_id: session.id,
            decision: verdict.decision,
        });
    }

    async fn run_output(
        &self,
        session: &mut Session,
        kind: ArtifactKind,
        idea: &str,
        analyses: &[Analysis],
    ) {
        let stage = kind.stage_name();
        session.begin_stage(stage);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageStarted {
            session_id: session.id,
            stage: stage.to_string(),
        });

        let content = match kind {
            ArtifactKind::ExecutionPlan => self.generator.execution_plan(idea, analyses).await,
            ArtifactKind::Marketing => self.generator.marketing_copy(idea, analyses).await,
            ArtifactKind::RevenueProjection => {
                self.generator.revenue_projection(idea, analyses).await
            }
        };
        let content = match content {
            Ok(content) => content,
            Err(e) => {
                warn!(session_id = %session.id, stage, error = %e, "output stage failed, skipping");
                self.events.emit(PipelineEvent::StageSkipped {
                    session_id: session.id,
                    stage: stage.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let artifact = Artifact::new(session.id, kind, content);
        if let Err(e) = self.store.add_artifact(&artifact).await {
            warn!(session_id = %session.id, stage, error = %e, "failed to persist artifact");
        }

        session.record_stage(stage);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageCompleted {
            session_id: session.id,
            stage: stage.to_string(),
        });
    }

    async fn run_alternatives(&self, session: &mut Session, idea: &str, analyses: &[Analysis]) {
        const STAGE: &str = "alternatives";
        session.begin_stage(STAGE);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageStarted {
            session_id: session.id,
            stage: STAGE.to_string(),
        });

        let ideas = match self.generator.alternatives(idea, analyses).await {
            Ok(ideas) => ideas,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "alternatives failed, skipping");
                self.events.emit(PipelineEvent::StageSkipped {
                    session_id: session.id,
                    stage: STAGE.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        for idea in ideas {
            let row = crucible_types::Alternative::new(session.id, idea.title, idea.summary);
            if let Err(e) = self.store.add_alternative(&row).await {
                warn!(session_id = %session.id, error = %e, "failed to persist alternative");
            }
        }

        session.record_stage(STAGE);
        self.save_mid(session).await;
        self.events.emit(PipelineEvent::StageCompleted {
            session_id: session.id,
            stage: STAGE.to_string(),
        });
    }

    /// Mid-run persist. Failures are logged and swallowed so one storage
    /// hiccup does not kill an analysis that is mostly in memory anyway.
    async fn save_mid(&self, session: &Session) {
        if let Err(e) = self.store.save_session(session).await {
            warn!(session_id = %session.id, error = %e, "failed to persist session snapshot");
        }
    }
}

/// Map a final overall score onto a recommendation.
fn recommend(score: f64) -> Recommendation {
    if score >= 70.0 {
        Recommendation::Pursue
    } else if score >= 55.0 {
        Recommendation::Refine
    } else if score >= 40.0 {
        Recommendation::Pivot
    } else {
        Recommendation::Abandon
    }
}

/// Pull an optional `refined_idea` string out of a first-principles detail
/// payload. Anything malformed reads as absent.
fn refined_idea_from(analysis: &Analysis) -> Option<String> {
    analysis
        .detail
        .as_ref()
        .and_then(|d| d.get("refined_idea"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
