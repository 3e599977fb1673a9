//! Pipeline event broadcast for observability.
//!
//! The orchestrator emits [`PipelineEvent`]s on a [`tokio::sync::broadcast`]
//! channel so observers (the CLI live view, tests) can follow a run without
//! coupling to orchestrator internals. Emission is fire-and-forget: with no
//! subscriber the event is dropped.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crucible_types::{GateDecision, Recommendation};

/// Events emitted over the lifetime of one session run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    SessionStarted {
        session_id: Uuid,
    },
    StageStarted {
        session_id: Uuid,
        stage: String,
    },
    StageCompleted {
        session_id: Uuid,
        stage: String,
    },
    /// The stage's generator call failed and the stage was skipped.
    StageSkipped {
        session_id: Uuid,
        stage: String,
        error: String,
    },
    GateEvaluated {
        session_id: Uuid,
        decision: GateDecision,
    },
    SessionCompleted {
        session_id: Uuid,
        overall_score: Option<f64>,
        recommendation: Option<Recommendation>,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit to all current subscribers; silently dropped when there are none.
    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}
