//! Progress snapshots derived from a session row.
//!
//! Percentage is computed against a fixed denominator of 9 stages, clamped to
//! 100. Sessions that complete more stages than that saturate early; the
//! terminal signal is `status`, never the percentage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crucible_types::{Session, SessionStatus};

/// Fixed denominator for the percentage computation.
pub const TOTAL_STAGES: usize = 9;

/// A point-in-time view of a running (or finished) session, cheap to derive
/// from the persisted row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    pub session_id: Uuid,
    pub status: SessionStatus,
    /// `min(100, completed * 100 / 9)`, integer floor.
    pub percent: u8,
    pub current_stage: Option<String>,
    pub stages_completed: usize,
    /// Human line for the stage currently in flight.
    pub message: String,
}

impl Progress {
    pub fn for_session(session: &Session) -> Self {
        let completed = session.stages_completed.len();
        let percent = (completed * 100 / TOTAL_STAGES).min(100) as u8;
        let message = match session.status {
            SessionStatus::Completed => "Analysis complete".to_string(),
            SessionStatus::Analyzing => session
                .current_stage
                .as_deref()
                .map(stage_message)
                .unwrap_or("Starting analysis")
                .to_string(),
        };
        Self {
            session_id: session.id,
            status: session.status,
            percent,
            current_stage: session.current_stage.clone(),
            stages_completed: completed,
            message,
        }
    }
}

/// Display line for each known stage name. Unknown names get a generic line
/// rather than an error; the stage list may grow faster than this table.
fn stage_message(stage: &str) -> &'static str {
    match stage {
        "first_principles" => "Stripping the idea down to first principles",
        "design" => "Judging the product and its surface",
        "marketing_potential" => "Sizing the market and the pull",
        "technical" => "Checking build feasibility",
        "financial" => "Running the unit economics",
        "viability_check" => "Weighing whether a deep dive is worth it",
        "devils_advocate" => "Hearing the strongest case against",
        "copycat" => "Testing how fast this gets cloned",
        "user_psychology" => "Questioning whether users will actually change",
        "scalability" => "Stress-testing at 10x and 100x",
        "worst_case" => "Telling the most plausible failure story",
        "execution_plan" => "Drafting the 90-day execution plan",
        "marketing" => "Writing the launch marketing strategy",
        "revenue_projection" => "Projecting revenue scenarios",
        "alternatives" => "Looking for adjacent ideas worth pivoting to",
        _ => "Analyzing",
    }
}
