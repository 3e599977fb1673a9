//! The application-facing surface.
//!
//! [`SessionService`] owns the generator and the store, validates requests,
//! and spawns one detached background task per analysis run. `start_session`
//! returns as soon as the row exists; everything else is a read (or a
//! delete) against the store.

pub mod export;

use std::sync::Arc;

use tracing::error;
use uuid::Uuid;

use crucible_llm::IdeaGenerator;
use crucible_pipeline::{EventEmitter, IdeaPipeline, Progress};
use crucible_store::SessionStore;
use crucible_types::{CrucibleError, Result, Session, SessionDetail};

/// Export flavor for [`SessionService::export_session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "markdown" | "md" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }
}

pub struct SessionService {
    generator: Arc<dyn IdeaGenerator>,
    store: Arc<dyn SessionStore>,
    events: EventEmitter,
}

impl SessionService {
    pub fn new(generator: Arc<dyn IdeaGenerator>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            generator,
            store,
            events: EventEmitter::default(),
        }
    }

    /// The event stream shared with every pipeline run this service spawns.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Validate the idea, create the session row, and kick off the analysis
    /// in the background. Returns the freshly created session immediately;
    /// callers follow the run through [`Self::get_progress`].
    pub async fn start_session(&self, raw_idea: &str) -> Result<Session> {
        let idea = raw_idea.trim();
        if idea.is_empty() {
            return Err(CrucibleError::InvalidIdea(
                "idea text must not be empty".into(),
            ));
        }

        let session = Session::new(idea);
        self.store.create_session(&session).await?;

        let pipeline = IdeaPipeline::new(self.generator.clone(), self.store.clone())
            .with_events(self.events.clone());
        let running = session.clone();
        tokio::spawn(async move {
            let session_id = running.id;
            if let Err(e) = pipeline.run(running).await {
                // The session stays Analyzing; the failure is only visible
                // here and in the missing completed_at.
                error!(session_id = %session_id, error = %e, "analysis task failed");
            }
        });

        Ok(session)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<SessionDetail> {
        self.store.load_session(id).await
    }

    /// Point-in-time progress snapshot derived from the persisted row.
    pub async fn get_progress(&self, id: Uuid) -> Result<Progress> {
        let detail = self.store.load_session(id).await?;
        Ok(Progress::for_session(&detail.session))
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        self.store.list_sessions().await
    }

    /// Delete a session and everything it owns.
    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        self.store.delete_session(id).await
    }

    pub async fn export_session(&self, id: Uuid, format: ExportFormat) -> Result<String> {
        let detail = self.store.load_session(id).await?;
        match format {
            ExportFormat::Json => export::to_json(&detail),
            ExportFormat::Markdown => Ok(export::to_markdown(&detail)),
        }
    }
}
