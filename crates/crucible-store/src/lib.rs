//! Session persistence.
//!
//! The pipeline talks to storage only through the [`SessionStore`] trait:
//! create a row, save the full row, load by id, plus append-only child
//! inserts. Every stage transition is one `save_session` of the whole row,
//! which is what makes concurrent progress polls see consistent snapshots.

mod sqlite;

pub use sqlite::{default_db_path, SqliteStore};

use async_trait::async_trait;
use uuid::Uuid;

use crucible_types::{Alternative, Analysis, Artifact, Result, Session, SessionDetail};

/// The persistence collaborator. One implementation over SQLite; tests may
/// substitute their own.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a freshly created session row.
    async fn create_session(&self, session: &Session) -> Result<()>;

    /// Persist the full session row. Called after every stage transition.
    async fn save_session(&self, session: &Session) -> Result<()>;

    /// Load a session together with all of its side records.
    async fn load_session(&self, id: Uuid) -> Result<SessionDetail>;

    /// All sessions, most recently started first.
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// Delete a session and everything it owns.
    async fn delete_session(&self, id: Uuid) -> Result<()>;

    async fn add_analysis(&self, analysis: &Analysis) -> Result<()>;

    async fn add_artifact(&self, artifact: &Artifact) -> Result<()>;

    async fn add_alternative(&self, alternative: &Alternative) -> Result<()>;
}
