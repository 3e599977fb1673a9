//! SQLite implementation of [`SessionStore`] on an `sqlx` pool.
//!
//! Schema creation is idempotent and runs at open time. Enum fields are
//! stored as their snake_case strings, timestamps as RFC 3339 text, and
//! `stages_completed` as a serialized JSON list.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;
use uuid::Uuid;

use crucible_types::{
    Alternative, Analysis, AnalysisMode, Artifact, ArtifactKind, CrucibleError, Recommendation,
    Result, Session, SessionDetail, SessionStatus,
};

use crate::SessionStore;

/// Default database location: `~/.crucible/crucible.db`, overridable with
/// `CRUCIBLE_DB`.
pub fn default_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CRUCIBLE_DB") {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME")
        .map_err(|_| CrucibleError::Other("HOME environment variable not set".into()))?;
    Ok(PathBuf::from(home).join(".crucible").join("crucible.db"))
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the database at `path` and ensure the
    /// schema exists.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        debug!(path = %path.display(), "database schema ready");
        Ok(store)
    }

    /// Open the default database (see [`default_db_path`]).
    pub async fn open_default() -> Result<Self> {
        let path = default_db_path()?;
        Self::open(&path).await
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id                TEXT PRIMARY KEY,
                raw_idea          TEXT NOT NULL,
                title             TEXT NOT NULL,
                status            TEXT NOT NULL,
                current_stage     TEXT,
                stages_completed  TEXT NOT NULL DEFAULT '[]',
                overall_score     REAL,
                recommendation    TEXT,
                early_exit        INTEGER NOT NULL DEFAULT 0,
                pivot_focus       INTEGER NOT NULL DEFAULT 0,
                early_exit_reason TEXT,
                flaw_type         TEXT,
                viability_check   TEXT,
                refined_idea      TEXT,
                started_at        TEXT NOT NULL,
                completed_at      TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id          TEXT PRIMARY KEY,
                session_id  TEXT NOT NULL REFERENCES sessions(id),
                perspective TEXT NOT NULL,
                score       REAL,
                narrative   TEXT NOT NULL,
                detail      TEXT,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                id         TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                kind       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alternatives (
                id         TEXT PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id),
                title      TEXT NOT NULL,
                summary    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn upsert_session(&self, session: &Session, replace: bool) -> Result<()> {
        let verb = if replace {
            "INSERT OR REPLACE"
        } else {
            "INSERT"
        };
        let sql = format!(
            r#"
            {verb} INTO sessions (
                id, raw_idea, title, status, current_stage, stages_completed,
                overall_score, recommendation, early_exit, pivot_focus,
                early_exit_reason, flaw_type, viability_check, refined_idea,
                started_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        );

        let stages = serde_json::to_string(&session.stages_completed)?;
        let viability = session
            .viability_check
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(&sql)
            .bind(session.id.to_string())
            .bind(&session.raw_idea)
            .bind(&session.title)
            .bind(session.status.as_str())
            .bind(&session.current_stage)
            .bind(stages)
            .bind(session.overall_score)
            .bind(session.recommendation.map(|r| r.as_str()))
            .bind(session.early_exit() as i64)
            .bind(session.pivot_focus() as i64)
            .bind(&session.early_exit_reason)
            .bind(&session.flaw_type)
            .bind(viability)
            .bind(&session.refined_idea)
            .bind(session.started_at.to_rfc3339())
            .bind(session.completed_at.map(|t| t.to_rfc3339()))
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

type SessionRow = (
    String,         // id
    String,         // raw_idea
    String,         // title
    String,         // status
    Option<String>, // current_stage
    String,         // stages_completed
    Option<f64>,    // overall_score
    Option<String>, // recommendation
    i64,            // early_exit
    i64,            // pivot_focus
    Option<String>, // early_exit_reason
    Option<String>, // flaw_type
    Option<String>, // viability_check
    Option<String>, // refined_idea
    String,         // started_at
    Option<String>, // completed_at
);

const SESSION_COLUMNS: &str = "id, raw_idea, title, status, current_stage, stages_completed, \
     overall_score, recommendation, early_exit, pivot_focus, early_exit_reason, \
     flaw_type, viability_check, refined_idea, started_at, completed_at";

fn storage_err(e: sqlx::Error) -> CrucibleError {
    CrucibleError::Storage(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| CrucibleError::Storage(format!("bad uuid '{s}': {e}")))
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CrucibleError::Storage(format!("bad timestamp '{s}': {e}")))
}

fn session_from_row(row: SessionRow) -> Result<Session> {
    let (
        id,
        raw_idea,
        title,
        status,
        current_stage,
        stages_completed,
        overall_score,
        recommendation,
        early_exit,
        pivot_focus,
        early_exit_reason,
        flaw_type,
        viability_check,
        refined_idea,
        started_at,
        completed_at,
    ) = row;

    let status = SessionStatus::parse(&status)
        .ok_or_else(|| CrucibleError::Storage(format!("unknown status '{status}'")))?;
    let recommendation = match recommendation {
        Some(r) => Some(
            Recommendation::parse(&r)
                .ok_or_else(|| CrucibleError::Storage(format!("unknown recommendation '{r}'")))?,
        ),
        None => None,
    };

    Ok(Session {
        id: parse_uuid(&id)?,
        raw_idea,
        title,
        status,
        current_stage,
        stages_completed: serde_json::from_str(&stages_completed)?,
        overall_score,
        recommendation,
        mode: AnalysisMode::from_flags(early_exit != 0, pivot_focus != 0),
        early_exit_reason,
        flaw_type,
        viability_check: viability_check
            .map(|v| serde_json::from_str(&v))
            .transpose()?,
        refined_idea,
        started_at: parse_timestamp(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

// ---------------------------------------------------------------------------
// SessionStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        self.upsert_session(session, false).await
    }

    async fn save_session(&self, session: &Session) -> Result<()> {
        self.upsert_session(session, true).await
    }

    async fn load_session(&self, id: Uuid) -> Result<SessionDetail> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?
        .ok_or(CrucibleError::SessionNotFound { id })?;

        let session = session_from_row(row)?;

        let analysis_rows = sqlx::query_as::<
            _,
            (String, String, String, Option<f64>, String, Option<String>, String),
        >(
            "SELECT id, session_id, perspective, score, narrative, detail, created_at \
             FROM analyses WHERE session_id = ? ORDER BY rowid",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut analyses = Vec::with_capacity(analysis_rows.len());
        for (aid, sid, perspective, score, narrative, detail, created_at) in analysis_rows {
            analyses.push(Analysis {
                id: parse_uuid(&aid)?,
                session_id: parse_uuid(&sid)?,
                perspective,
                score,
                narrative,
                detail: detail.map(|d| serde_json::from_str(&d)).transpose()?,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        let artifact_rows = sqlx::query_as::<_, (String, String, String, String, String)>(
            "SELECT id, session_id, kind, content, created_at \
             FROM artifacts WHERE session_id = ? ORDER BY rowid",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut artifacts = Vec::with_capacity(artifact_rows.len());
        for (aid, sid, kind, content, created_at) in artifact_rows {
            let kind = ArtifactKind::parse(&kind)
                .ok_or_else(|| CrucibleError::Storage(format!("unknown artifact kind '{kind}'")))?;
            artifacts.push(Artifact {
                id: parse_uuid(&aid)?,
                session_id: parse_uuid(&sid)?,
                kind,
                content,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        let alternative_rows = sqlx::query_as::<_, (String, String, String, String, String)>(
            "SELECT id, session_id, title, summary, created_at \
             FROM alternatives WHERE session_id = ? ORDER BY rowid",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut alternatives = Vec::with_capacity(alternative_rows.len());
        for (aid, sid, title, summary, created_at) in alternative_rows {
            alternatives.push(Alternative {
                id: parse_uuid(&aid)?,
                session_id: parse_uuid(&sid)?,
                title,
                summary,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        Ok(SessionDetail {
            session,
            analyses,
            artifacts,
            alternatives,
        })
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.into_iter().map(session_from_row).collect()
    }

    async fn delete_session(&self, id: Uuid) -> Result<()> {
        // Children first; artifacts are exclusively owned by their session.
        for table in ["analyses", "artifacts", "alternatives"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE session_id = ?"))
                .bind(id.to_string())
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(CrucibleError::SessionNotFound { id });
        }
        Ok(())
    }

    async fn add_analysis(&self, analysis: &Analysis) -> Result<()> {
        let detail = analysis
            .detail
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO analyses (id, session_id, perspective, score, narrative, detail, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(analysis.id.to_string())
        .bind(analysis.session_id.to_string())
        .bind(&analysis.perspective)
        .bind(analysis.score)
        .bind(&analysis.narrative)
        .bind(detail)
        .bind(analysis.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn add_artifact(&self, artifact: &Artifact) -> Result<()> {
        sqlx::query(
            "INSERT INTO artifacts (id, session_id, kind, content, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(artifact.id.to_string())
        .bind(artifact.session_id.to_string())
        .bind(artifact.kind.stage_name())
        .bind(&artifact.content)
        .bind(artifact.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn add_alternative(&self, alternative: &Alternative) -> Result<()> {
        sqlx::query(
            "INSERT INTO alternatives (id, session_id, title, summary, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(alternative.id.to_string())
        .bind(alternative.session_id.to_string())
        .bind(&alternative.title)
        .bind(&alternative.summary)
        .bind(alternative.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn create_and_load_round_trip() {
        let (store, _dir) = open_temp().await;

        let mut session = Session::new("A subscription box for left-handed scissors.");
        session.record_stage("first_principles");
        session.overall_score = Some(70.0);
        store.create_session(&session).await.unwrap();

        let detail = store.load_session(session.id).await.unwrap();
        assert_eq!(detail.session.id, session.id);
        assert_eq!(detail.session.raw_idea, session.raw_idea);
        assert_eq!(detail.session.stages_completed, vec!["first_principles"]);
        assert_eq!(detail.session.overall_score, Some(70.0));
        assert_eq!(detail.session.status, SessionStatus::Analyzing);
        assert!(detail.analyses.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_full_row() {
        let (store, _dir) = open_temp().await;

        let mut session = Session::new("idea");
        store.create_session(&session).await.unwrap();

        session.record_stage("first_principles");
        session.record_stage("design");
        session.mode = AnalysisMode::PivotFocus;
        session.flaw_type = Some("weak_moat".into());
        session.viability_check = Some(serde_json::json!({"decision": "focus_on_pivots"}));
        session.complete();
        store.save_session(&session).await.unwrap();

        let loaded = store.load_session(session.id).await.unwrap().session;
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.stages_completed, vec!["first_principles", "design"]);
        assert_eq!(loaded.mode, AnalysisMode::PivotFocus);
        assert!(loaded.pivot_focus());
        assert!(!loaded.early_exit());
        assert_eq!(loaded.flaw_type.as_deref(), Some("weak_moat"));
        assert_eq!(
            loaded.viability_check.unwrap()["decision"],
            "focus_on_pivots"
        );
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn early_exit_mode_round_trips() {
        let (store, _dir) = open_temp().await;

        let mut session = Session::new("idea");
        session.mode = AnalysisMode::EarlyExit;
        session.recommendation = Some(Recommendation::Abandon);
        store.create_session(&session).await.unwrap();

        let loaded = store.load_session(session.id).await.unwrap().session;
        assert_eq!(loaded.mode, AnalysisMode::EarlyExit);
        assert!(loaded.early_exit());
        assert!(loaded.pivot_focus());
        assert_eq!(loaded.recommendation, Some(Recommendation::Abandon));
    }

    #[tokio::test]
    async fn load_missing_session_is_not_found() {
        let (store, _dir) = open_temp().await;
        let err = store.load_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CrucibleError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn children_load_in_insertion_order() {
        let (store, _dir) = open_temp().await;

        let session = Session::new("idea");
        store.create_session(&session).await.unwrap();

        for (perspective, score) in [("first_principles", Some(70.0)), ("design", None)] {
            store
                .add_analysis(&Analysis::new(
                    session.id,
                    perspective,
                    score,
                    format!("{perspective} narrative"),
                    Some(serde_json::json!({"score": score})),
                ))
                .await
                .unwrap();
        }
        store
            .add_artifact(&Artifact::new(
                session.id,
                ArtifactKind::ExecutionPlan,
                "the plan".into(),
            ))
            .await
            .unwrap();
        store
            .add_alternative(&Alternative::new(session.id, "B2B".into(), "offices".into()))
            .await
            .unwrap();

        let detail = store.load_session(session.id).await.unwrap();
        assert_eq!(detail.analyses.len(), 2);
        assert_eq!(detail.analyses[0].perspective, "first_principles");
        assert_eq!(detail.analyses[1].score, None);
        assert_eq!(detail.artifacts.len(), 1);
        assert_eq!(detail.artifacts[0].kind, ArtifactKind::ExecutionPlan);
        assert_eq!(detail.alternatives.len(), 1);
        assert_eq!(detail.alternatives[0].title, "B2B");
    }

    #[tokio::test]
    async fn list_sessions_newest_first() {
        let (store, _dir) = open_temp().await;

        let mut first = Session::new("first idea");
        first.started_at = Utc::now() - chrono::Duration::seconds(10);
        let second = Session::new("second idea");
        store.create_session(&first).await.unwrap();
        store.create_session(&second).await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, second.id);
        assert_eq!(sessions[1].id, first.id);
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let (store, _dir) = open_temp().await;

        let session = Session::new("idea");
        store.create_session(&session).await.unwrap();
        store
            .add_analysis(&Analysis::new(session.id, "financial", Some(50.0), "n".into(), None))
            .await
            .unwrap();
        store
            .add_alternative(&Alternative::new(session.id, "alt".into(), "s".into()))
            .await
            .unwrap();

        store.delete_session(session.id).await.unwrap();

        let err = store.load_session(session.id).await.unwrap_err();
        assert!(matches!(err, CrucibleError::SessionNotFound { .. }));
        // A fresh session with the same children tables stays unaffected.
        assert!(store.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_session_is_not_found() {
        let (store, _dir) = open_temp().await;
        let err = store.delete_session(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, CrucibleError::SessionNotFound { .. }));
    }
}
