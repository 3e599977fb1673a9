//! Shared types and errors for the Crucible idea-analysis pipeline.
//!
//! This crate provides the foundational types used across all other Crucible
//! crates:
//! - `CrucibleError` — unified error taxonomy
//! - `Session` and its side records — the persisted pipeline state
//! - `AnalysisMode`, `GateDecision` — the branch vocabulary of the pipeline

mod session;

pub use session::{
    Alternative, Analysis, AnalysisMode, Artifact, ArtifactKind, GateDecision, Perspective,
    PerspectiveGroup, Recommendation, Session, SessionDetail, SessionStatus,
};

use uuid::Uuid;

/// Unified error type for all Crucible subsystems.
#[derive(Debug, thiserror::Error)]
pub enum CrucibleError {
    // === Generator / provider errors ===
    #[error("Provider {provider} returned HTTP {status}: {message}")]
    ProviderError {
        provider: String,
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Authentication failed for provider {provider}")]
    AuthError { provider: String },

    #[error("Request to {provider} timed out after {timeout_ms}ms")]
    RequestTimeout { provider: String, timeout_ms: u64 },

    #[error("Generator call '{call}' returned an unusable payload: {message}")]
    MalformedPayload { call: String, message: String },

    // === Persistence errors ===
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session {id} not found")]
    SessionNotFound { id: Uuid },

    // === Input errors ===
    #[error("Invalid idea: {0}")]
    InvalidIdea(String),

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CrucibleError {
    /// Returns `true` if the error is transient and the operation may succeed
    /// on retry. The pipeline itself never retries (failed stages are
    /// skipped), but callers of the generator may.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CrucibleError::RateLimited { .. }
                | CrucibleError::RequestTimeout { .. }
                | CrucibleError::ProviderError {
                    retryable: true,
                    ..
                }
        )
    }
}

/// A convenience alias for `Result<T, CrucibleError>`.
pub type Result<T> = std::result::Result<T, CrucibleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_provider_error() {
        let err = CrucibleError::ProviderError {
            provider: "openai".into(),
            status: 500,
            message: "internal server error".into(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "Provider openai returned HTTP 500: internal server error"
        );
    }

    #[test]
    fn error_display_rate_limited() {
        let err = CrucibleError::RateLimited {
            provider: "anthropic".into(),
            retry_after_ms: 3000,
        };
        assert_eq!(
            err.to_string(),
            "Rate limited by anthropic, retry after 3000ms"
        );
    }

    #[test]
    fn error_display_session_not_found() {
        let id = Uuid::nil();
        let err = CrucibleError::SessionNotFound { id };
        assert_eq!(
            err.to_string(),
            format!("Session {} not found", id)
        );
    }

    #[test]
    fn error_display_malformed_payload() {
        let err = CrucibleError::MalformedPayload {
            call: "viability".into(),
            message: "no decision field".into(),
        };
        assert_eq!(
            err.to_string(),
            "Generator call 'viability' returned an unusable payload: no decision field"
        );
    }

    // --- is_retryable ---

    #[test]
    fn retryable_rate_limited() {
        let err = CrucibleError::RateLimited {
            provider: "x".into(),
            retry_after_ms: 1000,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn retryable_provider_error_when_flagged() {
        let err = CrucibleError::ProviderError {
            provider: "x".into(),
            status: 503,
            message: "unavailable".into(),
            retryable: true,
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn not_retryable_provider_error_when_not_flagged() {
        let err = CrucibleError::ProviderError {
            provider: "x".into(),
            status: 400,
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_retryable_auth_error() {
        let err = CrucibleError::AuthError {
            provider: "x".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn not_retryable_storage() {
        let err = CrucibleError::Storage("disk full".into());
        assert!(!err.is_retryable());
    }

    // --- From impls ---

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CrucibleError = io_err.into();
        assert!(matches!(err, CrucibleError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CrucibleError = json_err.into();
        assert!(matches!(err, CrucibleError::Json(_)));
    }

    // --- Result alias ---

    #[test]
    fn result_alias_works() {
        fn example() -> Result<u32> {
            Ok(42)
        }
        assert_eq!(example().unwrap(), 42);
    }
}
