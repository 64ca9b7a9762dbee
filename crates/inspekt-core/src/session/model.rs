//! Session domain model.
//!
//! A session tracks one uploaded artifact moving through the analysis
//! pipeline. Identity fields are fixed at creation; only `state` changes, and
//! only through transitions the policy in [`super::policy`] permits.

use crate::error::{InspektError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle stage tag, detached from any per-stage payload.
///
/// This is what the transition policy and events operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Created,
    Uploaded,
    Analyzing,
    Completed,
    Error,
}

impl Stage {
    /// All stages, in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::Created,
        Stage::Uploaded,
        Stage::Analyzing,
        Stage::Completed,
        Stage::Error,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Created => "Created",
            Stage::Uploaded => "Uploaded",
            Stage::Analyzing => "Analyzing",
            Stage::Completed => "Completed",
            Stage::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Current pipeline state with the payload valid for that stage.
///
/// Keying the payload by stage makes illegal combinations unrepresentable: a
/// `Created` session cannot carry an analysis result, and a `Completed` one
/// cannot lack a stored artifact path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SessionState {
    /// Minted, upload not yet finished.
    Created,
    /// Artifact stored on disk.
    Uploaded { file_path: String },
    /// Analysis pipeline is running.
    Analyzing { file_path: String },
    /// Pipeline finished; result payload is opaque to this subsystem.
    Completed {
        file_path: String,
        analysis_result: Value,
    },
    /// Any stage failed. Terminal.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<Value>,
    },
}

impl SessionState {
    /// The stage tag for this state.
    pub fn stage(&self) -> Stage {
        match self {
            SessionState::Created => Stage::Created,
            SessionState::Uploaded { .. } => Stage::Uploaded,
            SessionState::Analyzing { .. } => Stage::Analyzing,
            SessionState::Completed { .. } => Stage::Completed,
            SessionState::Error { .. } => Stage::Error,
        }
    }

    /// Stored artifact location, once the upload has completed.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            SessionState::Uploaded { file_path }
            | SessionState::Analyzing { file_path }
            | SessionState::Completed { file_path, .. } => Some(file_path),
            _ => None,
        }
    }

    /// Analysis payload, present only on completion (or as error detail).
    pub fn analysis_result(&self) -> Option<&Value> {
        match self {
            SessionState::Completed {
                analysis_result, ..
            } => Some(analysis_result),
            SessionState::Error { detail } => detail.as_ref(),
            _ => None,
        }
    }
}

/// A requested state change: the target stage plus the fields that stage
/// introduces. Fields already established by earlier stages (the artifact
/// path) are carried over from the current state, not re-supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionTo {
    Uploaded { file_path: String },
    Analyzing,
    Completed { analysis_result: Value },
    Error { detail: Option<Value> },
}

impl TransitionTo {
    /// The stage this request targets.
    pub fn stage(&self) -> Stage {
        match self {
            TransitionTo::Uploaded { .. } => Stage::Uploaded,
            TransitionTo::Analyzing => Stage::Analyzing,
            TransitionTo::Completed { .. } => Stage::Completed,
            TransitionTo::Error { .. } => Stage::Error,
        }
    }

    /// Builds the new state, merging carried-over fields from `current`.
    ///
    /// Callers must have checked the transition policy first; the carry-over
    /// relies on it (e.g. `Analyzing` is only reachable from `Uploaded`,
    /// which always holds a `file_path`).
    pub fn into_state(self, current: &SessionState) -> SessionState {
        match self {
            TransitionTo::Uploaded { file_path } => SessionState::Uploaded { file_path },
            TransitionTo::Analyzing => SessionState::Analyzing {
                file_path: current.file_path().unwrap_or_default().to_string(),
            },
            TransitionTo::Completed { analysis_result } => SessionState::Completed {
                file_path: current.file_path().unwrap_or_default().to_string(),
                analysis_result,
            },
            TransitionTo::Error { detail } => SessionState::Error { detail },
        }
    }
}

/// One tracked session: immutable identity, mutable state.
///
/// Timestamps serialize at millisecond precision so a persisted record
/// compares against `expires_at` exactly as the live one did; finer precision
/// would be lost on round-trip and shift expiry at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier (UUID format), assigned at creation
    pub id: String,
    /// Original uploaded artifact name
    pub file_name: String,
    /// Source language of the artifact
    pub language: String,
    /// Timestamp when the session was created
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// `created_at + TTL`; fixed at creation, never extended
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    /// Current pipeline state (kept last so the TOML table serializes after
    /// the scalar fields)
    pub state: SessionState,
}

impl SessionRecord {
    /// Creates a record in the `Created` state expiring at `now + ttl`.
    ///
    /// # Errors
    ///
    /// Returns a `Validation` error if `file_name` or `language` is blank,
    /// or if `ttl` is not positive.
    pub fn new(
        id: String,
        file_name: &str,
        language: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if file_name.trim().is_empty() {
            return Err(InspektError::validation("file_name must not be empty"));
        }
        if language.trim().is_empty() {
            return Err(InspektError::validation("language must not be empty"));
        }
        if ttl <= Duration::zero() {
            return Err(InspektError::validation("ttl must be positive"));
        }
        Ok(Self {
            id,
            file_name: file_name.to_string(),
            language: language.to_string(),
            created_at: now,
            expires_at: now + ttl,
            state: SessionState::Created,
        })
    }

    /// Whether this record is logically dead at `now`.
    ///
    /// A record at exactly `expires_at` is still live; readers treat
    /// anything past it as absent whether or not a sweep has collected it.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The stage tag of the current state.
    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    /// Stored artifact location, if the upload has completed.
    pub fn file_path(&self) -> Option<&str> {
        self.state.file_path()
    }

    /// Analysis payload, if the pipeline has produced one.
    pub fn analysis_result(&self) -> Option<&Value> {
        self.state.analysis_result()
    }
}
