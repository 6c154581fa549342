//! Error types for evr-escalation.
//!
//! Only [`PipelineError`] can fail a job.  [`AgentError`] is absorbed by the
//! retry loop and the agent walk, and [`StoreError`] is logged after the
//! job's status has already been decided.

use thiserror::Error;

use evr_core::CoreError;
use evr_network::NetworkError;
use evr_select::SelectError;

use crate::JobStatus;

/// Failure of a single secondary-agent attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("agent {0} has no URL or API key")]
    NotConfigured(String),

    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("could not read response body: {0}")]
    Decode(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Job persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored row could not be turned back into a job.
    #[error("corrupt job record: {0}")]
    Corrupt(String),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("invalid job transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

/// Job-fatal failure raised while computing a result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("no graph available for region {0:?}")]
    GraphUnavailable(String),

    #[error("graph error: {0}")]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Job(#[from] JobError),

    /// Agent client could not be built.
    #[error("agent setup failed: {0}")]
    Agent(#[from] AgentError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
