//! `evr-escalation`: confidence-gated escalation and job processing.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                    |
//! |----------------|-------------------------------------------------------------|
//! | [`config`]     | `EscalationConfig` (environment), `AgentEndpoint`           |
//! | [`confidence`] | `ConfidenceEstimator`, `RouteBased`, `MetricsBased`         |
//! | [`job`]        | `Job` state machine, payload, `JobResult`, `RouteMetrics`   |
//! | [`retry`]      | `RetryPolicy`, `Sleeper`                                    |
//! | [`agent`]      | Agent wire types, `AgentTransport`, `AgentClient`           |
//! | [`accept`]     | Accept/reject rule for agent candidates                     |
//! | [`store`]      | `JobStore`, `MemoryJobStore`                                |
//! | `sqlite`       | `SqliteJobStore` (feature `sqlite`)                         |
//! | [`pipeline`]   | `EscalationPipeline`                                        |
//! | [`error`]      | `AgentError`, `StoreError`, `JobError`, `PipelineError`     |
//!
//! # Feature flags
//!
//! | Flag     | Effect                                  |
//! |----------|-----------------------------------------|
//! | `sqlite` | Enables `SqliteJobStore` via `rusqlite` |

pub mod accept;
pub mod agent;
pub mod confidence;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod retry;
pub mod store;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use agent::{
    AgentClient, AgentOutcome, AgentReply, AgentRequest, AgentTransport, HttpTransport,
    SecondaryAgentResponse,
};
pub use confidence::{ConfidenceEstimator, MetricsBased, RouteBased};
pub use config::{AgentEndpoint, EscalationConfig};
pub use error::{
    AgentError, AgentResult, JobError, PipelineError, PipelineResult, StoreError, StoreResult,
};
pub use job::{Constraints, Job, JobPayload, JobResult, JobStatus, RouteMetrics};
pub use pipeline::{EscalationPipeline, SharedGraphCache};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use store::{JobStore, MemoryJobStore};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteJobStore;
