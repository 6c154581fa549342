//! Worker configuration from environment-style variables.
//!
//! | Variable                    | Default                        |
//! |-----------------------------|--------------------------------|
//! | `DEEPSEEK_API_URL` / `_KEY` | unset (primary agent skipped)  |
//! | `GROQ_API_URL` / `_KEY`     | unset (fallback agent skipped) |
//! | `AI_CONFIDENCE_THRESHOLD`   | 0.75                           |
//! | `AI_MAX_TRIES`              | 3                              |
//! | `AI_BASE_BACKOFF`           | 1.0 (seconds)                  |
//! | `AI_REQUEST_TIMEOUT_SECS`   | 20                             |
//! | `GRAPH_REGION`              | `netherlands`                  |
//! | `GRAPH_CACHE_DIR`           | `<tmp>/evr_graph_cache`        |
//! | `GRAPH_DATA_DIR`            | unset (built-in regions only)  |
//! | `ALLOW_DEGRADED_ROUTING`    | `true`                         |
//!
//! The `EV_*` solver constants are read by [`SolverConfig::from_lookup`].

use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use evr_core::config::parse_var;
use evr_core::{CoreError, CoreResult, SolverConfig};

use crate::RetryPolicy;

/// A secondary optimisation agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentEndpoint {
    pub name:    String,
    pub url:     String,
    pub api_key: String,
}

impl AgentEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into(), api_key: api_key.into() }
    }
}

/// Agents in priority order: `(name, url variable, key variable)`.
pub const AGENT_VARS: [(&str, &str, &str); 2] = [
    ("deepseek", "DEEPSEEK_API_URL", "DEEPSEEK_API_KEY"),
    ("groq",     "GROQ_API_URL",     "GROQ_API_KEY"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct EscalationConfig {
    /// Configured agents in the order they are tried.
    pub agents:               Vec<AgentEndpoint>,
    /// Escalate when the base confidence is strictly below this.
    pub confidence_threshold: f64,
    pub retry:                RetryPolicy,
    /// Per-attempt HTTP timeout.
    pub request_timeout:      Duration,
    pub solver:               SolverConfig,
    pub region:               String,
    pub graph_cache_dir:      PathBuf,
    /// Root of `<region>/*.csv` graphs, tried before the built-in regions.
    pub graph_data_dir:       Option<PathBuf>,
    /// Emit a straight-line placeholder route when no graph is available.
    pub allow_degraded:       bool,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            agents:               Vec::new(),
            confidence_threshold: 0.75,
            retry:                RetryPolicy::default(),
            request_timeout:      Duration::from_secs(20),
            solver:               SolverConfig::default(),
            region:               "netherlands".to_string(),
            graph_cache_dir:      std::env::temp_dir().join("evr_graph_cache"),
            graph_data_dir:       None,
            allow_degraded:       true,
        }
    }
}

impl EscalationConfig {
    /// Read the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Read from an arbitrary lookup.  Missing keys keep their defaults;
    /// unparseable values are an error.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let mut agents = Vec::new();
        for (name, url_var, key_var) in AGENT_VARS {
            let url = lookup(url_var).filter(|v| !v.trim().is_empty());
            let key = lookup(key_var).filter(|v| !v.trim().is_empty());
            match (url, key) {
                (Some(url), Some(key)) => agents.push(AgentEndpoint::new(name, url.trim(), key.trim())),
                _ => debug!("{name} agent not configured; skipping"),
            }
        }

        let max_tries: u32 = parse_var(&lookup, "AI_MAX_TRIES", d.retry.max_tries)?;
        if max_tries == 0 {
            return Err(CoreError::Config("AI_MAX_TRIES must be at least 1".into()));
        }
        let backoff_secs: f64 = parse_var(&lookup, "AI_BASE_BACKOFF", d.retry.base_backoff.as_secs_f64())?;
        let base_backoff = Duration::try_from_secs_f64(backoff_secs)
            .map_err(|e| CoreError::Config(format!("AI_BASE_BACKOFF={backoff_secs}: {e}")))?;
        let timeout_secs: u64 = parse_var(&lookup, "AI_REQUEST_TIMEOUT_SECS", d.request_timeout.as_secs())?;

        let allow_degraded = match lookup("ALLOW_DEGRADED_ROUTING") {
            Some(raw) if !raw.trim().is_empty() => parse_flag("ALLOW_DEGRADED_ROUTING", &raw)?,
            _ => d.allow_degraded,
        };

        Ok(Self {
            agents,
            confidence_threshold: parse_var(&lookup, "AI_CONFIDENCE_THRESHOLD", d.confidence_threshold)?,
            retry:                RetryPolicy::new(max_tries, base_backoff),
            request_timeout:      Duration::from_secs(timeout_secs),
            solver:               SolverConfig::from_lookup(&lookup)?,
            region:               parse_var(&lookup, "GRAPH_REGION", d.region)?,
            graph_cache_dir:      parse_var(&lookup, "GRAPH_CACHE_DIR", d.graph_cache_dir)?,
            graph_data_dir:       lookup("GRAPH_DATA_DIR")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            allow_degraded,
        })
    }

    /// `true` iff `confidence` is strictly below the threshold.
    #[inline]
    pub fn should_call_ai(&self, confidence: f64) -> bool {
        confidence < self.confidence_threshold
    }
}

fn parse_flag(key: &str, raw: &str) -> CoreResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Config(format!("{key}={raw:?}: expected true or false"))),
    }
}
