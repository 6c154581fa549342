//! Secondary optimisation agents.
//!
//! Agents are called one at a time in priority order.  Each call goes
//! through the [`RetryPolicy`]; non-2xx responses and transport failures are
//! both retried.  The walk stops at the first agent that returns a
//! non-empty reply, whether or not that reply is later accepted.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    AgentEndpoint, AgentError, AgentResult, Constraints, JobPayload, JobResult, RetryPolicy,
    RouteMetrics, Sleeper, ThreadSleeper,
};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentMeta {
    pub job_id:          Uuid,
    pub base_confidence: f64,
    pub metrics:         RouteMetrics,
}

/// Body POSTed to every agent.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AgentRequest {
    pub route:       Vec<String>,
    pub origin:      String,
    pub destination: String,
    pub constraints: Constraints,
    pub meta:        AgentMeta,
}

impl AgentRequest {
    pub fn new(job_id: Uuid, payload: &JobPayload, base: &JobResult) -> Self {
        Self {
            route:       base.route.clone(),
            origin:      payload.origin.clone(),
            destination: payload.destination.clone(),
            constraints: payload.constraints.clone(),
            meta: AgentMeta {
                job_id,
                base_confidence: base.confidence,
                metrics:         base.metrics.clone(),
            },
        }
    }
}

/// An agent's reply.  Every field is optional.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SecondaryAgentResponse {
    pub route: Option<Vec<String>>,
    pub improvement_score: Option<f64>,
    pub confidence: Option<f64>,
    pub metrics: Option<RouteMetrics>,
    /// Unrecognised keys, and known keys whose value has the wrong type.
    pub extra: Map<String, Value>,
    /// Body that was not a JSON object.
    pub raw: Option<String>,
}

impl SecondaryAgentResponse {
    /// Decode a 2xx body.
    ///
    /// Each top-level field is decoded on its own, so one mistyped field
    /// never hides the others.  `null`, `false`, `""` and `[]` are empty
    /// replies.  Any other body that is not a JSON object is kept verbatim
    /// in `raw`, so it still counts as a reply (one with no route).
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => Self::from_map(map),
            Ok(Value::Null | Value::Bool(false)) => Self::default(),
            Ok(Value::String(s)) if s.is_empty() => Self::default(),
            Ok(Value::Array(items)) if items.is_empty() => Self::default(),
            _ => Self::raw(body),
        }
    }

    fn from_map(map: Map<String, Value>) -> Self {
        let mut reply = Self::default();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            let unused = match key.as_str() {
                "route" => match route_of(&value) {
                    Some(route) => {
                        reply.route = Some(route);
                        None
                    }
                    None => Some(value),
                },
                "improvement_score" => match value.as_f64() {
                    Some(x) => {
                        reply.improvement_score = Some(x);
                        None
                    }
                    None => Some(value),
                },
                "confidence" => match value.as_f64() {
                    Some(x) => {
                        reply.confidence = Some(x);
                        None
                    }
                    None => Some(value),
                },
                "metrics" => match value {
                    Value::Object(m) => {
                        reply.metrics = Some(RouteMetrics::from_map(m));
                        None
                    }
                    other => Some(other),
                },
                _ => Some(value),
            };
            if let Some(value) = unused {
                if matches!(key.as_str(), "route" | "improvement_score" | "confidence" | "metrics") {
                    warn!("agent reply field {key} has an unexpected type: {value}");
                }
                reply.extra.insert(key, value);
            }
        }
        reply
    }

    fn raw(body: &str) -> Self {
        Self { raw: Some(body.to_string()), ..Self::default() }
    }

    /// `true` for a reply carrying nothing at all, such as `{}`.
    pub fn is_empty(&self) -> bool {
        self.route.is_none()
            && self.improvement_score.is_none()
            && self.confidence.is_none()
            && self.metrics.is_none()
            && self.extra.is_empty()
            && self.raw.is_none()
    }

    /// The proposed route, if present and non-empty.
    pub fn candidate_route(&self) -> Option<&[String]> {
        self.route.as_deref().filter(|r| !r.is_empty())
    }
}

/// An array of strings, or `None` for any other shape.
fn route_of(value: &Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// Sends one request to one agent and returns the 2xx body.
pub trait AgentTransport: Send + Sync {
    fn post(&self, endpoint: &AgentEndpoint, request: &AgentRequest) -> AgentResult<String>;
}

impl<T: AgentTransport + ?Sized> AgentTransport for Arc<T> {
    fn post(&self, endpoint: &AgentEndpoint, request: &AgentRequest) -> AgentResult<String> {
        (**self).post(endpoint, request)
    }
}

/// Blocking HTTPS transport with bearer-token auth.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// `timeout` bounds each attempt.
    pub fn new(timeout: std::time::Duration) -> AgentResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl AgentTransport for HttpTransport {
    fn post(&self, endpoint: &AgentEndpoint, request: &AgentRequest) -> AgentResult<String> {
        if endpoint.url.trim().is_empty() || endpoint.api_key.trim().is_empty() {
            return Err(AgentError::NotConfigured(endpoint.name.clone()));
        }
        let resp = self
            .client
            .post(&endpoint.url)
            .bearer_auth(&endpoint.api_key)
            .json(request)
            .send()
            .map_err(|e| AgentError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().map_err(|e| AgentError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(AgentError::Http { status: status.as_u16(), body });
        }
        Ok(body)
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct AgentReply {
    pub agent:    String,
    pub response: SecondaryAgentResponse,
}

/// What one escalation produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AgentOutcome {
    /// First non-empty reply, if any.
    pub reply:    Option<AgentReply>,
    /// Agents whose every attempt failed, with the last error.
    pub failures: Vec<(String, AgentError)>,
}

pub struct AgentClient<T: AgentTransport> {
    transport: T,
    agents:    Vec<AgentEndpoint>,
    retry:     RetryPolicy,
    sleeper:   Arc<dyn Sleeper>,
}

impl<T: AgentTransport> AgentClient<T> {
    pub fn new(transport: T, agents: Vec<AgentEndpoint>, retry: RetryPolicy) -> Self {
        Self { transport, agents, retry, sleeper: Arc::new(ThreadSleeper) }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn agents(&self) -> &[AgentEndpoint] {
        &self.agents
    }

    /// Walk the agents in order and return the first non-empty reply.
    pub fn call(&self, request: &AgentRequest) -> AgentOutcome {
        let mut outcome = AgentOutcome::default();
        if self.agents.is_empty() {
            debug!("no secondary agents configured");
        }
        for endpoint in &self.agents {
            info!("calling secondary agent {}", endpoint.name);
            let sent = self.retry.run(self.sleeper.as_ref(), &endpoint.name, |_| {
                self.transport.post(endpoint, request)
            });
            match sent {
                Ok(body) => {
                    let response = SecondaryAgentResponse::from_body(&body);
                    if response.is_empty() {
                        info!("{} returned an empty reply", endpoint.name);
                        continue;
                    }
                    info!("{} returned a reply", endpoint.name);
                    outcome.reply = Some(AgentReply { agent: endpoint.name.clone(), response });
                    return outcome;
                }
                Err(e) => {
                    warn!("{} failed after {} attempt(s): {e}", endpoint.name, self.retry.max_tries.max(1));
                    outcome.failures.push((endpoint.name.clone(), e));
                }
            }
        }
        outcome
    }
}
