//! Jobs and their payload and result documents.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING ──start──▶ RUNNING ──complete──▶ COMPLETED
//!    │                  │
//!    └──────fail────────┴──────fail──────▶ FAILED
//! ```
//!
//! Every other transition is a [`JobError::InvalidTransition`].  COMPLETED
//! and FAILED are terminal: nothing on a terminal job changes again.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use evr_core::RouteCandidate;
use evr_select::{DriverProfile, RouteRequest, RoutingModel, SelectionPolicy};

use crate::JobError;

/// Battery assumed when the payload does not say.
pub const DEFAULT_CAPACITY_KWH: f64 = 60.0;
pub const DEFAULT_CHARGE_KWH:   f64 = 45.0;

// ── JobStatus ─────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending   => "PENDING",
            JobStatus::Running   => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed    => "FAILED",
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING"   => Ok(JobStatus::Pending),
            "RUNNING"   => Ok(JobStatus::Running),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED"    => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status {other:?}")),
        }
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Routing constraints carried by a job.  Unrecognised keys are kept in
/// `extra` and forwarded to secondary agents untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_capacity_kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_charge_kwh: Option<f64>,
    /// `dijkstra`, `astar` or `multi_objective`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_profile: Option<String>,
    /// `weighted_sum` or `pareto`; only read by `multi_objective`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub origin:      String,
    pub destination: String,
    #[serde(default)]
    pub constraints: Constraints,
}

impl JobPayload {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin:      origin.into(),
            destination: destination.into(),
            constraints: Constraints::default(),
        }
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Resolve the constraints into a routing request.
    ///
    /// Missing values take their defaults.  Unknown model, profile and
    /// optimisation names fall back to `dijkstra`, `balanced` and
    /// `weighted_sum` with a warning.
    pub fn route_request(&self) -> RouteRequest {
        let c = &self.constraints;
        let policy = match c.optimization.as_deref() {
            None => SelectionPolicy::default(),
            Some(name) => name.parse().unwrap_or_else(|_| {
                warn!("unknown optimization {name:?}, using weighted_sum");
                SelectionPolicy::WeightedSum
            }),
        };
        RouteRequest::new(
            self.origin.clone(),
            self.destination.clone(),
            c.battery_capacity_kwh.unwrap_or(DEFAULT_CAPACITY_KWH),
            c.current_charge_kwh.unwrap_or(DEFAULT_CHARGE_KWH),
        )
        .with_model(c.routing_model.as_deref().map_or_else(RoutingModel::default, RoutingModel::parse_lenient))
        .with_profile(c.driver_profile.as_deref().map_or_else(DriverProfile::default, DriverProfile::parse_lenient))
        .with_policy(policy)
    }
}

// ── Result ────────────────────────────────────────────────────────────────────

/// Route metrics as exchanged with agents and stored in results.
///
/// Every field is optional because agents may report any subset of them.
/// Keys outside the known set, and known keys whose value has the wrong
/// type, are kept in `extra`; decoding a JSON object never fails.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RouteMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_kwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emissions_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charging_stops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown_segment_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallbacks: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for RouteMetrics {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::<String, Value>::deserialize(deserializer).map(Self::from_map)
    }
}

impl RouteMetrics {
    /// Decode a metrics object leniently.  `null` values are dropped.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let mut m = Self::default();
        for (key, value) in map {
            let taken = match key.as_str() {
                "distance_m"               => take_f64(&mut m.distance_m, &value),
                "duration_s"               => take_f64(&mut m.duration_s, &value),
                "energy_kwh"               => take_f64(&mut m.energy_kwh, &value),
                "emissions_g"              => take_f64(&mut m.emissions_g, &value),
                "unknown_segment_fraction" => take_f64(&mut m.unknown_segment_fraction, &value),
                "charging_stops"           => take_count(&mut m.charging_stops, &value),
                "fallbacks"                => take_count(&mut m.fallbacks, &value),
                _ => false,
            };
            if !taken {
                m.extra.insert(key, value);
            }
        }
        m
    }

    /// Metrics of a full graph search: no unknown segments, no fallbacks.
    pub fn from_route(route: &RouteCandidate) -> Self {
        Self {
            distance_m:               Some(route.distance_km * 1000.0),
            duration_s:               Some(route.time_min * 60.0),
            energy_kwh:               Some(route.energy_kwh),
            emissions_g:              Some(route.emissions_g),
            charging_stops:           Some(route.charging_stop_count() as u32),
            unknown_segment_fraction: Some(0.0),
            fallbacks:                Some(0),
            extra:                    Map::new(),
        }
    }

    /// Placeholder metrics of a straight origin–destination route.
    pub fn degraded() -> Self {
        Self {
            distance_m:               Some(5000.0),
            duration_s:               Some(1200.0),
            energy_kwh:               Some(1.0),
            emissions_g:              None,
            charging_stops:           None,
            unknown_segment_fraction: Some(0.7),
            fallbacks:                Some(1),
            extra:                    Map::new(),
        }
    }
}

fn take_f64(slot: &mut Option<f64>, value: &Value) -> bool {
    match value {
        Value::Null => true,
        _ => match value.as_f64() {
            Some(x) => {
                *slot = Some(x);
                true
            }
            None => false,
        },
    }
}

/// Counts accept integral floats such as `1.0`.
fn take_count(slot: &mut Option<u32>, value: &Value) -> bool {
    if value.is_null() {
        return true;
    }
    let count = match value.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => value
            .as_f64()
            .filter(|x| x.fract() == 0.0 && *x >= 0.0 && *x <= f64::from(u32::MAX))
            .map(|x| x as u32),
    };
    match count {
        Some(n) => {
            *slot = Some(n);
            true
        }
        None => false,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// `algorithm`, or `ai_<agent>` when a secondary candidate was accepted.
    pub source:     String,
    pub route:      Vec<String>,
    pub confidence: f64,
    pub metrics:    RouteMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_improvement_score: Option<f64>,
}

impl JobResult {
    pub const ALGORITHM: &'static str = "algorithm";

    pub fn algorithm(route: Vec<String>, confidence: f64, metrics: RouteMetrics) -> Self {
        Self {
            source: Self::ALGORITHM.to_string(),
            route,
            confidence,
            metrics,
            agent_improvement_score: None,
        }
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id:         Uuid,
    pub payload:    JobPayload,
    pub status:     JobStatus,
    pub result:     Option<JobResult>,
    pub error:      Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A new PENDING job with a random id.
    pub fn new(payload: JobPayload) -> Self {
        Self::with_id(Uuid::new_v4(), payload)
    }

    pub fn with_id(id: Uuid, payload: JobPayload) -> Self {
        let now = Utc::now();
        Self {
            id,
            payload,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// PENDING → RUNNING.
    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(&[JobStatus::Pending], JobStatus::Running)
    }

    /// RUNNING → COMPLETED, recording `result`.
    pub fn complete(&mut self, result: JobResult) -> Result<(), JobError> {
        self.transition(&[JobStatus::Running], JobStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// PENDING or RUNNING → FAILED, recording `error`.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), JobError> {
        self.transition(&[JobStatus::Pending, JobStatus::Running], JobStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, from: &[JobStatus], to: JobStatus) -> Result<(), JobError> {
        if !from.contains(&self.status) {
            return Err(JobError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
