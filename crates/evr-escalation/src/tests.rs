//! Unit tests for evr-escalation.
//!
//! Agents are replaced by [`helpers::StubTransport`], which replays canned
//! replies per agent name, and sleeps by [`helpers::RecordingSleeper`], so
//! no test touches the network or waits on a backoff.

#[cfg(test)]
mod helpers {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use rustc_hash::FxHashMap;

    use evr_network::{GraphCache, GraphData, NetworkResult, RegionSource};

    use crate::{
        AgentEndpoint, AgentError, AgentRequest, AgentResult, AgentTransport, EscalationConfig,
        EscalationPipeline, RetryPolicy, Sleeper,
    };

    pub const REGION: &str = "test";

    /// `P–Q` (3 km), `Q–R` (5 km).  `P → R` takes 20 min = 1200 s.
    pub struct Fixed;

    impl RegionSource for Fixed {
        fn load_region(&self, region: &str) -> NetworkResult<Option<GraphData>> {
            if region != REGION {
                return Ok(None);
            }
            let mut g = GraphData::default();
            g.node("P", 52.00, 4.90)
                .node("Q", 52.02, 4.90)
                .node("R", 52.06, 4.90)
                .edge("P", "Q", 3.0)
                .edge("Q", "R", 5.0);
            Ok(Some(g))
        }
    }

    #[derive(Default)]
    pub struct StubTransport {
        replies: Mutex<FxHashMap<String, VecDeque<AgentResult<String>>>>,
        pub calls: Mutex<Vec<(String, AgentRequest)>>,
    }

    impl StubTransport {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue `reply` for the next call to `agent`.
        pub fn push(&self, agent: &str, reply: AgentResult<String>) {
            self.replies.lock().unwrap().entry(agent.to_string()).or_default().push_back(reply);
        }

        pub fn ok(&self, agent: &str, body: &str) {
            self.push(agent, Ok(body.to_string()));
        }

        pub fn called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
        }
    }

    impl AgentTransport for StubTransport {
        fn post(&self, endpoint: &AgentEndpoint, request: &AgentRequest) -> AgentResult<String> {
            self.calls.lock().unwrap().push((endpoint.name.clone(), request.clone()));
            self.replies
                .lock()
                .unwrap()
                .get_mut(&endpoint.name)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(AgentError::Transport("connection refused".into())))
        }
    }

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub slept: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn total(&self) -> Duration {
            self.slept.lock().unwrap().iter().sum()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    /// Both agents configured, three tries with a 1 s base, and a threshold
    /// above the 0.9 a short route scores, so every job escalates.
    pub fn escalating_config() -> EscalationConfig {
        EscalationConfig {
            agents: vec![
                AgentEndpoint::new("deepseek", "https://primary.invalid/optimize", "k1"),
                AgentEndpoint::new("groq", "https://fallback.invalid/optimize", "k2"),
            ],
            confidence_threshold: 0.95,
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
            region: REGION.to_string(),
            ..EscalationConfig::default()
        }
    }

    pub fn pipeline(
        config: EscalationConfig,
        transport: &Arc<StubTransport>,
        sleeper: &Arc<RecordingSleeper>,
    ) -> EscalationPipeline<Arc<StubTransport>> {
        let source: Box<dyn RegionSource> = Box::new(Fixed);
        let graphs = Arc::new(GraphCache::new(source));
        EscalationPipeline::new(config, graphs, Arc::clone(transport)).with_sleeper(sleeper.clone())
    }
}

// ── Job state machine & documents ─────────────────────────────────────────────

#[cfg(test)]
mod job {
    use serde_json::json;

    use evr_select::{DriverProfile, RoutingModel, SelectionPolicy};

    use crate::{Job, JobError, JobPayload, JobResult, JobStatus, RouteMetrics};

    fn result() -> JobResult {
        JobResult::algorithm(vec!["P".into(), "R".into()], 0.9, RouteMetrics::default())
    }

    #[test]
    fn happy_path() {
        let mut job = Job::new(JobPayload::new("P", "R"));
        assert_eq!(job.status, JobStatus::Pending);
        job.start().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        job.complete(result()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.result.is_some());
        assert!(job.updated_at >= job.created_at);
    }

    #[test]
    fn pending_job_can_fail() {
        let mut job = Job::new(JobPayload::new("P", "R"));
        job.fail("boom").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = Job::new(JobPayload::new("P", "R"));
        job.start().unwrap();
        job.complete(result()).unwrap();
        let before = job.clone();

        assert_eq!(
            job.fail("late"),
            Err(JobError::InvalidTransition { from: JobStatus::Completed, to: JobStatus::Failed })
        );
        assert!(job.start().is_err());
        assert!(job.complete(result()).is_err());
        assert_eq!(job, before);
    }

    #[test]
    fn complete_requires_running() {
        let mut job = Job::new(JobPayload::new("P", "R"));
        assert_eq!(
            job.complete(result()),
            Err(JobError::InvalidTransition { from: JobStatus::Pending, to: JobStatus::Completed })
        );
        assert!(job.result.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = Job::new(JobPayload::new("P", "R"));
        let b = Job::new(JobPayload::new("P", "R"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_value(JobStatus::Completed).unwrap(), json!("COMPLETED"));
        assert_eq!("FAILED".parse::<JobStatus>().unwrap(), JobStatus::Failed);
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn payload_keeps_unknown_constraints() {
        let payload: JobPayload = serde_json::from_value(json!({
            "origin": "Amsterdam_Central",
            "destination": "Museumplein",
            "constraints": {
                "battery_capacity_kwh": 75.0,
                "current_charge_kwh": 30,
                "routing_model": "astar",
                "driver_profile": "ECO",
                "avoid_tolls": true
            }
        }))
        .unwrap();
        assert_eq!(payload.constraints.battery_capacity_kwh, Some(75.0));
        assert_eq!(payload.constraints.current_charge_kwh, Some(30.0));
        assert_eq!(payload.constraints.extra.get("avoid_tolls"), Some(&json!(true)));

        let back = serde_json::to_value(&payload).unwrap();
        assert_eq!(back["constraints"]["avoid_tolls"], json!(true));
        assert_eq!(back["constraints"]["routing_model"], json!("astar"));

        let req = payload.route_request();
        assert_eq!(req.capacity_kwh, 75.0);
        assert_eq!(req.charge_kwh, 30.0);
        assert_eq!(req.model, RoutingModel::Astar);
        assert_eq!(req.profile, DriverProfile::Eco);
    }

    #[test]
    fn missing_constraints_take_defaults() {
        let payload: JobPayload =
            serde_json::from_value(json!({"origin": "P", "destination": "R"})).unwrap();
        let req = payload.route_request();
        assert_eq!(req.capacity_kwh, 60.0);
        assert_eq!(req.charge_kwh, 45.0);
        assert_eq!(req.model, RoutingModel::Dijkstra);
        assert_eq!(req.profile, DriverProfile::Balanced);
        assert_eq!(req.policy, SelectionPolicy::WeightedSum);
    }

    #[test]
    fn unknown_names_fall_back() {
        let payload: JobPayload = serde_json::from_value(json!({
            "origin": "P",
            "destination": "R",
            "constraints": {
                "routing_model": "teleport",
                "driver_profile": "EFFICIENT",
                "optimization": "lexicographic"
            }
        }))
        .unwrap();
        let req = payload.route_request();
        assert_eq!(req.model, RoutingModel::Dijkstra);
        assert_eq!(req.profile, DriverProfile::Balanced);
        assert_eq!(req.policy, SelectionPolicy::WeightedSum);
    }

    #[test]
    fn result_omits_absent_score() {
        let v = serde_json::to_value(result()).unwrap();
        assert_eq!(v["source"], json!("algorithm"));
        assert!(v.get("agent_improvement_score").is_none());
    }
}

// ── Confidence ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod confidence {
    use evr_core::{ChargingStop, GeoPoint, PowerClass, RouteCandidate};

    use crate::confidence::route_confidence;
    use crate::{ConfidenceEstimator, MetricsBased, RouteBased, RouteMetrics};

    /// Route with 0.2 kWh/km energy and `stops` charging stops.
    fn route(distance_km: f64, stops: usize) -> RouteCandidate {
        let stop = ChargingStop {
            station_id:  "CS".into(),
            location:    GeoPoint::new(52.0, 4.9),
            power_kw:    50.0,
            power_class: PowerClass::Fast,
        };
        RouteCandidate {
            sequence:        vec!["A".into(), "B".into()],
            coordinates:     Vec::new(),
            battery_profile: Vec::new(),
            distance_km,
            time_min:        distance_km * 2.5,
            energy_kwh:      distance_km * 0.2,
            emissions_g:     distance_km * 0.2 * 84.5,
            charging_stops:  vec![stop; stops],
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn short_route_scores_base() {
        assert!(close(route_confidence(&route(8.0, 0)), 0.9));
    }

    #[test]
    fn penalties() {
        assert!(close(route_confidence(&route(25.0, 0)), 0.8));
        assert!(close(route_confidence(&route(10.0, 4)), 0.8));
        // 80 km: long and over 15 kWh.
        assert!(close(route_confidence(&route(80.0, 0)), 0.7));
    }

    #[test]
    fn efficiency_bonus() {
        let m = RouteMetrics {
            distance_m: Some(16_000.0),
            energy_kwh: Some(1.0),
            ..RouteMetrics::default()
        };
        assert!(close(RouteBased.estimate(&m), 0.95));
    }

    #[test]
    fn clamped_below() {
        let m = RouteMetrics {
            distance_m:     Some(100_000.0),
            energy_kwh:     Some(20.0),
            charging_stops: Some(30),
            ..RouteMetrics::default()
        };
        assert_eq!(RouteBased.estimate(&m), 0.1);
    }

    #[test]
    fn monotonic_in_distance_and_stops() {
        let mut last = f64::INFINITY;
        for km in [15.0, 20.0, 20.5, 40.0, 74.0, 76.0, 150.0] {
            let c = route_confidence(&route(km, 1));
            assert!(c <= last, "{km} km raised confidence to {c}");
            last = c;
        }
        let mut last = f64::INFINITY;
        for stops in 0..12 {
            let c = route_confidence(&route(12.0, stops));
            assert!(c <= last, "{stops} stops raised confidence to {c}");
            last = c;
        }
    }

    #[test]
    fn metrics_based_formula() {
        assert_eq!(MetricsBased.estimate(&RouteMetrics::default()), 1.0);
        assert!(close(MetricsBased.estimate(&RouteMetrics::degraded()), 0.41));
        let worst = RouteMetrics {
            unknown_segment_fraction: Some(1.0),
            fallbacks: Some(50),
            ..RouteMetrics::default()
        };
        // 1 − 0.8 − 5 × 0.03, fallbacks capped at 5.
        assert!(close(MetricsBased.estimate(&worst), 0.05));
        let beyond = RouteMetrics { unknown_segment_fraction: Some(2.0), ..RouteMetrics::default() };
        assert_eq!(MetricsBased.estimate(&beyond), 0.0);
    }
}

// ── Configuration ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod config {
    use std::collections::HashMap;
    use std::time::Duration;

    use evr_core::CoreError;

    use crate::EscalationConfig;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let c = EscalationConfig::from_lookup(lookup(&[])).unwrap();
        assert!(c.agents.is_empty());
        assert_eq!(c.confidence_threshold, 0.75);
        assert_eq!(c.retry.max_tries, 3);
        assert_eq!(c.retry.base_backoff, Duration::from_secs(1));
        assert_eq!(c.request_timeout, Duration::from_secs(20));
        assert_eq!(c.region, "netherlands");
        assert!(c.allow_degraded);
        assert!(c.graph_data_dir.is_none());
        assert_eq!(c.solver.low_battery_kwh, 5.0);
    }

    #[test]
    fn graph_data_dir() {
        let c = EscalationConfig::from_lookup(lookup(&[("GRAPH_DATA_DIR", " /srv/evr/regions ")])).unwrap();
        assert_eq!(c.graph_data_dir, Some(std::path::PathBuf::from("/srv/evr/regions")));
        let blank = EscalationConfig::from_lookup(lookup(&[("GRAPH_DATA_DIR", "  ")])).unwrap();
        assert!(blank.graph_data_dir.is_none());
    }

    #[test]
    fn agents_in_priority_order() {
        let c = EscalationConfig::from_lookup(lookup(&[
            ("GROQ_API_URL", "https://groq.example/v1"),
            ("GROQ_API_KEY", "g"),
            ("DEEPSEEK_API_URL", "https://deepseek.example/v1"),
            ("DEEPSEEK_API_KEY", "d"),
        ]))
        .unwrap();
        let names: Vec<&str> = c.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["deepseek", "groq"]);
        assert_eq!(c.agents[0].api_key, "d");
    }

    #[test]
    fn agent_without_key_is_skipped() {
        let c = EscalationConfig::from_lookup(lookup(&[
            ("DEEPSEEK_API_URL", "https://deepseek.example/v1"),
            ("GROQ_API_URL", "https://groq.example/v1"),
            ("GROQ_API_KEY", "g"),
        ]))
        .unwrap();
        assert_eq!(c.agents.len(), 1);
        assert_eq!(c.agents[0].name, "groq");
    }

    #[test]
    fn overrides() {
        let c = EscalationConfig::from_lookup(lookup(&[
            ("AI_CONFIDENCE_THRESHOLD", "0.6"),
            ("AI_MAX_TRIES", "5"),
            ("AI_BASE_BACKOFF", "0.25"),
            ("AI_REQUEST_TIMEOUT_SECS", "3"),
            ("GRAPH_REGION", "amsterdam"),
            ("GRAPH_CACHE_DIR", "/var/cache/evr"),
            ("ALLOW_DEGRADED_ROUTING", "false"),
            ("EV_STATION_RADIUS_KM", "8"),
        ]))
        .unwrap();
        assert_eq!(c.confidence_threshold, 0.6);
        assert_eq!(c.retry.max_tries, 5);
        assert_eq!(c.retry.base_backoff, Duration::from_millis(250));
        assert_eq!(c.request_timeout, Duration::from_secs(3));
        assert_eq!(c.region, "amsterdam");
        assert_eq!(c.graph_cache_dir, std::path::PathBuf::from("/var/cache/evr"));
        assert!(!c.allow_degraded);
        assert_eq!(c.solver.station_radius_km, 8.0);
    }

    #[test]
    fn bad_values_are_errors() {
        for (k, v) in [
            ("AI_MAX_TRIES", "three"),
            ("AI_MAX_TRIES", "0"),
            ("AI_BASE_BACKOFF", "-1"),
            ("AI_CONFIDENCE_THRESHOLD", "high"),
            ("ALLOW_DEGRADED_ROUTING", "maybe"),
            ("EV_ENERGY_PER_KM", "lots"),
        ] {
            assert!(
                matches!(EscalationConfig::from_lookup(lookup(&[(k, v)])), Err(CoreError::Config(_))),
                "{k}={v} should be rejected"
            );
        }
    }

    #[test]
    fn threshold_boundary() {
        let c = EscalationConfig::default();
        assert!(c.should_call_ai(0.7499));
        assert!(!c.should_call_ai(0.75));
        assert!(!c.should_call_ai(0.9));
    }
}

// ── Retry ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod retry {
    use std::sync::Arc;
    use std::time::Duration;

    use super::helpers::RecordingSleeper;
    use crate::RetryPolicy;

    #[test]
    fn backoff_doubles() {
        let p = RetryPolicy::new(4, Duration::from_millis(500));
        assert_eq!(p.backoff(1), Duration::from_millis(500));
        assert_eq!(p.backoff(2), Duration::from_secs(1));
        assert_eq!(p.backoff(3), Duration::from_secs(2));
        assert_eq!(p.backoff(4), Duration::from_secs(4));
    }

    #[test]
    fn succeeds_after_failures() {
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = RetryPolicy::new(3, Duration::from_secs(1));
        let out: Result<u32, String> = p.run(sleeper.as_ref(), "op", |attempt| {
            if attempt < 3 { Err(format!("fail {attempt}")) } else { Ok(attempt) }
        });
        assert_eq!(out, Ok(3));
        assert_eq!(*sleeper.slept.lock().unwrap(), [Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[test]
    fn exhausted_returns_last_error_after_sleeping() {
        let sleeper = RecordingSleeper::default();
        let p = RetryPolicy::new(3, Duration::from_secs(1));
        let mut attempts = 0;
        let out: Result<(), String> = p.run(&sleeper, "op", |attempt| {
            attempts += 1;
            Err(format!("fail {attempt}"))
        });
        assert_eq!(out, Err("fail 3".to_string()));
        assert_eq!(attempts, 3);
        assert_eq!(sleeper.total(), Duration::from_secs(7));
    }

    #[test]
    fn zero_tries_still_attempts_once() {
        let sleeper = RecordingSleeper::default();
        let out: Result<u8, String> = RetryPolicy::new(0, Duration::ZERO).run(&sleeper, "op", |_| Ok(1));
        assert_eq!(out, Ok(1));
    }
}

// ── Accept/reject ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod accept {
    use serde_json::json;

    use crate::accept::{Verdict, judge};
    use crate::{RouteMetrics, SecondaryAgentResponse};

    fn base(duration_s: f64) -> RouteMetrics {
        RouteMetrics { duration_s: Some(duration_s), ..RouteMetrics::default() }
    }

    fn reply(v: serde_json::Value) -> SecondaryAgentResponse {
        SecondaryAgentResponse::from_body(&v.to_string())
    }

    #[test]
    fn faster_duration_is_accepted() {
        let r = reply(json!({"route": ["P", "R"], "metrics": {"duration_s": 1180}}));
        assert_eq!(judge(&base(1200.0), &r), Verdict::FasterDuration);
    }

    #[test]
    fn marginal_duration_is_rejected() {
        let r = reply(json!({"route": ["P", "R"], "metrics": {"duration_s": 1195}}));
        assert_eq!(judge(&base(1200.0), &r), Verdict::NotFaster);
    }

    #[test]
    fn improvement_score_threshold() {
        let ok = reply(json!({"route": ["P", "R"], "improvement_score": 0.02}));
        assert_eq!(judge(&base(1200.0), &ok), Verdict::ImprovementScore);
        let low = reply(json!({"route": ["P", "R"], "improvement_score": 0.019}));
        assert_eq!(judge(&base(1200.0), &low), Verdict::LowImprovement);
    }

    #[test]
    fn low_score_wins_over_faster_duration() {
        let r = reply(json!({
            "route": ["P", "R"],
            "improvement_score": 0.0,
            "metrics": {"duration_s": 10}
        }));
        assert!(!judge(&base(1200.0), &r).is_accepted());
    }

    #[test]
    fn missing_or_empty_route_is_rejected() {
        let none = reply(json!({"improvement_score": 0.5}));
        assert_eq!(judge(&base(1200.0), &none), Verdict::NoRoute);
        let empty = reply(json!({"route": [], "improvement_score": 0.5}));
        assert_eq!(judge(&base(1200.0), &empty), Verdict::NoRoute);
    }

    #[test]
    fn no_evidence_is_rejected() {
        let r = reply(json!({"route": ["P", "R"], "confidence": 0.99}));
        assert_eq!(judge(&base(1200.0), &r), Verdict::NoEvidence);
        let r = reply(json!({"route": ["P", "R"], "metrics": {"duration_s": 100}}));
        assert_eq!(judge(&RouteMetrics::default(), &r), Verdict::NoEvidence);
        assert_eq!(judge(&base(0.0), &r), Verdict::NoEvidence);
    }
}

// ── Agent wire types & client ─────────────────────────────────────────────────

#[cfg(test)]
mod agent {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use uuid::Uuid;

    use super::helpers::{RecordingSleeper, StubTransport};
    use crate::{
        AgentClient, AgentEndpoint, AgentError, AgentRequest, JobPayload, JobResult, RetryPolicy,
        RouteMetrics, SecondaryAgentResponse,
    };

    fn request() -> AgentRequest {
        let base = JobResult::algorithm(vec!["P".into(), "R".into()], 0.5, RouteMetrics::default());
        AgentRequest::new(Uuid::new_v4(), &JobPayload::new("P", "R"), &base)
    }

    fn client(stub: &Arc<StubTransport>, sleeper: &Arc<RecordingSleeper>) -> AgentClient<Arc<StubTransport>> {
        AgentClient::new(
            Arc::clone(stub),
            vec![AgentEndpoint::new("a", "https://a.invalid", "ka"), AgentEndpoint::new("b", "https://b.invalid", "kb")],
            RetryPolicy::new(2, Duration::from_millis(100)),
        )
        .with_sleeper(sleeper.clone())
    }

    #[test]
    fn decodes_full_reply() {
        let r = SecondaryAgentResponse::from_body(
            r#"{"route":["P","X","R"],"improvement_score":0.1,"confidence":0.8,
                "metrics":{"duration_s":900,"distance_m":7000,"traffic":"light"},"model":"v2"}"#,
        );
        assert_eq!(r.candidate_route().unwrap(), ["P", "X", "R"]);
        assert_eq!(r.improvement_score, Some(0.1));
        assert_eq!(r.confidence, Some(0.8));
        let m = r.metrics.as_ref().unwrap();
        assert_eq!(m.duration_s, Some(900.0));
        assert_eq!(m.extra.get("traffic"), Some(&json!("light")));
        assert_eq!(r.extra.get("model"), Some(&json!("v2")));
        assert!(r.raw.is_none());
    }

    #[test]
    fn empty_object_is_empty() {
        assert!(SecondaryAgentResponse::from_body("{}").is_empty());
        assert!(SecondaryAgentResponse::from_body(r#"{"route": null}"#).is_empty());
    }

    #[test]
    fn falsy_bodies_are_empty() {
        for body in ["null", "[]", "false", "\"\"", " null "] {
            assert!(SecondaryAgentResponse::from_body(body).is_empty(), "{body} should be empty");
        }
        assert!(!SecondaryAgentResponse::from_body("[1]").is_empty());
        assert!(!SecondaryAgentResponse::from_body("true").is_empty());
    }

    #[test]
    fn non_json_body_is_kept_raw() {
        let r = SecondaryAgentResponse::from_body("<html>ok</html>");
        assert!(!r.is_empty());
        assert_eq!(r.raw.as_deref(), Some("<html>ok</html>"));
        assert!(r.candidate_route().is_none());

        let wrong_shape = SecondaryAgentResponse::from_body(r#"{"route": 42, "improvement_score": 0.3}"#);
        assert!(wrong_shape.raw.is_none());
        assert!(wrong_shape.candidate_route().is_none());
        assert_eq!(wrong_shape.improvement_score, Some(0.3));
        assert_eq!(wrong_shape.extra.get("route"), Some(&json!(42)));
    }

    #[test]
    fn mistyped_metrics_keep_route_and_score() {
        let r = SecondaryAgentResponse::from_body(
            r#"{"route":["P","R"],"improvement_score":0.5,
                "metrics":{"duration_s":900,"charging_stops":"two","fallbacks":1.0,"energy_kwh":null}}"#,
        );
        assert!(r.raw.is_none());
        assert_eq!(r.candidate_route().unwrap(), ["P", "R"]);
        assert_eq!(r.improvement_score, Some(0.5));
        let m = r.metrics.as_ref().unwrap();
        assert_eq!(m.duration_s, Some(900.0));
        assert_eq!(m.charging_stops, None);
        assert_eq!(m.extra.get("charging_stops"), Some(&json!("two")));
        assert_eq!(m.fallbacks, Some(1));
        assert_eq!(m.energy_kwh, None);
        assert!(!m.extra.contains_key("energy_kwh"));

        let base = RouteMetrics { duration_s: Some(1200.0), ..RouteMetrics::default() };
        assert_eq!(crate::accept::judge(&base, &r), crate::accept::Verdict::ImprovementScore);
    }

    #[test]
    fn mistyped_top_level_fields_do_not_hide_others() {
        let r = SecondaryAgentResponse::from_body(
            r#"{"route":["P","R"],"confidence":"high","improvement_score":0.05,"metrics":[1,2]}"#,
        );
        assert_eq!(r.candidate_route().unwrap(), ["P", "R"]);
        assert_eq!(r.improvement_score, Some(0.05));
        assert_eq!(r.confidence, None);
        assert!(r.metrics.is_none());
        assert_eq!(r.extra.get("confidence"), Some(&json!("high")));
        assert_eq!(r.extra.get("metrics"), Some(&json!([1, 2])));
    }

    #[test]
    fn stored_metrics_decode_leniently() {
        let m: RouteMetrics =
            serde_json::from_value(json!({"duration_s": 60, "charging_stops": -1, "traffic": "light"})).unwrap();
        assert_eq!(m.duration_s, Some(60.0));
        assert_eq!(m.charging_stops, None);
        assert_eq!(m.extra.get("charging_stops"), Some(&json!(-1)));

        let back: RouteMetrics = serde_json::from_value(serde_json::to_value(&m).unwrap()).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn request_body_shape() {
        let v = serde_json::to_value(request()).unwrap();
        assert_eq!(v["route"], json!(["P", "R"]));
        assert_eq!(v["origin"], json!("P"));
        assert_eq!(v["meta"]["base_confidence"], json!(0.5));
        assert!(v["meta"]["job_id"].is_string());
        assert!(v["constraints"].is_object());
    }

    #[test_log::test]
    fn stops_at_first_non_empty_reply() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("a", r#"{"route":["P","R"],"improvement_score":0.5}"#);
        stub.ok("b", r#"{"route":["P","Q","R"],"improvement_score":0.9}"#);

        let out = client(&stub, &sleeper).call(&request());
        assert_eq!(out.reply.unwrap().agent, "a");
        assert_eq!(stub.called(), ["a"]);
        assert!(out.failures.is_empty());
    }

    #[test_log::test]
    fn failed_agent_moves_to_next() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.push("a", Err(AgentError::Http { status: 502, body: "bad gateway".into() }));
        stub.push("a", Err(AgentError::Http { status: 503, body: "unavailable".into() }));
        stub.ok("b", r#"{"route":["P","R"]}"#);

        let out = client(&stub, &sleeper).call(&request());
        assert_eq!(out.reply.unwrap().agent, "b");
        assert_eq!(stub.called(), ["a", "a", "b"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].1, AgentError::Http { status: 503, body: "unavailable".into() });
        assert_eq!(sleeper.total(), Duration::from_millis(300));
    }

    #[test_log::test]
    fn no_agents_no_reply() {
        let stub = StubTransport::new();
        let out = AgentClient::new(Arc::clone(&stub), Vec::new(), RetryPolicy::default()).call(&request());
        assert!(out.reply.is_none());
        assert!(stub.called().is_empty());
    }
}

// ── Stores ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod store {
    use uuid::Uuid;

    use crate::{Job, JobPayload, JobStore, MemoryJobStore};

    #[test]
    fn memory_round_trip() {
        let store = MemoryJobStore::new();
        let mut job = Job::new(JobPayload::new("P", "R"));
        store.save(&job).unwrap();
        job.fail("boom").unwrap();
        store.save(&job).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load(job.id).unwrap(), Some(job));
        assert_eq!(store.load(Uuid::new_v4()).unwrap(), None);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_round_trip() {
        use crate::{JobResult, JobStatus, RouteMetrics, SqliteJobStore};

        let dir = tempfile::tempdir().unwrap();
        let store = SqliteJobStore::open(&dir.path().join("nested").join("jobs.db")).unwrap();

        let mut job = Job::new(JobPayload::new("P", "R"));
        job.start().unwrap();
        store.save(&job).unwrap();
        job.complete(JobResult::algorithm(vec!["P".into(), "R".into()], 0.9, RouteMetrics::default()))
            .unwrap();
        store.save(&job).unwrap();

        let loaded = store.load(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.result, job.result);
        assert_eq!(loaded.payload, job.payload);
        assert_eq!(loaded.created_at, job.created_at);
        assert!(store.load(Uuid::new_v4()).unwrap().is_none());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn sqlite_in_memory_overwrites_by_id() {
        use crate::{JobStatus, SqliteJobStore};

        let store = SqliteJobStore::in_memory().unwrap();
        let mut job = Job::new(JobPayload::new("P", "R"));
        store.save(&job).unwrap();
        job.fail("no graph").unwrap();
        store.save(&job).unwrap();

        let loaded = store.load(job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("no graph"));
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod pipeline {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::helpers::{self, RecordingSleeper, StubTransport};
    use crate::{
        AgentError, EscalationConfig, Job, JobError, JobPayload, JobStatus, JobStore,
        MemoryJobStore, StoreError, StoreResult,
    };

    fn job() -> Job {
        Job::new(JobPayload::new("P", "R"))
    }

    #[test_log::test]
    fn confident_route_skips_agents() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let store = Arc::new(MemoryJobStore::new());
        let config = EscalationConfig {
            confidence_threshold: 0.75,
            ..helpers::escalating_config()
        };
        let p = helpers::pipeline(config, &stub, &sleeper).with_store(Box::new(Arc::clone(&store)));

        let mut job = job();
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        let result = job.result.as_ref().unwrap();
        assert_eq!(result.source, "algorithm");
        assert_eq!(result.route, ["P", "Q", "R"]);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert_eq!(result.metrics.duration_s, Some(1200.0));
        assert_eq!(result.metrics.distance_m, Some(8000.0));
        assert_eq!(result.metrics.charging_stops, Some(0));
        assert!(stub.called().is_empty());

        assert_eq!(store.load(job.id).unwrap(), Some(job));
    }

    #[test_log::test]
    fn eventual_success_after_retries() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.push("deepseek", Err(AgentError::Http { status: 503, body: String::new() }));
        stub.push("deepseek", Err(AgentError::Transport("timed out".into())));
        stub.ok("deepseek", r#"{"route":["P","X","R"],"improvement_score":0.05}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        let result = job.result.unwrap();
        assert_eq!(result.source, "ai_deepseek");
        assert_eq!(result.route, ["P", "X", "R"]);
        assert_eq!(result.agent_improvement_score, Some(0.05));
        // No candidate confidence or metrics: the base values carry over.
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert_eq!(result.metrics.duration_s, Some(1200.0));

        assert_eq!(stub.called(), ["deepseek", "deepseek", "deepseek"]);
        // 1 s + 2 s for the two failed attempts.
        assert_eq!(sleeper.total(), Duration::from_secs(3));
    }

    #[test_log::test]
    fn faster_candidate_replaces_base() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", r#"{"route":["P","R"],"confidence":0.97,"metrics":{"duration_s":1180}}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        let result = job.result.unwrap();
        assert_eq!(result.source, "ai_deepseek");
        assert_eq!(result.confidence, 0.97);
        assert_eq!(result.metrics.duration_s, Some(1180.0));
        assert_eq!(result.agent_improvement_score, None);
    }

    #[test_log::test]
    fn marginal_candidate_keeps_base() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", r#"{"route":["P","R"],"metrics":{"duration_s":1195}}"#);
        stub.ok("groq", r#"{"route":["P","R"],"improvement_score":0.5}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        let result = job.result.unwrap();
        assert_eq!(result.source, "algorithm");
        assert_eq!(result.route, ["P", "Q", "R"]);
        // A rejected reply still ends the agent walk.
        assert_eq!(stub.called(), ["deepseek"]);
    }

    #[test_log::test]
    fn empty_reply_falls_through_to_fallback() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", "{}");
        stub.ok("groq", r#"{"route":["P","R"],"improvement_score":0.1}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        assert_eq!(job.result.unwrap().source, "ai_groq");
        assert_eq!(stub.called(), ["deepseek", "groq"]);
        assert!(sleeper.slept.lock().unwrap().is_empty());
    }

    #[test_log::test]
    fn null_reply_falls_through_to_fallback() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", "null");
        stub.ok("groq", r#"{"route":["P","R"],"improvement_score":0.1}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        assert_eq!(job.result.unwrap().source, "ai_groq");
        assert_eq!(stub.called(), ["deepseek", "groq"]);
    }

    #[test_log::test]
    fn mistyped_metrics_still_accepted_on_score() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok(
            "deepseek",
            r#"{"route":["P","R"],"improvement_score":0.5,"metrics":{"duration_s":900,"charging_stops":"one"}}"#,
        );
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        let result = job.result.unwrap();
        assert_eq!(result.source, "ai_deepseek");
        assert_eq!(result.route, ["P", "R"]);
        assert_eq!(result.metrics.duration_s, Some(900.0));
        assert_eq!(stub.called(), ["deepseek"]);
    }

    #[test_log::test]
    fn every_agent_failing_keeps_base() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        assert_eq!(job.result.unwrap().source, "algorithm");
        assert_eq!(stub.called().len(), 6);
        // (1 + 2 + 4) s per agent.
        assert_eq!(sleeper.total(), Duration::from_secs(14));
    }

    #[test_log::test]
    fn raw_reply_is_rejected() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", "optimised!");
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        p.process(&mut job).unwrap();
        assert_eq!(job.result.unwrap().source, "algorithm");
        assert_eq!(stub.called(), ["deepseek"]);
    }

    #[test_log::test]
    fn agent_request_carries_base_result() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        stub.ok("deepseek", r#"{"route":["P","R"],"improvement_score":0.0}"#);
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut constraints = crate::Constraints::default();
        constraints.extra.insert("avoid_tolls".into(), json!(true));
        let mut job = Job::new(JobPayload::new("P", "R").with_constraints(constraints));
        p.process(&mut job).unwrap();

        let calls = stub.calls.lock().unwrap();
        let (_, req) = &calls[0];
        assert_eq!(req.meta.job_id, job.id);
        assert_eq!(req.route, ["P", "Q", "R"]);
        assert!((req.meta.base_confidence - 0.9).abs() < 1e-9);
        assert_eq!(req.meta.metrics.duration_s, Some(1200.0));
        assert_eq!(req.constraints.extra.get("avoid_tolls"), Some(&json!(true)));
    }

    #[test_log::test]
    fn degraded_route_when_region_is_missing() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = EscalationConfig {
            region: "atlantis".into(),
            agents: Vec::new(),
            ..helpers::escalating_config()
        };
        let p = helpers::pipeline(config, &stub, &sleeper);

        let mut job = Job::new(JobPayload::new("Harbour", "Temple"));
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        let result = job.result.unwrap();
        assert_eq!(result.route, ["Harbour", "Temple"]);
        assert!((result.confidence - 0.41).abs() < 1e-9);
        assert_eq!(result.metrics.distance_m, Some(5000.0));
        assert_eq!(result.metrics.fallbacks, Some(1));
    }

    #[test_log::test]
    fn missing_region_fails_without_degraded_mode() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = EscalationConfig {
            region: "atlantis".into(),
            allow_degraded: false,
            ..helpers::escalating_config()
        };
        let p = helpers::pipeline(config, &stub, &sleeper);

        let mut job = job();
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Failed);
        assert!(job.result.is_none());
        assert!(job.error.unwrap().contains("atlantis"));
    }

    #[test_log::test]
    fn unknown_endpoint_fails_job() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = Job::new(JobPayload::new("P", "Z"));
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Failed);
        assert!(job.error.unwrap().contains("\"Z\""));
        assert!(stub.called().is_empty());
    }

    struct BrokenStore;

    impl JobStore for BrokenStore {
        fn save(&self, _job: &Job) -> StoreResult<()> {
            Err(StoreError::Corrupt("disk full".into()))
        }

        fn load(&self, _id: uuid::Uuid) -> StoreResult<Option<Job>> {
            Ok(None)
        }
    }

    #[test_log::test]
    fn persistence_failure_keeps_status() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = EscalationConfig { confidence_threshold: 0.75, ..helpers::escalating_config() };
        let p = helpers::pipeline(config, &stub, &sleeper).with_store(Box::new(BrokenStore));

        let mut job = job();
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        assert!(job.result.is_some());
    }

    #[test_log::test]
    fn only_pending_jobs_are_processed() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let p = helpers::pipeline(helpers::escalating_config(), &stub, &sleeper);

        let mut job = job();
        job.start().unwrap();
        assert_eq!(
            p.process(&mut job),
            Err(JobError::InvalidTransition { from: JobStatus::Running, to: JobStatus::Running })
        );
    }

    #[test_log::test]
    fn multi_objective_through_pipeline() {
        let stub = StubTransport::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = EscalationConfig { confidence_threshold: 0.75, ..helpers::escalating_config() };
        let p = helpers::pipeline(config, &stub, &sleeper);

        let payload: JobPayload = serde_json::from_value(json!({
            "origin": "P",
            "destination": "R",
            "constraints": {"routing_model": "multi_objective", "optimization": "pareto", "driver_profile": "eco"}
        }))
        .unwrap();
        let mut job = Job::new(payload);
        p.process(&mut job).unwrap();
        assert_eq!(job.result.unwrap().route, ["P", "Q", "R"]);
    }

    fn write_mini_region(root: &std::path::Path) {
        let dir = root.join("mini");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("nodes.csv"), "id,lat,lon\nX,52.00,4.90\nY,52.03,4.90\n").unwrap();
        std::fs::write(dir.join("edges.csv"), "from,to,weight_km\nX,Y,4.0\n").unwrap();
    }

    #[test_log::test]
    fn from_config_routes_over_csv_regions() {
        let data = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_mini_region(data.path());
        let config = EscalationConfig {
            region: "mini".into(),
            graph_data_dir: Some(data.path().to_path_buf()),
            graph_cache_dir: cache.path().to_path_buf(),
            ..EscalationConfig::default()
        };
        let p = crate::EscalationPipeline::from_config(config).unwrap();

        let mut job = Job::new(JobPayload::new("X", "Y"));
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        let result = job.result.unwrap();
        assert_eq!(result.source, "algorithm");
        assert_eq!(result.route, ["X", "Y"]);
        assert_eq!(result.metrics.distance_m, Some(4000.0));
    }

    #[test_log::test]
    fn from_config_keeps_builtin_regions_behind_csv() {
        let data = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        write_mini_region(data.path());
        let config = EscalationConfig {
            region: "amsterdam".into(),
            graph_data_dir: Some(data.path().to_path_buf()),
            graph_cache_dir: cache.path().to_path_buf(),
            allow_degraded: false,
            ..EscalationConfig::default()
        };
        let p = crate::EscalationPipeline::from_config(config).unwrap();

        let mut job = Job::new(JobPayload::new("Amsterdam_Central", "Museumplein"));
        assert_eq!(p.process(&mut job).unwrap(), JobStatus::Completed);
        assert!(p.graphs().get("mini").unwrap().is_some());
    }
}
