//! The escalation pipeline: one job from payload to persisted result.
//!
//! [`EscalationPipeline::process`] runs, strictly in sequence:
//!
//! 1. acquire the configured region's graph from the [`GraphCache`];
//! 2. route it with the payload's routing model and score the route;
//! 3. if the score is below the threshold, walk the secondary agents and
//!    judge the first reply with [`accept::judge`](crate::accept::judge);
//! 4. complete or fail the job and persist it.
//!
//! A failure in steps 1–2 fails the job.  Agent failures never do.

use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use evr_network::{BuiltinRegions, CsvRegionSource, GraphCache, RegionSource};
use evr_routing::BatterySearch;
use evr_select::RouteOptimizer;

use crate::accept::judge;
use crate::confidence::{ConfidenceEstimator, MetricsBased, RouteBased};
use crate::{
    AgentClient, AgentRequest, AgentTransport, EscalationConfig, HttpTransport, Job, JobError,
    JobPayload, JobResult, JobStatus, JobStore, MemoryJobStore, PipelineError, PipelineResult,
    RouteMetrics, Sleeper,
};

/// Graph cache shared by every pipeline in a worker.
pub type SharedGraphCache = Arc<GraphCache<Box<dyn RegionSource>>>;

pub struct EscalationPipeline<T: AgentTransport = HttpTransport> {
    config:    EscalationConfig,
    graphs:    SharedGraphCache,
    optimizer: RouteOptimizer<BatterySearch>,
    agents:    AgentClient<T>,
    store:     Box<dyn JobStore>,
}

impl EscalationPipeline<HttpTransport> {
    /// Pipeline over the CSV regions under `config.graph_data_dir` (if set)
    /// and the built-in regions, cached on disk under
    /// `config.graph_cache_dir`, calling agents over HTTPS.
    pub fn from_config(config: EscalationConfig) -> PipelineResult<Self> {
        let source: Box<dyn RegionSource> = match &config.graph_data_dir {
            Some(dir) => {
                info!("regions from {} take precedence over the built-in set", dir.display());
                Box::new((CsvRegionSource::new(dir.clone()), BuiltinRegions))
            }
            None => Box::new(BuiltinRegions),
        };
        let graphs = Arc::new(GraphCache::new(source).with_disk_dir(config.graph_cache_dir.clone()));
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(config, graphs, transport))
    }
}

impl<T: AgentTransport> EscalationPipeline<T> {
    pub fn new(config: EscalationConfig, graphs: SharedGraphCache, transport: T) -> Self {
        let optimizer = RouteOptimizer::new(BatterySearch::new(config.solver.clone()));
        let agents = AgentClient::new(transport, config.agents.clone(), config.retry);
        Self {
            config,
            graphs,
            optimizer,
            agents,
            store: Box::new(MemoryJobStore::new()),
        }
    }

    pub fn with_store(mut self, store: Box<dyn JobStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.agents = self.agents.with_sleeper(sleeper);
        self
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn graphs(&self) -> &SharedGraphCache {
        &self.graphs
    }

    pub fn optimizer(&self) -> &RouteOptimizer<BatterySearch> {
        &self.optimizer
    }

    pub fn store(&self) -> &dyn JobStore {
        self.store.as_ref()
    }

    #[inline]
    pub fn should_call_ai(&self, confidence: f64) -> bool {
        self.config.should_call_ai(confidence)
    }

    /// Run `job` to a terminal state and persist it.
    ///
    /// Returns the terminal status.  Fails only if `job` was not PENDING.
    pub fn process(&self, job: &mut Job) -> Result<JobStatus, JobError> {
        job.start()?;
        info!("job {} started: {} -> {}", job.id, job.payload.origin, job.payload.destination);

        match self.run(job.id, &job.payload) {
            Ok(result) => {
                info!("job {} completed from {}", job.id, result.source);
                job.complete(result)?;
            }
            Err(e) => {
                error!("job {} failed: {e}", job.id);
                job.fail(e.to_string())?;
            }
        }

        if let Err(e) = self.store.save(job) {
            error!("could not persist job {}: {e}", job.id);
        }
        Ok(job.status)
    }

    /// Compute the final result for `payload`.
    pub fn run(&self, job_id: Uuid, payload: &JobPayload) -> PipelineResult<JobResult> {
        let base = self.base_result(payload)?;
        info!("base algorithm confidence: {:.3}", base.confidence);

        if !self.should_call_ai(base.confidence) {
            return Ok(base);
        }
        info!(
            "confidence {:.3} below threshold {:.2}; calling secondary agents",
            base.confidence, self.config.confidence_threshold,
        );

        let request = AgentRequest::new(job_id, payload, &base);
        let outcome = self.agents.call(&request);
        let Some(reply) = outcome.reply else {
            let failed: Vec<String> = outcome
                .failures
                .iter()
                .map(|(agent, e)| format!("{agent}: {e}"))
                .collect();
            warn!("secondary agents returned no result [{}]", failed.join("; "));
            return Ok(base);
        };

        let verdict = judge(&base.metrics, &reply.response);
        if !verdict.is_accepted() {
            warn!("candidate from {} rejected ({verdict}); keeping algorithm route", reply.agent);
            return Ok(base);
        }
        info!("candidate from {} accepted ({verdict})", reply.agent);

        let response = reply.response;
        Ok(JobResult {
            source:     format!("ai_{}", reply.agent),
            route:      response.route.unwrap_or_default(),
            confidence: response.confidence.unwrap_or(base.confidence),
            metrics:    response.metrics.unwrap_or(base.metrics),
            agent_improvement_score: response.improvement_score,
        })
    }

    /// The deterministic result, or the degraded placeholder when the region
    /// has no graph and degraded routing is allowed.
    pub fn base_result(&self, payload: &JobPayload) -> PipelineResult<JobResult> {
        let region = &self.config.region;
        let Some(graph) = self.graphs.get(region)? else {
            if !self.config.allow_degraded {
                return Err(PipelineError::GraphUnavailable(region.clone()));
            }
            warn!("no graph for region {region:?}; using degraded straight-line route");
            let metrics = RouteMetrics::degraded();
            let confidence = MetricsBased.estimate(&metrics);
            return Ok(JobResult::algorithm(
                vec![payload.origin.clone(), payload.destination.clone()],
                confidence,
                metrics,
            ));
        };

        let route = self.optimizer.route(&graph, &payload.route_request())?;
        let metrics = RouteMetrics::from_route(&route);
        let confidence = RouteBased.estimate(&metrics);
        Ok(JobResult::algorithm(route.sequence, confidence, metrics))
    }
}
