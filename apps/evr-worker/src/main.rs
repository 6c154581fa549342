//! evr-worker: runs routing jobs through the escalation pipeline.
//!
//! Configuration comes from the environment (a `.env` file is honoured);
//! see `evr_escalation::config` for the variables.  Log verbosity follows
//! `RUST_LOG`.

mod cli;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use serde_json::{Map, Value};

use evr_escalation::{EscalationConfig, EscalationPipeline, Job, JobPayload, JobStatus};
use evr_network::{BuiltinRegions, RoadGraph};
use evr_select::RouteRequest;

use cli::{Cli, Command};

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = EscalationConfig::from_env().context("reading configuration")?;
    let region = config.region.clone();
    let data_dir = config.graph_data_dir.clone();
    let pipeline = EscalationPipeline::from_config(config)?;

    #[cfg(feature = "sqlite")]
    let pipeline = match &cli.db {
        Some(path) => {
            let store = evr_escalation::SqliteJobStore::open(path)
                .with_context(|| format!("opening job database {}", path.display()))?;
            pipeline.with_store(Box::new(store))
        }
        None => pipeline,
    };

    match cli.command {
        Command::Run { payload, job_id } => {
            let payload = read_payload(&payload)?;
            let mut job = match job_id {
                Some(id) => Job::with_id(id, payload),
                None => Job::new(payload),
            };
            let status = pipeline.process(&mut job)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
            if status == JobStatus::Failed {
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Compare { origin, destination, capacity, charge, profile } => {
            let graph = graph_for(&pipeline, &region)?;
            let req = RouteRequest::new(origin, destination, capacity, charge).with_profile(profile);
            let results = pipeline.optimizer().compare(&graph, &req);
            if results.is_empty() {
                bail!("no model found a route from {} to {}", req.origin, req.destination);
            }
            let mut out = Map::new();
            for (model, route) in results {
                out.insert(model.as_str().to_string(), serde_json::to_value(route)?);
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
        }

        Command::Route { origin, destination, capacity, charge, model, profile } => {
            let graph = graph_for(&pipeline, &region)?;
            let req = RouteRequest::new(origin, destination, capacity, charge)
                .with_model(model)
                .with_profile(profile);
            let route = pipeline.optimizer().route(&graph, &req)?;
            println!("{}", serde_json::to_string_pretty(&route)?);
        }

        Command::Regions => {
            if let Some(dir) = &data_dir {
                println!("csv root: {}", dir.display());
            }
            println!("built-in: {}", BuiltinRegions::NAMES.join(", "));
            let cached = pipeline.graphs().cached_regions();
            if cached.is_empty() {
                println!("cached:   (none)");
            } else {
                println!("cached:   {}", cached.join(", "));
            }
        }

        Command::ClearCache { region } => {
            pipeline.graphs().clear(region.as_deref())?;
            match region {
                Some(r) => info!("cleared cached graph for region {r}"),
                None => info!("cleared every cached graph"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn read_payload(path: &Path) -> Result<JobPayload> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("reading payload from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).context("parsing job payload")
}

fn graph_for<T: evr_escalation::AgentTransport>(
    pipeline: &EscalationPipeline<T>,
    region: &str,
) -> Result<Arc<RoadGraph>> {
    match pipeline.graphs().get(region)? {
        Some(g) => Ok(g),
        None => bail!("no graph available for region {region:?}"),
    }
}
