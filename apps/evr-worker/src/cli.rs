use std::path::PathBuf;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use evr_select::{DriverProfile, RoutingModel};

#[derive(Parser)]
#[command(name = "evr-worker", about = "Battery-constrained EV routing worker", version)]
pub struct Cli {
    /// SQLite file jobs are persisted to.
    #[cfg(feature = "sqlite")]
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process one job payload (JSON file, `-` for stdin) and print the job.
    Run {
        payload: PathBuf,
        #[arg(long = "job-id")]
        job_id: Option<Uuid>,
    },
    /// Route with every model and print each result.
    Compare {
        origin: String,
        destination: String,
        #[arg(long, default_value_t = 60.0)]
        capacity: f64,
        #[arg(long, default_value_t = 45.0)]
        charge: f64,
        #[arg(long, default_value = "balanced")]
        profile: DriverProfile,
    },
    /// Route once with an explicit model.
    Route {
        origin: String,
        destination: String,
        #[arg(long, default_value_t = 60.0)]
        capacity: f64,
        #[arg(long, default_value_t = 45.0)]
        charge: f64,
        #[arg(long, default_value = "dijkstra")]
        model: RoutingModel,
        #[arg(long, default_value = "balanced")]
        profile: DriverProfile,
    },
    /// List built-in and cached regions.
    Regions,
    /// Drop cached graphs, all of them or one region's.
    ClearCache {
        region: Option<String>,
    },
}
