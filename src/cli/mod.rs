//! Command-line parsing for the maritime LEO demand and revenue estimator.
//!
//! Argument parsing and command dispatch stay separate from the estimation
//! code; every stage is reachable on its own or through `run`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Default directory for stage outputs.
pub const DEFAULT_OUT_DIR: &str = "out";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "leo", version, about = "Maritime LEO demand and revenue estimator")]
pub struct Cli {
    /// Scenario config (JSON). Falls back to `LEO_CONFIG`, then built-in defaults.
    #[arg(long, global = true, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Debug-level logging (overridden by `LEO_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stage 1: estimate unique ships per year from a transit series.
    Ships(ShipsArgs),
    /// Stage 2: allocate unique ships to vessel types and apply adoption ranges.
    Demand(DemandArgs),
    /// Stage 3: project monthly recurring revenue from LEO-capable ships.
    Revenue(RevenueArgs),
    /// Project LEO-equipped transits for the target year.
    Transits(TransitsArgs),
    /// Run stages 1 to 3 in order (plus the transit projection when per-type
    /// transits are given).
    Run(RunArgs),
    /// Write the built-in scenario as pretty JSON.
    InitConfig(InitConfigArgs),
}

/// Output location shared by every stage.
#[derive(Debug, Args, Clone)]
pub struct OutArgs {
    /// Directory for `<stage>.csv` and `<stage>.txt`.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUT_DIR)]
    pub out_dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ShipsArgs {
    /// Yearly transit series (`Year` plus the configured transit column).
    #[arg(long, value_name = "CSV")]
    pub transits: PathBuf,

    #[command(flatten)]
    pub out: OutArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DemandArgs {
    /// Per-type transits (`Year`, `Total_Transits`, one column per type).
    #[arg(long, value_name = "CSV")]
    pub vessel_types: Option<PathBuf>,

    /// Stage 1 output. Defaults to `<out-dir>/unique_estimates.csv`.
    #[arg(long, value_name = "CSV")]
    pub unique: Option<PathBuf>,

    #[command(flatten)]
    pub out: OutArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RevenueArgs {
    /// Stage 2 output. Defaults to `<out-dir>/demand_estimate.csv`.
    #[arg(long, value_name = "CSV")]
    pub demand: Option<PathBuf>,

    #[command(flatten)]
    pub out: OutArgs,
}

#[derive(Debug, Args, Clone)]
pub struct TransitsArgs {
    /// Per-type transits (`Year`, `Total_Transits`, one column per type).
    /// Not needed when the scenario sets `demand.manual_transit_counts`.
    #[arg(long, value_name = "CSV")]
    pub vessel_types: Option<PathBuf>,

    #[command(flatten)]
    pub out: OutArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Yearly transit series for Stage 1.
    #[arg(long, value_name = "CSV")]
    pub transits: PathBuf,

    /// Per-type transits for Stage 2 shares and the transit projection.
    /// Not needed with manual shares or manual unique ships.
    #[arg(long, value_name = "CSV")]
    pub vessel_types: Option<PathBuf>,

    #[command(flatten)]
    pub out: OutArgs,
}

#[derive(Debug, Args, Clone)]
pub struct InitConfigArgs {
    /// Where to write the scenario JSON.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}
