//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - resolves the scenario config
//! - runs the requested stage(s) and prints their summaries

use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command, InitConfigArgs};
use crate::config::{ScenarioConfig, resolve};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable holding the log filter (`tracing` directives).
pub const LOG_ENV: &str = "LEO_LOG";

/// Entry point for the `leo` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Command::InitConfig(args) = &cli.command {
        return handle_init_config(args);
    }

    let config = resolve(cli.config.as_deref())?;
    let generated = Local::now();

    let outputs = match cli.command {
        Command::Ships(args) => vec![pipeline::run_ships(&config.ships, &args.transits, &args.out.out_dir, generated)?],
        Command::Demand(args) => {
            let unique = args
                .unique
                .unwrap_or_else(|| pipeline::stage_paths(&args.out.out_dir, pipeline::UNIQUE_STEM).0);
            vec![pipeline::run_demand(
                &config.demand,
                args.vessel_types.as_deref(),
                &unique,
                &args.out.out_dir,
                generated,
            )?]
        }
        Command::Revenue(args) => {
            let demand = args
                .demand
                .unwrap_or_else(|| pipeline::stage_paths(&args.out.out_dir, pipeline::DEMAND_STEM).0);
            vec![pipeline::run_revenue(&config.revenue, &demand, &args.out.out_dir, generated)?]
        }
        Command::Transits(args) => {
            vec![pipeline::run_transits(&config.demand, args.vessel_types.as_deref(), &args.out.out_dir, generated)?]
        }
        Command::Run(args) => pipeline::run_all(
            &config,
            &args.transits,
            args.vessel_types.as_deref(),
            &args.out.out_dir,
            generated,
        )?,
        Command::InitConfig(_) => Vec::new(),
    };

    for output in outputs {
        println!("{}", output.summary);
    }
    Ok(())
}

fn handle_init_config(args: &InitConfigArgs) -> Result<(), AppError> {
    ScenarioConfig::default().save(&args.path)?;
    info!(path = %args.path.display(), "wrote default scenario config");
    Ok(())
}

/// Log to stderr so stdout carries only the summaries.
///
/// `LEO_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| default.to_string());

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
