//! Scenario configuration.
//!
//! - per-stage tables and their defaults (`scenario`)
//! - resolution of which scenario file a run uses

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineError;

pub mod scenario;

pub use scenario::*;

/// Environment variable naming the scenario file (also read from `.env`).
pub const CONFIG_ENV: &str = "LEO_CONFIG";

/// Load the scenario for this run.
///
/// Precedence: explicit `--config` path, then `LEO_CONFIG`, then the built-in
/// defaults.
pub fn resolve(explicit: Option<&Path>) -> Result<ScenarioConfig, PipelineError> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => {
            let config = ScenarioConfig::load(&path)?;
            info!(path = %path.display(), "loaded scenario config");
            Ok(config)
        }
        None => {
            info!("no scenario config given; using built-in defaults");
            Ok(ScenarioConfig::default())
        }
    }
}
