//! Estimation stages.
//!
//! Each stage is a single-pass, stateless transform over small in-memory tables:
//!
//! - `unique`: transit counts → unique-ship low/mid/high (anchored ratio)
//! - `demand`: unique ships → per-type addressable ships (shares × adoption)
//! - `revenue`: addressable ships → per-type and total MRR (plans × usage)
//! - `transits`: per-type transits → LEO-equipped transits (adoption only)
//!
//! Every stage validates all of its inputs before computing any row.

use crate::domain::{TypeTable, VesselType};
use crate::error::PipelineError;

pub mod demand;
pub mod revenue;
pub mod transits;
pub mod unique;

pub use demand::{allocate, estimate_demand, shares_from_counts, AllocationInput};
pub use revenue::{project_revenue, subscriptions_per_ship};
pub use transits::project_transits;
pub use unique::estimate_unique_ships;

/// Two per-type tables that must cover exactly the same vessel types.
pub(crate) fn ensure_same_types<A, B>(
    left_name: &str,
    left: &TypeTable<A>,
    right_name: &str,
    right: &TypeTable<B>,
) -> Result<(), PipelineError> {
    let only_left: Vec<&str> = left
        .keys()
        .filter(|t| !right.contains_key(t))
        .map(|t| t.column_name())
        .collect();
    let only_right: Vec<&str> = right
        .keys()
        .filter(|t| !left.contains_key(t))
        .map(|t| t.column_name())
        .collect();

    if only_left.is_empty() && only_right.is_empty() {
        return Ok(());
    }

    let mut parts = Vec::new();
    if !only_left.is_empty() {
        parts.push(format!("missing from {right_name}: {}", only_left.join(", ")));
    }
    if !only_right.is_empty() {
        parts.push(format!("missing from {left_name}: {}", only_right.join(", ")));
    }
    Err(PipelineError::schema(format!(
        "{left_name} and {right_name} cover different vessel types ({})",
        parts.join("; ")
    )))
}

/// A fraction in `[0, 1]`.
pub(crate) fn check_fraction(what: &str, t: VesselType, v: f64) -> Result<(), PipelineError> {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(format!("{what} for {t} must be in [0, 1], got {v}")))
    }
}

/// A finite, non-negative quantity.
pub(crate) fn check_non_negative(what: &str, t: VesselType, v: f64) -> Result<(), PipelineError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(format!("{what} for {t} must be finite and >= 0, got {v}")))
    }
}
