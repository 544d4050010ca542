//! Demand allocator.
//!
//! Splits a year's unique-ship total across vessel types by their share of
//! transits, merges manual per-type overrides over that base, and applies the
//! per-type adoption range to get addressable ("LEO-capable") ships.

use tracing::{info, warn};

use crate::config::{BandPairing, DemandConfig, ShareSource};
use crate::domain::{Allocation, Band, DemandEstimate, TypeTable, TypeTransits, UniqueSource, UniqueTotals};
use crate::error::PipelineError;
use crate::estimate::{check_fraction, check_non_negative, ensure_same_types};

/// Shares must sum to 1 within this tolerance (or be all zero).
pub const SHARE_TOLERANCE: f64 = 1e-6;

/// Inputs of a single allocation.
#[derive(Debug, Clone, Copy)]
pub struct AllocationInput<'a> {
    pub totals: UniqueTotals,
    pub shares: &'a TypeTable<f64>,
    pub adoption: &'a TypeTable<Band>,
    pub overrides: &'a TypeTable<f64>,
    pub renormalize_overrides: bool,
    pub pairing: BandPairing,
}

/// Per-type fraction of the total count.
///
/// A zero total yields all-zero shares (no traffic, nothing to allocate).
pub fn shares_from_counts(counts: &TypeTable<f64>) -> TypeTable<f64> {
    let total: f64 = counts.values().sum();
    counts
        .iter()
        .map(|(t, c)| (*t, if total > 0.0 { c / total } else { 0.0 }))
        .collect()
}

/// Allocate unique ships to vessel types and apply adoption.
pub fn allocate(input: AllocationInput<'_>) -> Result<Vec<Allocation>, PipelineError> {
    validate(&input)?;

    let UniqueTotals { mid, low, high } = input.totals;

    // Base: every type derives from its share.
    let mut rows: Vec<Allocation> = input
        .shares
        .iter()
        .map(|(t, share)| Allocation {
            vessel_type: *t,
            share: *share,
            unique: mid * share,
            unique_band: Band::new(low * share, high * share),
            adoption: input.adoption[t],
            addressable: Band::default(),
            source: UniqueSource::Share,
        })
        .collect();

    // Overrides replace single types; everything else keeps its share.
    for row in rows.iter_mut() {
        if let Some(&count) = input.overrides.get(&row.vessel_type) {
            info!(
                vessel_type = %row.vessel_type,
                computed = row.unique,
                override_count = count,
                "manual unique-ship override applied"
            );
            row.unique = count;
            row.unique_band = Band::new(count, count);
            row.source = UniqueSource::Override;
        }
    }

    if input.renormalize_overrides && !input.overrides.is_empty() {
        renormalize(&mut rows, input.totals);
    }

    for row in rows.iter_mut() {
        row.addressable = match input.pairing {
            BandPairing::Mid => Band::new(row.unique * row.adoption.low, row.unique * row.adoption.high),
            BandPairing::Banded => Band::new(
                row.unique_band.low * row.adoption.low,
                row.unique_band.high * row.adoption.high,
            ),
        };
    }

    Ok(rows)
}

/// Run Stage 2 for one scenario.
///
/// `transits` is the target year's per-type transit row; it is required when
/// shares come from transits and ignored otherwise. `totals` are the unique
/// ships to allocate; `manual_uniques` derives them from its own counts.
pub fn estimate_demand(
    config: &DemandConfig,
    transits: Option<&TypeTransits>,
    totals: Option<UniqueTotals>,
) -> Result<DemandEstimate, PipelineError> {
    let (shares, mut label) = match config.share_source {
        ShareSource::Transits => {
            let transits = transits.ok_or_else(|| {
                PipelineError::configuration("share_source \"transits\" needs the per-type transit table")
            })?;
            if transits.year != config.target_year {
                return Err(PipelineError::configuration(format!(
                    "per-type transits are for {}, scenario targets {}",
                    transits.year, config.target_year
                )));
            }
            (shares_from_counts(&transits.counts), format!("auto_{}", config.target_year))
        }
        ShareSource::ManualUniques => return estimate_manual_uniques(config),
        ShareSource::ManualTotals => {
            let totals = config.manual_totals.as_ref().ok_or_else(|| {
                PipelineError::configuration("share_source \"manual_totals\" needs demand.manual_totals")
            })?;
            (shares_from_counts(totals), "manual_totals".to_string())
        }
    };
    if !config.unique_overrides.is_empty() {
        label.push_str("+overrides");
    }
    let totals = totals.ok_or_else(|| {
        PipelineError::configuration(format!(
            "no unique-ship totals for {} (Stage 1 output or demand.unique_total_override)",
            config.target_year
        ))
    })?;

    let rows = allocate(AllocationInput {
        totals,
        shares: &shares,
        adoption: &config.adoption,
        overrides: &config.unique_overrides,
        renormalize_overrides: config.renormalize_overrides,
        pairing: config.pairing,
    })?;

    Ok(DemandEstimate {
        label,
        target_year: config.target_year,
        totals,
        rows,
    })
}

/// Per-type unique counts taken as given: zero-width unique bands, shares
/// for reporting only, no Stage 1 lookup.
fn estimate_manual_uniques(config: &DemandConfig) -> Result<DemandEstimate, PipelineError> {
    let manual = config.manual_uniques.as_ref().ok_or_else(|| {
        PipelineError::configuration("share_source \"manual_uniques\" needs demand.manual_uniques")
    })?;
    if config.unique_total_override.is_some() {
        info!("demand.unique_total_override is ignored; totals derive from demand.manual_uniques");
    }

    // Overrides still win over the manual table for the types they name.
    let mut counts = manual.clone();
    counts.extend(config.unique_overrides.iter().map(|(t, v)| (*t, *v)));
    let sum: f64 = counts.values().sum();
    let totals = UniqueTotals {
        mid: sum,
        low: sum,
        high: sum,
    };

    let mut rows = allocate(AllocationInput {
        totals,
        shares: &shares_from_counts(&counts),
        adoption: &config.adoption,
        overrides: &counts,
        renormalize_overrides: false,
        pairing: config.pairing,
    })?;
    for row in rows.iter_mut().filter(|r| !config.unique_overrides.contains_key(&r.vessel_type)) {
        row.source = UniqueSource::Manual;
    }

    let mut label = "manual_uniques".to_string();
    if !config.unique_overrides.is_empty() {
        label.push_str("+overrides");
    }
    Ok(DemandEstimate {
        label,
        target_year: config.target_year,
        totals,
        rows,
    })
}

fn validate(input: &AllocationInput<'_>) -> Result<(), PipelineError> {
    ensure_same_types("type shares", input.shares, "adoption ranges", input.adoption)?;

    let stray: Vec<&str> = input
        .overrides
        .keys()
        .filter(|t| !input.shares.contains_key(t))
        .map(|t| t.column_name())
        .collect();
    if !stray.is_empty() {
        return Err(PipelineError::schema(format!(
            "unique overrides name vessel types absent from the share table: {}",
            stray.join(", ")
        )));
    }

    let UniqueTotals { mid, low, high } = input.totals;
    for (name, v) in [("low", low), ("mid", mid), ("high", high)] {
        if !v.is_finite() || v < 0.0 {
            return Err(PipelineError::invalid_input(format!(
                "unique-ship {name} total must be finite and >= 0, got {v}"
            )));
        }
    }
    if !(low <= mid && mid <= high) {
        return Err(PipelineError::invalid_input(format!(
            "unique-ship totals must satisfy low <= mid <= high, got {low} / {mid} / {high}"
        )));
    }

    for (t, share) in input.shares {
        check_fraction("type share", *t, *share)?;
    }
    let share_sum: f64 = input.shares.values().sum();
    if share_sum != 0.0 && (share_sum - 1.0).abs() > SHARE_TOLERANCE {
        return Err(PipelineError::invalid_input(format!(
            "type shares sum to {share_sum}, expected 1 within {SHARE_TOLERANCE}"
        )));
    }

    for (t, range) in input.adoption {
        check_fraction("adoption low", *t, range.low)?;
        check_fraction("adoption high", *t, range.high)?;
        if range.low > range.high {
            return Err(PipelineError::invalid_input(format!(
                "adoption range for {t} is inverted: {} > {}",
                range.low, range.high
            )));
        }
    }

    for (t, count) in input.overrides {
        check_non_negative("unique override", *t, *count)?;
    }
    Ok(())
}

/// Spread what the overrides leave of the mid total over the other types,
/// in proportion to their shares.
fn renormalize(rows: &mut [Allocation], totals: UniqueTotals) {
    let overridden: f64 = rows
        .iter()
        .filter(|r| r.source == UniqueSource::Override)
        .map(|r| r.unique)
        .sum();
    let remaining_share: f64 = rows
        .iter()
        .filter(|r| r.source != UniqueSource::Override)
        .map(|r| r.share)
        .sum();

    let remainder = totals.mid - overridden;
    if remainder < 0.0 {
        warn!(
            overridden,
            mid = totals.mid,
            "overrides exceed the unique-ship total; other types renormalize to zero"
        );
    }
    let remainder = remainder.max(0.0);

    // Rescale relative to the share-derived mid so the low/high band keeps its shape.
    let k = if remaining_share > 0.0 && totals.mid > 0.0 {
        remainder / (totals.mid * remaining_share)
    } else {
        0.0
    };

    for row in rows.iter_mut().filter(|r| r.source != UniqueSource::Override) {
        row.unique *= k;
        row.unique_band = row.unique_band.scale(k);
        row.source = UniqueSource::Renormalized;
    }
    info!(remainder, factor = k, "renormalized non-overridden types");
}
