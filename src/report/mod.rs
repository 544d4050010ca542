//! Reporting: rounded output tables and formatted text summaries.
//!
//! Every stage output is rounded once, here, into a table. Both the CSV export
//! and the text summary render from that table with the same precision, so
//! the two forms always show identical numbers.

use crate::domain::{
    Allocation, Band, DemandEstimate, RevenueProjection, RevenueRow, TransitProjection, TransitProjectionRow,
    UniqueShipEstimates, UniqueTotals,
};

pub mod format;

pub use format::*;

/// Decimal places for ship counts (unique and addressable).
pub const SHIP_DECIMALS: usize = 2;
/// Decimal places for type shares.
pub const SHARE_DECIMALS: usize = 6;
/// Decimal places for currency.
pub const MONEY_DECIMALS: usize = 2;
/// Decimal places for percentages and fractions shown as inputs.
pub const PCT_DECIMALS: usize = 1;
/// Decimal places for adoption fractions (the same digits as a 1 dp percent).
pub const ADOPTION_DECIMALS: usize = PCT_DECIMALS + 2;
/// Decimal places for per-ship usage (TB/month) and availability.
pub const USAGE_DECIMALS: usize = 2;
/// Decimal places for transit counts.
pub const COUNT_DECIMALS: usize = 0;

/// Round half away from zero to `decimals` places.
pub fn round_to(v: f64, decimals: usize) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (v * scale).round() / scale
}

/// Fixed-precision rendering shared by CSV and text output.
pub fn fmt_fixed(v: f64, decimals: usize) -> String {
    format!("{v:.decimals$}")
}

fn round_band(b: Band, decimals: usize) -> Band {
    Band::new(round_to(b.low, decimals), round_to(b.high, decimals))
}

fn sum_bands<'a>(bands: impl Iterator<Item = &'a Band>, decimals: usize) -> Band {
    let sum = bands.fold(Band::default(), |acc, b| Band::new(acc.low + b.low, acc.high + b.high));
    round_band(sum, decimals)
}

/// Stage 1 table (whole ships).
#[derive(Debug, Clone)]
pub struct UniqueTable {
    pub anchor_year: i32,
    pub anchor_transits: Option<u64>,
    pub observed_unique: f64,
    pub ratio: f64,
    pub band: f64,
    pub transit_column: String,
    pub rows: Vec<UniqueTableRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueTableRow {
    pub year: i32,
    pub transits: u64,
    pub low: u64,
    pub mid: u64,
    pub high: u64,
}

pub fn unique_table(estimates: &UniqueShipEstimates, transit_column: &str) -> UniqueTable {
    let rows = estimates
        .years
        .iter()
        .map(|e| UniqueTableRow {
            year: e.year,
            transits: e.transits,
            low: e.low.round() as u64,
            mid: e.mid.round() as u64,
            high: e.high.round() as u64,
        })
        .collect();

    UniqueTable {
        anchor_year: estimates.anchor_year,
        anchor_transits: estimates.year(estimates.anchor_year).map(|e| e.transits),
        observed_unique: estimates.observed_unique,
        ratio: estimates.ratio,
        band: estimates.band,
        transit_column: transit_column.to_string(),
        rows,
    }
}

/// Stage 2 table.
#[derive(Debug, Clone)]
pub struct DemandTable {
    pub label: String,
    pub target_year: i32,
    /// Unique-ship totals the allocation started from.
    pub input_totals: UniqueTotals,
    pub rows: Vec<Allocation>,
    pub total: DemandTotals,
}

/// Column sums of the rounded Stage 2 rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandTotals {
    pub share: f64,
    pub unique: f64,
    pub unique_band: Band,
    pub addressable: Band,
}

pub fn demand_table(demand: &DemandEstimate) -> DemandTable {
    let rows: Vec<Allocation> = demand
        .rows
        .iter()
        .map(|r| Allocation {
            share: round_to(r.share, SHARE_DECIMALS),
            unique: round_to(r.unique, SHIP_DECIMALS),
            unique_band: round_band(r.unique_band, SHIP_DECIMALS),
            addressable: round_band(r.addressable, SHIP_DECIMALS),
            ..r.clone()
        })
        .collect();

    let total = DemandTotals {
        share: round_to(rows.iter().map(|r| r.share).sum(), SHARE_DECIMALS),
        unique: round_to(rows.iter().map(|r| r.unique).sum(), SHIP_DECIMALS),
        unique_band: sum_bands(rows.iter().map(|r| &r.unique_band), SHIP_DECIMALS),
        addressable: sum_bands(rows.iter().map(|r| &r.addressable), SHIP_DECIMALS),
    };

    DemandTable {
        label: demand.label.clone(),
        target_year: demand.target_year,
        input_totals: UniqueTotals {
            mid: round_to(demand.totals.mid, SHIP_DECIMALS),
            low: round_to(demand.totals.low, SHIP_DECIMALS),
            high: round_to(demand.totals.high, SHIP_DECIMALS),
        },
        rows,
        total,
    }
}

/// Stage 3 table.
#[derive(Debug, Clone)]
pub struct RevenueTable {
    pub rows: Vec<RevenueRow>,
    pub total_ships: Band,
    pub total: Band,
}

pub fn revenue_table(projection: &RevenueProjection) -> RevenueTable {
    let rows: Vec<RevenueRow> = projection
        .rows
        .iter()
        .map(|r| RevenueRow {
            ships: round_band(r.ships, SHIP_DECIMALS),
            mrr: round_band(r.mrr, MONEY_DECIMALS),
            ..r.clone()
        })
        .collect();

    RevenueTable {
        total_ships: sum_bands(rows.iter().map(|r| &r.ships), SHIP_DECIMALS),
        total: sum_bands(rows.iter().map(|r| &r.mrr), MONEY_DECIMALS),
        rows,
    }
}

/// LEO-equipped transit table.
#[derive(Debug, Clone)]
pub struct TransitTable {
    pub year: i32,
    pub total_transits: f64,
    pub rows: Vec<TransitProjectionRow>,
    pub total: Band,
    /// Share of all transits, in percent.
    pub share_pct: Option<Band>,
}

pub fn transit_table(projection: &TransitProjection) -> TransitTable {
    let rows: Vec<TransitProjectionRow> = projection
        .rows
        .iter()
        .map(|r| TransitProjectionRow {
            equipped: round_band(r.equipped, SHIP_DECIMALS),
            ..r.clone()
        })
        .collect();
    let total = sum_bands(rows.iter().map(|r| &r.equipped), SHIP_DECIMALS);
    let share_pct = (projection.total_transits > 0.0).then(|| {
        round_band(total.scale(100.0 / projection.total_transits), PCT_DECIMALS)
    });

    TransitTable {
        year: projection.year,
        total_transits: projection.total_transits,
        rows,
        total,
        share_pct,
    }
}
