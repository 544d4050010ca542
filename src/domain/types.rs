//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built from CSV inputs and the scenario config
//! - passed between the estimation stages in-memory
//! - rendered to CSV/text by `report` and `io::export`

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Vessel-type categories used by every per-type table.
///
/// The set is closed: config tables and CSV columns are validated against
/// [`VesselType::ALL`] at load time. The serialized name doubles as the CSV
/// column name and the config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VesselType {
    #[serde(rename = "Container")]
    Container,
    #[serde(rename = "Bulk_Carrier")]
    BulkCarrier,
    #[serde(rename = "Tanker_Total")]
    TankerTotal,
    #[serde(rename = "RoRo_Vehicle")]
    RoRoVehicle,
    #[serde(rename = "Passenger_Cruise")]
    PassengerCruise,
    #[serde(rename = "General_Cargo")]
    GeneralCargo,
    #[serde(rename = "Livestock")]
    Livestock,
    #[serde(rename = "Reefer")]
    Reefer,
}

impl VesselType {
    pub const ALL: [VesselType; 8] = [
        VesselType::Container,
        VesselType::BulkCarrier,
        VesselType::TankerTotal,
        VesselType::RoRoVehicle,
        VesselType::PassengerCruise,
        VesselType::GeneralCargo,
        VesselType::Livestock,
        VesselType::Reefer,
    ];

    /// Column / config key name.
    pub fn column_name(self) -> &'static str {
        match self {
            VesselType::Container => "Container",
            VesselType::BulkCarrier => "Bulk_Carrier",
            VesselType::TankerTotal => "Tanker_Total",
            VesselType::RoRoVehicle => "RoRo_Vehicle",
            VesselType::PassengerCruise => "Passenger_Cruise",
            VesselType::GeneralCargo => "General_Cargo",
            VesselType::Livestock => "Livestock",
            VesselType::Reefer => "Reefer",
        }
    }
}

impl fmt::Display for VesselType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

impl FromStr for VesselType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        VesselType::ALL
            .into_iter()
            .find(|t| t.column_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown vessel type '{s}'"))
    }
}

/// A per-vessel-type table. Iteration order follows [`VesselType::ALL`].
pub type TypeTable<T> = BTreeMap<VesselType, T>;

/// A `(low, high)` pair.
///
/// Serialized as a two-element array so config files read like `[0.10, 0.20]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn scale(&self, factor: f64) -> Band {
        Band::new(self.low * factor, self.high * factor)
    }
}

impl From<(f64, f64)> for Band {
    fn from((low, high): (f64, f64)) -> Self {
        Band::new(low, high)
    }
}

impl From<Band> for (f64, f64) {
    fn from(band: Band) -> Self {
        (band.low, band.high)
    }
}

/// Yearly transit counts (Stage 1 input).
pub type TransitSeries = BTreeMap<i32, u64>;

/// Unique-ship estimate for one year (Stage 1 output).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniqueEstimate {
    pub year: i32,
    pub transits: u64,
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// Stage 1 result: the calibrated ratio plus one estimate per year.
#[derive(Debug, Clone)]
pub struct UniqueShipEstimates {
    pub anchor_year: i32,
    pub observed_unique: f64,
    /// Unique ships per transit, calibrated at the anchor year.
    pub ratio: f64,
    pub band: f64,
    pub years: Vec<UniqueEstimate>,
}

/// Unique-ship totals `(mid, low, high)` used as the allocation base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniqueTotals {
    pub mid: f64,
    pub low: f64,
    pub high: f64,
}

/// Per-type transit counts for one year (Stage 2 / transit projection input).
#[derive(Debug, Clone)]
pub struct TypeTransits {
    pub year: i32,
    pub total_transits: f64,
    pub counts: TypeTable<f64>,
}

impl TypeTransits {
    /// Counts given directly; the total is their sum.
    pub fn from_counts(year: i32, counts: TypeTable<f64>) -> Self {
        let total_transits = counts.values().sum();
        Self {
            year,
            total_transits,
            counts,
        }
    }

    pub fn type_sum(&self) -> f64 {
        self.counts.values().sum()
    }
}

/// Where a type's unique count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueSource {
    /// `mid × share`.
    Share,
    /// Share-derived, rescaled over the remainder left by overrides.
    Renormalized,
    /// Manual per-type override.
    Override,
    /// Taken as given from the manual unique-ship table.
    Manual,
}

impl UniqueSource {
    pub fn label(self) -> &'static str {
        match self {
            UniqueSource::Share => "share",
            UniqueSource::Renormalized => "renormalized",
            UniqueSource::Override => "override",
            UniqueSource::Manual => "manual",
        }
    }
}

/// One vessel type's allocation (Stage 2 output row).
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub vessel_type: VesselType,
    pub share: f64,
    pub unique: f64,
    pub unique_band: Band,
    pub adoption: Band,
    /// Addressable ("LEO-capable") ships.
    pub addressable: Band,
    pub source: UniqueSource,
}

/// Stage 2 result.
#[derive(Debug, Clone)]
pub struct DemandEstimate {
    pub label: String,
    pub target_year: i32,
    pub totals: UniqueTotals,
    pub rows: Vec<Allocation>,
}

impl DemandEstimate {
    pub fn addressable_total(&self) -> Band {
        self.rows.iter().fold(Band::default(), |acc, r| {
            Band::new(acc.low + r.addressable.low, acc.high + r.addressable.high)
        })
    }

    /// Addressable ships keyed by type (Stage 3 input).
    pub fn addressable(&self) -> TypeTable<Band> {
        self.rows.iter().map(|r| (r.vessel_type, r.addressable)).collect()
    }
}

/// Monthly data allowance of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CapRepr", into = "CapRepr")]
pub enum PlanCap {
    /// Cap in TB/month.
    Limited(f64),
    Unlimited,
}

impl PlanCap {
    pub fn label(&self) -> String {
        match self {
            PlanCap::Limited(tb) => format!("{tb}"),
            PlanCap::Unlimited => "unlimited".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CapRepr {
    Tb(f64),
    Word(String),
}

impl TryFrom<CapRepr> for PlanCap {
    type Error = String;

    fn try_from(value: CapRepr) -> Result<Self, Self::Error> {
        match value {
            CapRepr::Tb(tb) => Ok(PlanCap::Limited(tb)),
            CapRepr::Word(w) if w.trim().eq_ignore_ascii_case("unlimited") => Ok(PlanCap::Unlimited),
            CapRepr::Word(w) => Err(format!("plan cap must be a number of TB or \"unlimited\", got '{w}'")),
        }
    }
}

impl From<PlanCap> for CapRepr {
    fn from(cap: PlanCap) -> Self {
        match cap {
            PlanCap::Limited(tb) => CapRepr::Tb(tb),
            PlanCap::Unlimited => CapRepr::Word("unlimited".to_string()),
        }
    }
}

/// A pricing plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub cap_tb: PlanCap,
    /// Monthly fee per subscription (USD).
    pub fee: f64,
}

/// How many lines a ship with zero monthly usage buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroUsagePolicy {
    /// Every addressable ship holds at least one subscription.
    #[default]
    OneLine,
    /// No usage, no subscription.
    NoLine,
}

/// One vessel type's revenue (Stage 3 output row).
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueRow {
    pub vessel_type: VesselType,
    pub ships: Band,
    pub plan: String,
    pub cap: PlanCap,
    pub usage_tb: f64,
    pub subscriptions: u64,
    pub fee: f64,
    pub availability: f64,
    pub mrr: Band,
}

/// Stage 3 result.
#[derive(Debug, Clone)]
pub struct RevenueProjection {
    pub rows: Vec<RevenueRow>,
    pub total: Band,
}

/// One vessel type's LEO-equipped transit projection.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitProjectionRow {
    pub vessel_type: VesselType,
    pub count: f64,
    pub adoption: Band,
    pub equipped: Band,
}

/// LEO-equipped transit projection for one year.
#[derive(Debug, Clone)]
pub struct TransitProjection {
    pub year: i32,
    pub total_transits: f64,
    pub rows: Vec<TransitProjectionRow>,
    pub total: Band,
}

impl TransitProjection {
    /// Equipped transits as a percentage of all transits, `None` when the
    /// total is zero.
    pub fn share_pct(&self) -> Option<Band> {
        (self.total_transits > 0.0).then(|| self.total.scale(100.0 / self.total_transits))
    }
}
