//! Scenario configuration: the static per-stage tables.
//!
//! A scenario is a JSON document with one section per stage. Every section
//! falls back to the built-in defaults when omitted, so a file only needs to
//! carry what differs from the reference Bosphorus scenario.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Band, Plan, PlanCap, TypeTable, UniqueTotals, VesselType, ZeroUsagePolicy};
use crate::error::PipelineError;

/// Full scenario: one section per stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    pub ships: ShipsConfig,
    pub demand: DemandConfig,
    pub revenue: RevenueConfig,
}

/// Stage 1: anchor calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShipsConfig {
    /// Year with an observed unique-ship count.
    pub anchor_year: i32,
    /// Observed unique ships in the anchor year.
    pub observed_unique: f64,
    /// Band half-width δ applied to the repeat factor, `0 ≤ δ < 1`.
    pub band: f64,
    /// Transit-count column of the input series.
    pub transit_column: String,
}

impl Default for ShipsConfig {
    fn default() -> Self {
        Self {
            anchor_year: 2021,
            observed_unique: 6071.0,
            band: 0.15,
            transit_column: "Istanbul_Strait_Total_Transits".to_string(),
        }
    }
}

/// Where Stage 2 takes the type shares from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSource {
    /// Per-type transit counts of the target year.
    #[default]
    Transits,
    /// The `manual_totals` table.
    ManualTotals,
    /// The `manual_uniques` table, taken as per-type unique ships. Needs
    /// neither per-type transits nor Stage 1 totals.
    ManualUniques,
}

/// Which unique-ship bound feeds each side of the addressable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandPairing {
    /// Both sides use the mid estimate; only adoption varies.
    #[default]
    Mid,
    /// Low adoption on low uniques, high adoption on high uniques.
    Banded,
}

/// Stage 2: allocation and adoption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemandConfig {
    pub target_year: i32,
    /// Adoption range per type, `[low, high]`.
    pub adoption: TypeTable<Band>,
    pub share_source: ShareSource,
    /// Per-type transit totals for `share_source = "manual_totals"`.
    pub manual_totals: Option<TypeTable<f64>>,
    /// Per-type unique ships for `share_source = "manual_uniques"`.
    pub manual_uniques: Option<TypeTable<f64>>,
    /// Per-type transits for the LEO-equipped transit projection, used
    /// instead of the vessel-type CSV when set.
    pub manual_transit_counts: Option<TypeTable<f64>>,
    /// Replaces the Stage 1 lookup for the target year.
    pub unique_total_override: Option<UniqueTotals>,
    /// Per-type unique counts that replace the share-derived value.
    pub unique_overrides: TypeTable<f64>,
    /// Rescale non-overridden types over what the overrides leave.
    pub renormalize_overrides: bool,
    pub pairing: BandPairing,
}

impl Default for DemandConfig {
    fn default() -> Self {
        let adoption = [
            (VesselType::Container, (0.10, 0.20)),
            (VesselType::BulkCarrier, (0.03, 0.07)),
            (VesselType::TankerTotal, (0.10, 0.20)),
            (VesselType::RoRoVehicle, (0.02, 0.05)),
            (VesselType::PassengerCruise, (0.60, 0.90)),
            (VesselType::GeneralCargo, (0.01, 0.03)),
            (VesselType::Livestock, (0.00, 0.02)),
            (VesselType::Reefer, (0.00, 0.03)),
        ]
        .into_iter()
        .map(|(t, range)| (t, Band::from(range)))
        .collect();

        Self {
            target_year: 2024,
            adoption,
            share_source: ShareSource::Transits,
            manual_totals: None,
            manual_uniques: None,
            manual_transit_counts: None,
            unique_total_override: None,
            unique_overrides: TypeTable::new(),
            renormalize_overrides: false,
            pairing: BandPairing::Mid,
        }
    }
}

/// Stage 3: plans and usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RevenueConfig {
    pub plans: BTreeMap<String, Plan>,
    /// Plan name per type.
    pub assignment: TypeTable<String>,
    /// Average monthly data use per ship (TB).
    pub usage_tb: TypeTable<f64>,
    /// Availability multiplier per type; absent types use 1.0.
    pub availability: TypeTable<f64>,
    pub zero_usage: ZeroUsagePolicy,
}

impl Default for RevenueConfig {
    fn default() -> Self {
        let plans = [
            ("GP_50", PlanCap::Limited(0.05), 250.0),
            ("GP_500", PlanCap::Limited(0.50), 650.0),
            ("GP_1TB", PlanCap::Limited(1.00), 1150.0),
            ("GP_2TB", PlanCap::Limited(2.00), 2150.0),
            ("IMO_UNL", PlanCap::Unlimited, 2500.0),
        ]
        .into_iter()
        .map(|(name, cap_tb, fee)| (name.to_string(), Plan { cap_tb, fee }))
        .collect();

        let assignment = [
            (VesselType::Container, "IMO_UNL"),
            (VesselType::BulkCarrier, "GP_1TB"),
            (VesselType::TankerTotal, "IMO_UNL"),
            (VesselType::RoRoVehicle, "GP_1TB"),
            (VesselType::PassengerCruise, "GP_2TB"),
            (VesselType::GeneralCargo, "GP_500"),
            (VesselType::Livestock, "GP_500"),
            (VesselType::Reefer, "GP_500"),
        ]
        .into_iter()
        .map(|(t, plan)| (t, plan.to_string()))
        .collect();

        let usage_tb = [
            (VesselType::Container, 1.5),
            (VesselType::BulkCarrier, 0.3),
            (VesselType::TankerTotal, 1.0),
            (VesselType::RoRoVehicle, 0.3),
            (VesselType::PassengerCruise, 15.0),
            (VesselType::GeneralCargo, 0.08),
            (VesselType::Livestock, 0.15),
            (VesselType::Reefer, 0.3),
        ]
        .into_iter()
        .collect();

        Self {
            plans,
            assignment,
            usage_tb,
            availability: TypeTable::new(),
            zero_usage: ZeroUsagePolicy::OneLine,
        }
    }
}

impl ScenarioConfig {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)
            .map_err(|e| PipelineError::io(format!("Failed to open config '{}': {e}", path.display())))?;
        let config: ScenarioConfig = serde_json::from_reader(file)
            .map_err(|e| PipelineError::schema(format!("Invalid config '{}': {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the scenario as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let file = File::create(path)
            .map_err(|e| PipelineError::io(format!("Failed to create config '{}': {e}", path.display())))?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PipelineError::io(format!("Failed to write config '{}': {e}", path.display())))
    }

    /// Check table completeness and value domains that do not depend on
    /// input data. Plan pricing is checked by the revenue stage itself.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.ships.validate()?;
        self.demand.validate()?;
        self.revenue.validate()
    }
}

impl ShipsConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.observed_unique.is_finite() || self.observed_unique < 0.0 {
            return Err(PipelineError::invalid_input(format!(
                "ships.observed_unique must be finite and >= 0, got {}",
                self.observed_unique
            )));
        }
        if !(self.band.is_finite() && (0.0..1.0).contains(&self.band)) {
            return Err(PipelineError::invalid_input(format!(
                "ships.band must be in [0, 1), got {}",
                self.band
            )));
        }
        if self.transit_column.trim().is_empty() {
            return Err(PipelineError::configuration("ships.transit_column is empty"));
        }
        Ok(())
    }
}

impl DemandConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        ensure_complete("demand.adoption", &self.adoption)?;
        for (t, range) in &self.adoption {
            check_fraction(&format!("demand.adoption.{t} low"), range.low)?;
            check_fraction(&format!("demand.adoption.{t} high"), range.high)?;
            if range.low > range.high {
                return Err(PipelineError::invalid_input(format!(
                    "demand.adoption.{t}: low {} exceeds high {}",
                    range.low, range.high
                )));
            }
        }

        match self.share_source {
            ShareSource::ManualTotals if self.manual_totals.is_none() => {
                return Err(PipelineError::configuration(
                    "demand.share_source is \"manual_totals\" but demand.manual_totals is not set",
                ));
            }
            ShareSource::ManualUniques if self.manual_uniques.is_none() => {
                return Err(PipelineError::configuration(
                    "demand.share_source is \"manual_uniques\" but demand.manual_uniques is not set",
                ));
            }
            _ => {}
        }
        for (name, table) in [
            ("demand.manual_totals", &self.manual_totals),
            ("demand.manual_uniques", &self.manual_uniques),
            ("demand.manual_transit_counts", &self.manual_transit_counts),
        ] {
            if let Some(table) = table {
                ensure_complete(name, table)?;
                for (t, v) in table {
                    check_count(&format!("{name}.{t}"), *v)?;
                }
            }
        }

        for (t, v) in &self.unique_overrides {
            check_count(&format!("demand.unique_overrides.{t}"), *v)?;
        }

        if let Some(totals) = &self.unique_total_override {
            check_count("demand.unique_total_override.low", totals.low)?;
            check_count("demand.unique_total_override.mid", totals.mid)?;
            check_count("demand.unique_total_override.high", totals.high)?;
            if !(totals.low <= totals.mid && totals.mid <= totals.high) {
                return Err(PipelineError::invalid_input(
                    "demand.unique_total_override must satisfy low <= mid <= high",
                ));
            }
        }
        Ok(())
    }
}

impl RevenueConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        ensure_complete("revenue.assignment", &self.assignment)?;
        ensure_complete("revenue.usage_tb", &self.usage_tb)?;
        Ok(())
    }

    /// Availability for a type (1.0 when not configured).
    pub fn availability_for(&self, t: VesselType) -> f64 {
        self.availability.get(&t).copied().unwrap_or(1.0)
    }
}

/// Every vessel type must have an entry in `table`.
pub fn ensure_complete<T>(name: &str, table: &TypeTable<T>) -> Result<(), PipelineError> {
    let missing: Vec<&str> = VesselType::ALL
        .iter()
        .filter(|t| !table.contains_key(t))
        .map(|t| t.column_name())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::configuration(format!(
            "{name} is missing vessel types: {}",
            missing.join(", ")
        )))
    }
}

fn check_fraction(name: &str, v: f64) -> Result<(), PipelineError> {
    if v.is_finite() && (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(format!("{name} must be in [0, 1], got {v}")))
    }
}

fn check_count(name: &str, v: f64) -> Result<(), PipelineError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(PipelineError::invalid_input(format!("{name} must be finite and >= 0, got {v}")))
    }
}
