//! Revenue projector.
//!
//! Each vessel type is assigned one plan. A ship needs as many subscriptions
//! as it takes to cover its monthly usage under the plan cap:
//!
//! ```text
//! subs = 1                     (unlimited plan)
//! subs = ceil(usage / cap)     (capped plan, true ceiling)
//! mrr  = ships × subs × fee × availability
//! ```

use crate::config::RevenueConfig;
use crate::domain::{Band, Plan, PlanCap, RevenueProjection, RevenueRow, TypeTable, VesselType, ZeroUsagePolicy};
use crate::error::PipelineError;
use crate::estimate::{check_fraction, check_non_negative};

/// Quotients within this many ULPs of a positive integer count as that integer.
const CEIL_TOLERANCE_ULPS: f64 = 4.0;

/// Subscriptions one ship needs.
///
/// Usage that is an exact multiple of the cap does not round up, even when
/// the division lands a few ULPs above the integer.
pub fn subscriptions_per_ship(usage_tb: f64, cap: PlanCap, zero_usage: ZeroUsagePolicy) -> Result<u64, PipelineError> {
    if !usage_tb.is_finite() || usage_tb < 0.0 {
        return Err(PipelineError::invalid_input(format!(
            "monthly usage must be finite and >= 0, got {usage_tb}"
        )));
    }
    let cap_tb = match cap {
        PlanCap::Unlimited => None,
        PlanCap::Limited(tb) => {
            check_cap(tb)?;
            Some(tb)
        }
    };

    if usage_tb == 0.0 {
        return Ok(match zero_usage {
            ZeroUsagePolicy::OneLine => 1,
            ZeroUsagePolicy::NoLine => 0,
        });
    }

    let Some(cap_tb) = cap_tb else {
        return Ok(1);
    };

    let quotient = usage_tb / cap_tb;
    let nearest = quotient.round();
    let tolerance = CEIL_TOLERANCE_ULPS * f64::EPSILON * nearest.max(1.0);
    let subs = if nearest >= 1.0 && (quotient - nearest).abs() <= tolerance {
        nearest
    } else {
        quotient.ceil()
    };
    Ok(subs as u64)
}

/// Project monthly revenue for every type in `addressable`.
///
/// All types, plans and values are validated before any row is computed.
pub fn project_revenue(addressable: &TypeTable<Band>, config: &RevenueConfig) -> Result<RevenueProjection, PipelineError> {
    for (name, plan) in &config.plans {
        check_plan(name, plan)?;
    }

    struct Resolved<'a> {
        vessel_type: VesselType,
        ships: Band,
        plan_name: &'a str,
        plan: Plan,
        usage_tb: f64,
        availability: f64,
    }

    let mut resolved = Vec::with_capacity(addressable.len());
    for (t, ships) in addressable {
        let plan_name = config.assignment.get(t).ok_or_else(|| {
            PipelineError::configuration(format!("no plan assigned to vessel type {t}"))
        })?;
        let plan = *config.plans.get(plan_name).ok_or_else(|| {
            PipelineError::configuration(format!("plan '{plan_name}' (assigned to {t}) is not in the plan catalog"))
        })?;
        let usage_tb = *config.usage_tb.get(t).ok_or_else(|| {
            PipelineError::configuration(format!("no monthly usage configured for vessel type {t}"))
        })?;
        check_non_negative("monthly usage", *t, usage_tb)?;
        let availability = config.availability_for(*t);
        check_fraction("availability", *t, availability)?;
        check_non_negative("addressable ships (low)", *t, ships.low)?;
        check_non_negative("addressable ships (high)", *t, ships.high)?;
        if ships.low > ships.high {
            return Err(PipelineError::invalid_input(format!(
                "addressable ships for {t} are inverted: {} > {}",
                ships.low, ships.high
            )));
        }

        resolved.push(Resolved {
            vessel_type: *t,
            ships: *ships,
            plan_name,
            plan,
            usage_tb,
            availability,
        });
    }

    let mut rows = Vec::with_capacity(resolved.len());
    let mut total = Band::default();
    for r in resolved {
        let subscriptions = subscriptions_per_ship(r.usage_tb, r.plan.cap_tb, config.zero_usage)?;
        let per_ship = subscriptions as f64 * r.plan.fee * r.availability;
        let mrr = Band::new(r.ships.low * per_ship, r.ships.high * per_ship);
        total = Band::new(total.low + mrr.low, total.high + mrr.high);

        rows.push(RevenueRow {
            vessel_type: r.vessel_type,
            ships: r.ships,
            plan: r.plan_name.to_string(),
            cap: r.plan.cap_tb,
            usage_tb: r.usage_tb,
            subscriptions,
            fee: r.plan.fee,
            availability: r.availability,
            mrr,
        });
    }

    Ok(RevenueProjection { rows, total })
}

fn check_cap(cap_tb: f64) -> Result<(), PipelineError> {
    if !cap_tb.is_finite() || cap_tb < 0.0 {
        return Err(PipelineError::invalid_input(format!(
            "plan cap must be finite and > 0 TB (or \"unlimited\"), got {cap_tb}"
        )));
    }
    if cap_tb == 0.0 {
        return Err(PipelineError::division("plan cap is 0 TB; cannot size subscriptions against it"));
    }
    Ok(())
}

fn check_plan(name: &str, plan: &Plan) -> Result<(), PipelineError> {
    if let PlanCap::Limited(tb) = plan.cap_tb {
        check_cap(tb).map_err(|e| match e {
            PipelineError::InvalidInput(m) => PipelineError::invalid_input(format!("plan '{name}': {m}")),
            PipelineError::Division(m) => PipelineError::division(format!("plan '{name}': {m}")),
            other => other,
        })?;
    }
    if !plan.fee.is_finite() || plan.fee <= 0.0 {
        return Err(PipelineError::invalid_input(format!(
            "plan '{name}': fee must be finite and > 0, got {}",
            plan.fee
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_type(t: VesselType, ships: Band) -> TypeTable<Band> {
        [(t, ships)].into_iter().collect()
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        let cap = PlanCap::Limited(1.0);
        assert_eq!(subscriptions_per_ship(1.0, cap, ZeroUsagePolicy::OneLine).unwrap(), 1);
        assert_eq!(subscriptions_per_ship(1.01, cap, ZeroUsagePolicy::OneLine).unwrap(), 2);
        assert_eq!(subscriptions_per_ship(3.0, cap, ZeroUsagePolicy::OneLine).unwrap(), 3);
        // 1.1 / 0.1 is 11.000000000000002 in binary floating point.
        assert_eq!(subscriptions_per_ship(1.1, PlanCap::Limited(0.1), ZeroUsagePolicy::OneLine).unwrap(), 11);
        assert_eq!(subscriptions_per_ship(15.0, PlanCap::Limited(2.0), ZeroUsagePolicy::OneLine).unwrap(), 8);
        assert_eq!(subscriptions_per_ship(0.3, PlanCap::Limited(1.0), ZeroUsagePolicy::OneLine).unwrap(), 1);
    }

    #[test]
    fn overage_beyond_rounding_noise_rounds_up() {
        let cap = PlanCap::Limited(1.0);
        assert_eq!(subscriptions_per_ship(1.0 + 1e-10, cap, ZeroUsagePolicy::OneLine).unwrap(), 2);
        assert_eq!(subscriptions_per_ship(2.0 + 1e-12, cap, ZeroUsagePolicy::OneLine).unwrap(), 3);
        // Tiny positive usage still buys a line.
        assert_eq!(subscriptions_per_ship(1e-20, cap, ZeroUsagePolicy::NoLine).unwrap(), 1);
    }

    #[test]
    fn zero_usage_follows_policy() {
        let cap = PlanCap::Limited(1.0);
        assert_eq!(subscriptions_per_ship(0.0, cap, ZeroUsagePolicy::OneLine).unwrap(), 1);
        assert_eq!(subscriptions_per_ship(0.0, cap, ZeroUsagePolicy::NoLine).unwrap(), 0);
        assert_eq!(subscriptions_per_ship(0.0, PlanCap::Unlimited, ZeroUsagePolicy::NoLine).unwrap(), 0);
    }

    #[test]
    fn unlimited_plan_is_always_one_subscription() {
        for usage in [0.01, 1.5, 10_000.0] {
            assert_eq!(subscriptions_per_ship(usage, PlanCap::Unlimited, ZeroUsagePolicy::OneLine).unwrap(), 1);
        }
    }

    #[test]
    fn bad_usage_and_caps_are_rejected() {
        assert!(matches!(
            subscriptions_per_ship(-0.1, PlanCap::Limited(1.0), ZeroUsagePolicy::OneLine),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            subscriptions_per_ship(f64::INFINITY, PlanCap::Unlimited, ZeroUsagePolicy::OneLine),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            subscriptions_per_ship(1.0, PlanCap::Limited(-1.0), ZeroUsagePolicy::OneLine),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            subscriptions_per_ship(1.0, PlanCap::Limited(0.0), ZeroUsagePolicy::OneLine),
            Err(PipelineError::Division(_))
        ));
    }

    #[test]
    fn container_on_unlimited_plan_matches_worked_example() {
        let config = RevenueConfig::default();
        let projection = project_revenue(&one_type(VesselType::Container, Band::new(136.6, 273.2)), &config).unwrap();
        let row = &projection.rows[0];
        assert_eq!(row.plan, "IMO_UNL");
        assert_eq!(row.subscriptions, 1);
        assert!((row.mrr.low - 341_500.0).abs() < 1.0);
        assert!((row.mrr.high - 683_000.0).abs() < 1.0);
        assert_eq!(projection.total, row.mrr);
    }

    #[test]
    fn passenger_cruise_needs_eight_lines() {
        let config = RevenueConfig::default();
        let projection = project_revenue(&one_type(VesselType::PassengerCruise, Band::new(1.0, 1.0)), &config).unwrap();
        assert_eq!(projection.rows[0].subscriptions, 8);
        assert!((projection.total.low - 8.0 * 2150.0).abs() < 1e-9);
    }

    #[test]
    fn availability_scales_revenue() {
        let mut config = RevenueConfig::default();
        config.availability.insert(VesselType::Container, 0.5);
        let projection = project_revenue(&one_type(VesselType::Container, Band::new(2.0, 4.0)), &config).unwrap();
        assert_eq!(projection.total, Band::new(2500.0, 5000.0));
    }

    #[test]
    fn zero_ship_type_contributes_nothing() {
        let config = RevenueConfig::default();
        let addressable: TypeTable<Band> = [
            (VesselType::Container, Band::new(10.0, 20.0)),
            (VesselType::Livestock, Band::new(0.0, 0.0)),
        ]
        .into_iter()
        .collect();
        let projection = project_revenue(&addressable, &config).unwrap();
        let livestock = projection.rows.iter().find(|r| r.vessel_type == VesselType::Livestock).unwrap();
        assert_eq!(livestock.mrr, Band::new(0.0, 0.0));
        assert_eq!(projection.total, Band::new(25_000.0, 50_000.0));
    }

    #[test]
    fn totals_scale_linearly() {
        let config = RevenueConfig::default();
        let base: TypeTable<Band> = VesselType::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| (*t, Band::new(i as f64 + 0.5, 2.0 * i as f64 + 1.25)))
            .collect();
        let scaled: TypeTable<Band> = base.iter().map(|(t, b)| (*t, b.scale(10_000.0))).collect();

        let a = project_revenue(&base, &config).unwrap().total;
        let b = project_revenue(&scaled, &config).unwrap().total;
        assert!((b.low - a.low * 10_000.0).abs() <= 1e-9 * b.low);
        assert!((b.high - a.high * 10_000.0).abs() <= 1e-9 * b.high);
    }

    #[test]
    fn every_row_is_ordered() {
        let config = RevenueConfig::default();
        let addressable: TypeTable<Band> = VesselType::ALL.iter().map(|t| (*t, Band::new(3.0, 7.5))).collect();
        let projection = project_revenue(&addressable, &config).unwrap();
        assert_eq!(projection.rows.len(), VesselType::ALL.len());
        for r in &projection.rows {
            assert!(r.mrr.low <= r.mrr.high);
        }
    }

    #[test]
    fn missing_mappings_are_configuration_errors() {
        let ships = one_type(VesselType::Reefer, Band::new(1.0, 2.0));

        let mut config = RevenueConfig::default();
        config.assignment.remove(&VesselType::Reefer);
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::Configuration(_))));

        let mut config = RevenueConfig::default();
        config.usage_tb.remove(&VesselType::Reefer);
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::Configuration(_))));

        let mut config = RevenueConfig::default();
        config.plans.remove("GP_500");
        let err = project_revenue(&ships, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(ref m) if m.contains("GP_500")));
    }

    #[test]
    fn bad_pricing_is_rejected_before_computing() {
        let ships = one_type(VesselType::Container, Band::new(1.0, 2.0));

        let mut config = RevenueConfig::default();
        config.plans.get_mut("GP_50").unwrap().fee = -250.0;
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::InvalidInput(_))));

        let mut config = RevenueConfig::default();
        config.plans.get_mut("GP_1TB").unwrap().cap_tb = PlanCap::Limited(f64::NAN);
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::InvalidInput(_))));

        let mut config = RevenueConfig::default();
        config.usage_tb.insert(VesselType::Container, -1.0);
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::InvalidInput(_))));

        let mut config = RevenueConfig::default();
        config.availability.insert(VesselType::Container, 1.5);
        assert!(matches!(project_revenue(&ships, &config), Err(PipelineError::InvalidInput(_))));
    }
}
