//! Unique-ship estimator.
//!
//! One anchor year has both a transit count and an observed unique-ship count.
//! Their ratio (unique ships per transit) is applied to every year:
//!
//! ```text
//! ratio = observed_unique / transits[anchor]
//! mid   = transits[year] × ratio
//! low   = mid / (1 + δ)
//! high  = mid / (1 − δ)
//! ```
//!
//! The band widens the *repeat factor* (transits per unique ship) by ±δ, which
//! keeps `low ≤ mid ≤ high` for any `0 ≤ δ < 1`.

use tracing::debug;

use crate::domain::{TransitSeries, UniqueEstimate, UniqueShipEstimates};
use crate::error::PipelineError;

/// Estimate unique ships for every year of `series`.
pub fn estimate_unique_ships(
    series: &TransitSeries,
    anchor_year: i32,
    observed_unique: f64,
    band: f64,
) -> Result<UniqueShipEstimates, PipelineError> {
    if !observed_unique.is_finite() || observed_unique < 0.0 {
        return Err(PipelineError::invalid_input(format!(
            "observed unique count must be finite and >= 0, got {observed_unique}"
        )));
    }
    if !(band.is_finite() && (0.0..1.0).contains(&band)) {
        return Err(PipelineError::invalid_input(format!("band width must be in [0, 1), got {band}")));
    }

    let anchor_transits = *series.get(&anchor_year).ok_or_else(|| {
        PipelineError::configuration(format!("anchor year {anchor_year} is not in the transit series"))
    })?;
    if anchor_transits == 0 {
        return Err(PipelineError::division(format!(
            "transit count at anchor year {anchor_year} is 0; cannot calibrate the unique-ship ratio"
        )));
    }

    let ratio = observed_unique / anchor_transits as f64;
    debug!(anchor_year, anchor_transits, observed_unique, ratio, "calibrated unique-ship ratio");

    let years = series
        .iter()
        .map(|(&year, &transits)| {
            let mid = transits as f64 * ratio;
            UniqueEstimate {
                year,
                transits,
                low: mid / (1.0 + band),
                mid,
                high: mid / (1.0 - band),
            }
        })
        .collect();

    Ok(UniqueShipEstimates {
        anchor_year,
        observed_unique,
        ratio,
        band,
        years,
    })
}

impl UniqueShipEstimates {
    pub fn year(&self, year: i32) -> Option<&UniqueEstimate> {
        self.years.iter().find(|e| e.year == year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series() -> TransitSeries {
        [(2020, 7_500), (2021, 8_000), (2022, 9_000), (2023, 0)].into_iter().collect()
    }

    #[test]
    fn anchor_year_reproduces_observed_count() {
        let est = estimate_unique_ships(&series(), 2021, 6071.0, 0.15).unwrap();
        let anchor = est.year(2021).unwrap();
        assert!((anchor.mid - 6071.0).abs() < 1e-9);
    }

    #[test]
    fn every_year_is_monotone() {
        let est = estimate_unique_ships(&series(), 2021, 6071.0, 0.15).unwrap();
        assert_eq!(est.years.len(), 4);
        for e in &est.years {
            assert!(e.low <= e.mid && e.mid <= e.high, "year {}", e.year);
        }
        // A zero-transit year is a valid, all-zero estimate.
        let empty = est.year(2023).unwrap();
        assert_eq!((empty.low, empty.mid, empty.high), (0.0, 0.0, 0.0));
    }

    #[test]
    fn ratio_scales_other_years() {
        let est = estimate_unique_ships(&series(), 2021, 6071.0, 0.15).unwrap();
        assert!((est.ratio - 0.758875).abs() < 1e-6);
        let y2022 = est.year(2022).unwrap();
        assert!((y2022.mid - 6829.875).abs() < 1e-6);
        assert!((y2022.low - 6829.875 / 1.15).abs() < 1e-6);
        assert!((y2022.high - 6829.875 / 0.85).abs() < 1e-6);
    }

    #[test]
    fn zero_band_collapses_to_mid() {
        let est = estimate_unique_ships(&series(), 2021, 6071.0, 0.0).unwrap();
        for e in &est.years {
            assert_eq!(e.low, e.mid);
            assert_eq!(e.high, e.mid);
        }
    }

    #[test]
    fn missing_anchor_is_configuration_error() {
        let err = estimate_unique_ships(&series(), 2019, 6071.0, 0.15).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn zero_anchor_transits_is_division_error() {
        let err = estimate_unique_ships(&series(), 2023, 6071.0, 0.15).unwrap_err();
        assert!(matches!(err, PipelineError::Division(_)));
    }

    #[test]
    fn out_of_domain_parameters_are_invalid_input() {
        assert!(matches!(
            estimate_unique_ships(&series(), 2021, -1.0, 0.15),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            estimate_unique_ships(&series(), 2021, 6071.0, 1.0),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            estimate_unique_ships(&series(), 2021, f64::NAN, 0.15),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
