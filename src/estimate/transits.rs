//! LEO-equipped transit projection.
//!
//! Applies the adoption ranges straight to a year's per-type transit counts
//! (no unique-ship step), giving the number of transits made by equipped ships.

use tracing::warn;

use crate::domain::{Band, TransitProjection, TransitProjectionRow, TypeTable, TypeTransits};
use crate::error::PipelineError;
use crate::estimate::{check_fraction, ensure_same_types};

pub fn project_transits(transits: &TypeTransits, adoption: &TypeTable<Band>) -> Result<TransitProjection, PipelineError> {
    ensure_same_types("per-type transits", &transits.counts, "adoption ranges", adoption)?;
    for (t, range) in adoption {
        check_fraction("adoption low", *t, range.low)?;
        check_fraction("adoption high", *t, range.high)?;
        if range.low > range.high {
            return Err(PipelineError::invalid_input(format!(
                "adoption range for {t} is inverted: {} > {}",
                range.low, range.high
            )));
        }
    }

    let type_sum = transits.type_sum();
    if (type_sum - transits.total_transits).abs() > 1e-6 {
        warn!(
            year = transits.year,
            type_sum,
            total_transits = transits.total_transits,
            "per-type counts do not add up to Total_Transits; percentages use Total_Transits"
        );
    }

    let rows: Vec<TransitProjectionRow> = transits
        .counts
        .iter()
        .map(|(t, count)| {
            let adoption = adoption[t];
            TransitProjectionRow {
                vessel_type: *t,
                count: *count,
                adoption,
                equipped: adoption.scale(*count),
            }
        })
        .collect();

    let total = rows.iter().fold(Band::default(), |acc, r| {
        Band::new(acc.low + r.equipped.low, acc.high + r.equipped.high)
    });

    Ok(TransitProjection {
        year: transits.year,
        total_transits: transits.total_transits,
        rows,
        total,
    })
}
