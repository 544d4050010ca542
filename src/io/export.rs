//! CSV exports of the stage tables.
//!
//! Each writer takes the rounded table from `report`, so the CSV carries the
//! same digits as the text summary. Per-type outputs end with a `TOTAL` row.

use std::fs::File;
use std::path::Path;

use crate::error::PipelineError;
use crate::io::ingest::{
    EST_UNIQUE_COLUMN, EST_UNIQUE_HIGH_COLUMN, EST_UNIQUE_LOW_COLUMN, LEO_HIGH_COLUMN, LEO_LOW_COLUMN, TOTAL_ROW,
    TYPE_COLUMN, YEAR_COLUMN,
};
use crate::report::{
    fmt_fixed, DemandTable, RevenueTable, TransitTable, UniqueTable, ADOPTION_DECIMALS, COUNT_DECIMALS,
    MONEY_DECIMALS, PCT_DECIMALS, SHARE_DECIMALS, SHIP_DECIMALS, USAGE_DECIMALS,
};

fn create_writer(path: &Path) -> Result<csv::Writer<File>, PipelineError> {
    let file = File::create(path)
        .map_err(|e| PipelineError::io(format!("Failed to create CSV '{}': {e}", path.display())))?;
    Ok(csv::Writer::from_writer(file))
}

fn write_row<I, S>(writer: &mut csv::Writer<File>, path: &Path, record: I) -> Result<(), PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    writer
        .write_record(record)
        .map_err(|e| PipelineError::io(format!("Failed to write CSV row to '{}': {e}", path.display())))
}

fn finish(mut writer: csv::Writer<File>, path: &Path) -> Result<(), PipelineError> {
    writer
        .flush()
        .map_err(|e| PipelineError::io(format!("Failed to flush CSV '{}': {e}", path.display())))
}

/// Write a rendered text summary next to its CSV.
pub fn write_summary(path: &Path, text: &str) -> Result<(), PipelineError> {
    std::fs::write(path, text)
        .map_err(|e| PipelineError::io(format!("Failed to write summary '{}': {e}", path.display())))
}

/// Stage 1: one row per year.
pub fn write_unique_csv(path: &Path, table: &UniqueTable) -> Result<(), PipelineError> {
    let mut w = create_writer(path)?;
    write_row(
        &mut w,
        path,
        [
            YEAR_COLUMN,
            table.transit_column.as_str(),
            EST_UNIQUE_COLUMN,
            EST_UNIQUE_LOW_COLUMN,
            EST_UNIQUE_HIGH_COLUMN,
        ],
    )?;
    for r in &table.rows {
        write_row(
            &mut w,
            path,
            [
                r.year.to_string(),
                r.transits.to_string(),
                r.mid.to_string(),
                r.low.to_string(),
                r.high.to_string(),
            ],
        )?;
    }
    finish(w, path)
}

/// Stage 2: one row per vessel type, then totals.
pub fn write_demand_csv(path: &Path, table: &DemandTable) -> Result<(), PipelineError> {
    let ships = |v: f64| fmt_fixed(v, SHIP_DECIMALS);
    let mut w = create_writer(path)?;
    write_row(
        &mut w,
        path,
        [
            "Label",
            TYPE_COLUMN,
            "Share",
            "Unique",
            "Unique_Low",
            "Unique_High",
            "Adoption_Low",
            "Adoption_High",
            LEO_LOW_COLUMN,
            LEO_HIGH_COLUMN,
            "Source",
        ],
    )?;
    for r in &table.rows {
        write_row(
            &mut w,
            path,
            [
                table.label.clone(),
                r.vessel_type.to_string(),
                fmt_fixed(r.share, SHARE_DECIMALS),
                ships(r.unique),
                ships(r.unique_band.low),
                ships(r.unique_band.high),
                fmt_fixed(r.adoption.low, ADOPTION_DECIMALS),
                fmt_fixed(r.adoption.high, ADOPTION_DECIMALS),
                ships(r.addressable.low),
                ships(r.addressable.high),
                r.source.label().to_string(),
            ],
        )?;
    }
    write_row(
        &mut w,
        path,
        [
            table.label.clone(),
            TOTAL_ROW.to_string(),
            fmt_fixed(table.total.share, SHARE_DECIMALS),
            ships(table.total.unique),
            ships(table.total.unique_band.low),
            ships(table.total.unique_band.high),
            String::new(),
            String::new(),
            ships(table.total.addressable.low),
            ships(table.total.addressable.high),
            String::new(),
        ],
    )?;
    finish(w, path)
}

/// Stage 3: one row per vessel type, then totals.
pub fn write_revenue_csv(path: &Path, table: &RevenueTable) -> Result<(), PipelineError> {
    let ships = |v: f64| fmt_fixed(v, SHIP_DECIMALS);
    let money = |v: f64| fmt_fixed(v, MONEY_DECIMALS);
    let mut w = create_writer(path)?;
    write_row(
        &mut w,
        path,
        [
            TYPE_COLUMN,
            "Ships_Low",
            "Ships_High",
            "Plan",
            "Cap_TB",
            "Usage_TB_per_ship",
            "Subs_per_ship",
            "Fee_USD",
            "Availability",
            "MRR_Low_USD",
            "MRR_High_USD",
        ],
    )?;
    for r in &table.rows {
        write_row(
            &mut w,
            path,
            [
                r.vessel_type.to_string(),
                ships(r.ships.low),
                ships(r.ships.high),
                r.plan.clone(),
                r.cap.label(),
                fmt_fixed(r.usage_tb, USAGE_DECIMALS),
                r.subscriptions.to_string(),
                money(r.fee),
                fmt_fixed(r.availability, USAGE_DECIMALS),
                money(r.mrr.low),
                money(r.mrr.high),
            ],
        )?;
    }
    write_row(
        &mut w,
        path,
        [
            TOTAL_ROW.to_string(),
            ships(table.total_ships.low),
            ships(table.total_ships.high),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            money(table.total.low),
            money(table.total.high),
        ],
    )?;
    finish(w, path)
}

/// LEO-equipped transits: one row per vessel type, then totals.
pub fn write_transit_csv(path: &Path, table: &TransitTable) -> Result<(), PipelineError> {
    let count = |v: f64| fmt_fixed(v, SHIP_DECIMALS);
    let pct = |v: Option<f64>| v.map(|p| fmt_fixed(p, PCT_DECIMALS)).unwrap_or_default();
    let mut w = create_writer(path)?;
    write_row(
        &mut w,
        path,
        [
            YEAR_COLUMN,
            TYPE_COLUMN,
            "Transits",
            "Adoption_Low",
            "Adoption_High",
            "LEO_Transits_Low",
            "LEO_Transits_High",
            "LEO_Share_Min_%",
            "LEO_Share_Max_%",
        ],
    )?;
    for r in &table.rows {
        write_row(
            &mut w,
            path,
            [
                table.year.to_string(),
                r.vessel_type.to_string(),
                fmt_fixed(r.count, COUNT_DECIMALS),
                fmt_fixed(r.adoption.low, ADOPTION_DECIMALS),
                fmt_fixed(r.adoption.high, ADOPTION_DECIMALS),
                count(r.equipped.low),
                count(r.equipped.high),
                String::new(),
                String::new(),
            ],
        )?;
    }
    write_row(
        &mut w,
        path,
        [
            table.year.to_string(),
            TOTAL_ROW.to_string(),
            fmt_fixed(table.total_transits, COUNT_DECIMALS),
            String::new(),
            String::new(),
            count(table.total.low),
            count(table.total.high),
            pct(table.share_pct.map(|p| p.low)),
            pct(table.share_pct.map(|p| p.high)),
        ],
    )?;
    finish(w, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Allocation, Band, UniqueSource, UniqueTotals, VesselType};
    use crate::io::ingest::read_addressable;
    use crate::report::DemandTotals;

    #[test]
    fn demand_csv_reads_back_as_addressable_ships() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demand_estimate.csv");
        let rows: Vec<Allocation> = VesselType::ALL
            .into_iter()
            .map(|t| {
                let (share, unique, unique_band, addressable) = match t {
                    VesselType::Container => {
                        (0.2, 1366.0, Band::new(1187.83, 1607.06), Band::new(136.6, 273.2))
                    }
                    _ => (0.0, 0.0, Band::default(), Band::default()),
                };
                Allocation {
                    vessel_type: t,
                    share,
                    unique,
                    unique_band,
                    adoption: Band::new(0.1, 0.2),
                    addressable,
                    source: UniqueSource::Share,
                }
            })
            .collect();
        let table = DemandTable {
            label: "auto_2024".to_string(),
            target_year: 2024,
            input_totals: UniqueTotals {
                mid: 6830.0,
                low: 5939.13,
                high: 8035.29,
            },
            rows,
            total: DemandTotals {
                share: 0.2,
                unique: 1366.0,
                unique_band: Band::new(1187.83, 1607.06),
                addressable: Band::new(136.6, 273.2),
            },
        };
        write_demand_csv(&path, &table).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("auto_2024,Container,0.200000,1366.00"));
        assert!(text.lines().last().unwrap().contains("TOTAL"));

        let back = read_addressable(&path).unwrap();
        assert_eq!(back[&VesselType::Container], Band::new(136.6, 273.2));
        assert_eq!(back[&VesselType::Reefer], Band::default());
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let table = RevenueTable {
            rows: Vec::new(),
            total_ships: Band::default(),
            total: Band::default(),
        };
        let err = write_revenue_csv(Path::new("/nonexistent/dir/revenue.csv"), &table).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
