//! Stage workflow shared by the single-stage commands and `run`.
//!
//! Each stage reads its inputs, validates everything, computes, rounds once
//! into a report table, then writes `<stem>.csv` and `<stem>.txt` from that
//! table. Nothing is written until the whole stage has succeeded.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::{DemandConfig, RevenueConfig, ScenarioConfig, ShareSource, ShipsConfig};
use crate::domain::TypeTransits;
use crate::error::PipelineError;
use crate::estimate::{estimate_demand, estimate_unique_ships, project_revenue, project_transits};
use crate::io::{export, ingest};
use crate::report;

pub const UNIQUE_STEM: &str = "unique_estimates";
pub const DEMAND_STEM: &str = "demand_estimate";
pub const REVENUE_STEM: &str = "revenue_capacity";
pub const TRANSITS_STEM: &str = "leo_transits";

/// Files written by one stage plus its rendered summary.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub csv: PathBuf,
    pub txt: PathBuf,
    pub summary: String,
}

/// `<out_dir>/<stem>.csv` and `<out_dir>/<stem>.txt`.
pub fn stage_paths(out_dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    (out_dir.join(format!("{stem}.csv")), out_dir.join(format!("{stem}.txt")))
}

fn ensure_out_dir(out_dir: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| PipelineError::io(format!("Failed to create output dir '{}': {e}", out_dir.display())))
}

/// Sibling path a stage writes to before its outputs are committed.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

fn commit(partial: &Path, target: &Path) -> Result<(), PipelineError> {
    std::fs::rename(partial, target)
        .map_err(|e| PipelineError::io(format!("Failed to write '{}': {e}", target.display())))
}

fn discard(paths: &[&Path]) {
    for path in paths {
        // Missing files are fine here; only leftovers matter.
        let _ = std::fs::remove_file(path);
    }
}

/// Write both outputs to partial files, then rename them into place. On any
/// failure neither output of this stage is left behind.
fn finish_stage(
    out_dir: &Path,
    stem: &str,
    summary: String,
    write_csv: impl FnOnce(&Path) -> Result<(), PipelineError>,
) -> Result<StageOutput, PipelineError> {
    ensure_out_dir(out_dir)?;
    let (csv, txt) = stage_paths(out_dir, stem);
    let (csv_partial, txt_partial) = (partial_path(&csv), partial_path(&txt));

    let written = write_csv(&csv_partial).and_then(|()| export::write_summary(&txt_partial, &summary));
    if let Err(err) = written {
        discard(&[&csv_partial, &txt_partial]);
        return Err(err);
    }
    if let Err(err) = commit(&txt_partial, &txt) {
        discard(&[&csv_partial, &txt_partial]);
        return Err(err);
    }
    if let Err(err) = commit(&csv_partial, &csv) {
        discard(&[&csv_partial, &txt]);
        return Err(err);
    }

    info!(csv = %csv.display(), txt = %txt.display(), "wrote {stem}");
    Ok(StageOutput { csv, txt, summary })
}

/// Stage 1: unique ships per year.
pub fn run_ships(
    config: &ShipsConfig,
    transits: &Path,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<StageOutput, PipelineError> {
    info!(input = %transits.display(), "stage 1: unique-ship estimation");
    config.validate()?;
    let series = ingest::read_transit_series(transits, &config.transit_column)?;
    let estimates = estimate_unique_ships(&series, config.anchor_year, config.observed_unique, config.band)?;
    info!(ratio = estimates.ratio, years = estimates.years.len(), "unique-ship ratio calibrated");

    let table = report::unique_table(&estimates, &config.transit_column);
    let summary = report::format_unique_summary(&table, generated);
    finish_stage(out_dir, UNIQUE_STEM, summary, |path| export::write_unique_csv(path, &table))
}

/// Stage 2: per-type allocation and LEO-capable ships.
///
/// `vessel_types` is needed when shares come from transits. `unique` is read
/// unless the scenario overrides the unique-ship totals or takes per-type
/// unique ships directly.
pub fn run_demand(
    config: &DemandConfig,
    vessel_types: Option<&Path>,
    unique: &Path,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<StageOutput, PipelineError> {
    info!(target_year = config.target_year, "stage 2: demand allocation");
    config.validate()?;

    let transits = match (config.share_source, vessel_types) {
        (ShareSource::Transits, Some(path)) => Some(ingest::read_type_transits(path, config.target_year)?),
        (ShareSource::Transits, None) => {
            return Err(PipelineError::configuration(
                "share_source \"transits\" needs --vessel-types",
            ));
        }
        (ShareSource::ManualTotals | ShareSource::ManualUniques, _) => None,
    };

    let totals = match (config.share_source, config.unique_total_override) {
        (ShareSource::ManualUniques, _) => None,
        (_, Some(totals)) => {
            info!(mid = totals.mid, low = totals.low, high = totals.high, "using unique-ship total override");
            Some(totals)
        }
        (_, None) => Some(ingest::read_unique_totals(unique, config.target_year)?),
    };

    let demand = estimate_demand(config, transits.as_ref(), totals)?;
    let table = report::demand_table(&demand);
    info!(
        label = %table.label,
        low = table.total.addressable.low,
        high = table.total.addressable.high,
        "LEO-capable ships allocated"
    );
    let summary = report::format_demand_summary(&table, generated);
    finish_stage(out_dir, DEMAND_STEM, summary, |path| export::write_demand_csv(path, &table))
}

/// Stage 3: capacity-driven monthly recurring revenue.
pub fn run_revenue(
    config: &RevenueConfig,
    demand: &Path,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<StageOutput, PipelineError> {
    info!(input = %demand.display(), "stage 3: revenue projection");
    config.validate()?;
    let addressable = ingest::read_addressable(demand)?;
    let projection = project_revenue(&addressable, config)?;

    let table = report::revenue_table(&projection);
    info!(low = table.total.low, high = table.total.high, "monthly recurring revenue projected");
    let summary = report::format_revenue_summary(&table, generated);
    finish_stage(out_dir, REVENUE_STEM, summary, |path| export::write_revenue_csv(path, &table))
}

/// LEO-equipped transits for the target year.
///
/// `demand.manual_transit_counts` takes precedence over `vessel_types`.
pub fn run_transits(
    config: &DemandConfig,
    vessel_types: Option<&Path>,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<StageOutput, PipelineError> {
    info!(target_year = config.target_year, "LEO-equipped transit projection");
    config.validate()?;
    let transits = match (&config.manual_transit_counts, vessel_types) {
        (Some(counts), _) => {
            info!("using demand.manual_transit_counts for the transit projection");
            TypeTransits::from_counts(config.target_year, counts.clone())
        }
        (None, Some(path)) => ingest::read_type_transits(path, config.target_year)?,
        (None, None) => {
            return Err(PipelineError::configuration(
                "transit projection needs --vessel-types or demand.manual_transit_counts",
            ));
        }
    };
    let projection = project_transits(&transits, &config.adoption)?;

    let table = report::transit_table(&projection);
    let summary = report::format_transit_summary(&table, generated);
    finish_stage(out_dir, TRANSITS_STEM, summary, |path| export::write_transit_csv(path, &table))
}

/// Stages 1 to 3 in order, each reading the file the previous stage wrote.
/// The transit projection runs last when per-type transits are available.
pub fn run_all(
    config: &ScenarioConfig,
    transits: &Path,
    vessel_types: Option<&Path>,
    out_dir: &Path,
    generated: DateTime<Local>,
) -> Result<Vec<StageOutput>, PipelineError> {
    config.validate()?;

    let ships = run_ships(&config.ships, transits, out_dir, generated)?;
    let demand = run_demand(&config.demand, vessel_types, &ships.csv, out_dir, generated)?;
    let revenue = run_revenue(&config.revenue, &demand.csv, out_dir, generated)?;
    let mut outputs = vec![ships, demand, revenue];

    if vessel_types.is_some() || config.demand.manual_transit_counts.is_some() {
        outputs.push(run_transits(&config.demand, vessel_types, out_dir, generated)?);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::domain::VesselType;
    use crate::report::group_thousands;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    /// Anchor 2021: 8,000 transits / 6,071 unique. 2024: 9,000 transits,
    /// 20% of them container ships.
    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let transits = dir.join("transits.csv");
        std::fs::write(
            &transits,
            "Year,Istanbul_Strait_Total_Transits\n2021,8000\n2022,8500\n2024,9000\n",
        )
        .unwrap();

        let vessel_types = dir.join("vessel_types.csv");
        std::fs::write(
            &vessel_types,
            "Year,Total_Transits,Container,Bulk_Carrier,Tanker_Total,RoRo_Vehicle,Passenger_Cruise,General_Cargo,Livestock,Reefer\n\
             2023,8800,1700,2700,1800,900,450,900,175,175\n\
             2024,9000,1800,2700,1800,900,450,900,225,225\n",
        )
        .unwrap();
        (transits, vessel_types)
    }

    fn csv_row<'a>(text: &'a str, first: &str) -> Vec<&'a str> {
        text.lines()
            .map(|l| l.split(',').collect::<Vec<_>>())
            .find(|cells| cells.first() == Some(&first))
            .unwrap()
    }

    #[test]
    fn end_to_end_container_example() {
        let dir = tempfile::tempdir().unwrap();
        let (transits, vessel_types) = write_inputs(dir.path());
        let out_dir = dir.path().join("out");

        let outputs =
            run_all(&ScenarioConfig::default(), &transits, Some(&vessel_types), &out_dir, fixed_time()).unwrap();
        assert_eq!(outputs.len(), 4);
        for output in &outputs {
            assert!(output.csv.exists());
            assert!(output.txt.exists());
        }

        // Stage 1: 9000 × 6071 / 8000 = 6829.875 -> 6830 whole ships.
        let unique = std::fs::read_to_string(&outputs[0].csv).unwrap();
        assert_eq!(unique.lines().next().unwrap(), "Year,Istanbul_Strait_Total_Transits,Est_Unique,Est_Unique_Low,Est_Unique_High");
        assert_eq!(csv_row(&unique, "2024"), vec!["2024", "9000", "6830", "5939", "8035"]);
        assert_eq!(csv_row(&unique, "2021"), vec!["2021", "8000", "6071", "5279", "7142"]);

        // Stage 2: 6830 × 20% = 1366 containers, 10–20% adoption.
        let demand = std::fs::read_to_string(&outputs[1].csv).unwrap();
        let container: Vec<&str> = demand.lines().find(|l| l.contains(",Container,")).unwrap().split(',').collect();
        assert_eq!(container[2], "0.200000");
        assert_eq!(container[3], "1366.00");
        assert_eq!(container[8], "136.60");
        assert_eq!(container[9], "273.20");

        // Stage 3: unlimited plan, one line per ship at $2,500.
        let revenue = std::fs::read_to_string(&outputs[2].csv).unwrap();
        let row = csv_row(&revenue, "Container");
        assert_eq!(row[3], "IMO_UNL");
        assert_eq!(row[6], "1");
        assert_eq!(row[9], "341500.00");
        assert_eq!(row[10], "683000.00");
    }

    #[test]
    fn revenue_text_and_csv_totals_agree() {
        let dir = tempfile::tempdir().unwrap();
        let (transits, vessel_types) = write_inputs(dir.path());
        let out_dir = dir.path().join("out");
        let outputs =
            run_all(&ScenarioConfig::default(), &transits, Some(&vessel_types), &out_dir, fixed_time()).unwrap();

        let revenue_csv = std::fs::read_to_string(&outputs[2].csv).unwrap();
        let total = csv_row(&revenue_csv, "TOTAL");
        let revenue_txt = std::fs::read_to_string(&outputs[2].txt).unwrap();
        assert!(revenue_txt.contains(&format!(
            "TOTAL MRR: ${} – ${}",
            group_thousands(total[9]),
            group_thousands(total[10])
        )));

        let demand_csv = std::fs::read_to_string(&outputs[1].csv).unwrap();
        let total: Vec<&str> = demand_csv.lines().last().unwrap().split(',').collect();
        assert_eq!(total[1], "TOTAL");
        let demand_txt = std::fs::read_to_string(&outputs[1].txt).unwrap();
        assert!(demand_txt.contains(&format!(
            "LEO-unique ships (low–high): {} – {}",
            group_thousands(total[8]),
            group_thousands(total[9])
        )));
    }

    #[test]
    fn stage_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let err = run_revenue(
            &RevenueConfig::default(),
            &dir.path().join("missing.csv"),
            &out_dir,
            fixed_time(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        let (csv, txt) = stage_paths(&out_dir, REVENUE_STEM);
        assert!(!csv.exists());
        assert!(!txt.exists());
    }

    #[test]
    fn demand_without_vessel_types_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_demand(
            &DemandConfig::default(),
            None,
            &dir.path().join("unique_estimates.csv"),
            dir.path(),
            fixed_time(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn unique_total_override_skips_stage_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let (_, vessel_types) = write_inputs(dir.path());
        let mut config = DemandConfig::default();
        config.unique_total_override = Some(crate::domain::UniqueTotals {
            mid: 10_000.0,
            low: 9_000.0,
            high: 11_000.0,
        });

        let output = run_demand(
            &config,
            Some(&vessel_types),
            &dir.path().join("never_written.csv"),
            dir.path(),
            fixed_time(),
        )
        .unwrap();
        let text = std::fs::read_to_string(&output.csv).unwrap();
        let container: Vec<&str> = text.lines().find(|l| l.contains(",Container,")).unwrap().split(',').collect();
        assert_eq!(container[3], "2000.00");
        assert!(output.summary.contains("10,000.00 / 9,000.00 / 11,000.00"));
    }

    #[test]
    fn transit_projection_for_target_year() {
        let dir = tempfile::tempdir().unwrap();
        let (_, vessel_types) = write_inputs(dir.path());
        let output = run_transits(&DemandConfig::default(), Some(&vessel_types), dir.path(), fixed_time()).unwrap();

        let text = std::fs::read_to_string(&output.csv).unwrap();
        let container: Vec<&str> = text.lines().find(|l| l.contains(",Container,")).unwrap().split(',').collect();
        assert_eq!(container[0], "2024");
        assert_eq!(container[5], "180.00");
        assert_eq!(container[6], "360.00");
        assert!(output.summary.contains("LEO-equipped transits by vessel type"));
    }

    fn full_demand_csv(dir: &Path) -> PathBuf {
        let path = dir.join("demand_estimate.csv");
        let mut body = String::from("Type,LEO_Unique_Low,LEO_Unique_High\n");
        for t in VesselType::ALL {
            body.push_str(&format!("{},10,20\n", t.column_name()));
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn revenue_rejects_demand_file_missing_types() {
        let dir = tempfile::tempdir().unwrap();
        let demand = dir.path().join("demand_estimate.csv");
        std::fs::write(&demand, "Type,LEO_Unique_Low,LEO_Unique_High\nContainer,136.6,273.2\n").unwrap();
        let out_dir = dir.path().join("out");

        let err = run_revenue(&RevenueConfig::default(), &demand, &out_dir, fixed_time()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(ref m) if m.contains("Passenger_Cruise")));
        assert!(!stage_paths(&out_dir, REVENUE_STEM).0.exists());
    }

    #[test]
    fn failed_summary_commit_leaves_no_csv() {
        let dir = tempfile::tempdir().unwrap();
        let demand = full_demand_csv(dir.path());
        let out_dir = dir.path().join("out");
        let (csv, txt) = stage_paths(&out_dir, REVENUE_STEM);
        // A non-empty directory where the summary should go blocks the rename.
        std::fs::create_dir_all(txt.join("blocker")).unwrap();

        let err = run_revenue(&RevenueConfig::default(), &demand, &out_dir, fixed_time()).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(!csv.exists());
        assert!(!partial_path(&csv).exists());
        assert!(!partial_path(&txt).exists());
    }

    #[test]
    fn revenue_csv_and_text_share_precision() {
        let dir = tempfile::tempdir().unwrap();
        let demand = full_demand_csv(dir.path());
        let output = run_revenue(&RevenueConfig::default(), &demand, dir.path(), fixed_time()).unwrap();

        let text = std::fs::read_to_string(&output.csv).unwrap();
        let cruise = csv_row(&text, "Passenger_Cruise");
        assert_eq!(cruise[5], "15.00");
        assert_eq!(cruise[6], "8");
        assert_eq!(cruise[8], "1.00");
        assert!(output.summary.contains("15.00"));
        assert!(output.summary.contains(" 1.00 "));
    }

    #[test]
    fn manual_uniques_need_no_input_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DemandConfig::default();
        config.share_source = ShareSource::ManualUniques;
        config.manual_uniques = Some(
            VesselType::ALL
                .iter()
                .map(|t| (*t, if *t == VesselType::Container { 1366.0 } else { 0.0 }))
                .collect(),
        );

        let output = run_demand(&config, None, &dir.path().join("never_written.csv"), dir.path(), fixed_time()).unwrap();
        let text = std::fs::read_to_string(&output.csv).unwrap();
        let container: Vec<&str> = text.lines().find(|l| l.contains(",Container,")).unwrap().split(',').collect();
        assert_eq!(container[0], "manual_uniques");
        assert_eq!(container[3], "1366.00");
        assert_eq!(container[4], "1366.00");
        assert_eq!(container[5], "1366.00");
        assert_eq!(container[8], "136.60");
        assert_eq!(container[10], "manual");
    }

    #[test]
    fn manual_transit_counts_replace_the_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DemandConfig::default();
        config.manual_transit_counts = Some(
            VesselType::ALL
                .iter()
                .map(|t| (*t, if *t == VesselType::Container { 1000.0 } else { 0.0 }))
                .collect(),
        );

        let output = run_transits(&config, None, dir.path(), fixed_time()).unwrap();
        let text = std::fs::read_to_string(&output.csv).unwrap();
        let container = csv_row(&text, "2024");
        assert_eq!(container[1], "Container");
        assert_eq!(container[5], "100.00");
        assert_eq!(container[6], "200.00");
        let total: Vec<&str> = text.lines().last().unwrap().split(',').collect();
        assert_eq!(total[2], "1000");

        let err = run_transits(&DemandConfig::default(), None, dir.path(), fixed_time()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
