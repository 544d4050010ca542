//! CSV ingest and validation.
//!
//! This module turns the stage input files into typed tables.
//!
//! Design goals:
//! - **Strict schema**: a missing column is a schema error naming file + column
//! - **No skipping**: a malformed cell aborts the stage with file, line and column
//! - **Separation of concerns**: no estimation logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{Band, TransitSeries, TypeTable, TypeTransits, UniqueTotals, VesselType};
use crate::error::PipelineError;

/// Label of the totals row written at the end of per-type outputs.
pub const TOTAL_ROW: &str = "TOTAL";

pub const YEAR_COLUMN: &str = "Year";
pub const TOTAL_TRANSITS_COLUMN: &str = "Total_Transits";
pub const EST_UNIQUE_COLUMN: &str = "Est_Unique";
pub const EST_UNIQUE_LOW_COLUMN: &str = "Est_Unique_Low";
pub const EST_UNIQUE_HIGH_COLUMN: &str = "Est_Unique_High";
pub const TYPE_COLUMN: &str = "Type";
pub const LEO_LOW_COLUMN: &str = "LEO_Unique_Low";
pub const LEO_HIGH_COLUMN: &str = "LEO_Unique_High";

/// An opened CSV file with a resolved header map.
struct CsvInput {
    path: PathBuf,
    reader: csv::Reader<File>,
    header_map: HashMap<String, usize>,
}

impl CsvInput {
    fn open(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)
            .map_err(|e| PipelineError::io(format!("Missing or unreadable CSV '{}': {e}", path.display())))?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| PipelineError::schema(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
            .clone();

        Ok(Self {
            path: path.to_path_buf(),
            reader,
            header_map: build_header_map(&headers),
        })
    }

    fn column(&self, name: &str) -> Result<usize, PipelineError> {
        self.header_map
            .get(&normalize_header_name(name))
            .copied()
            .ok_or_else(|| {
                PipelineError::schema(format!(
                    "'{}' is missing required column `{name}`",
                    self.path.display()
                ))
            })
    }

    /// All data records with their 1-based file line numbers.
    fn records(&mut self) -> Result<Vec<(usize, StringRecord)>, PipelineError> {
        let mut out = Vec::new();
        for (idx, result) in self.reader.records().enumerate() {
            // +2: records start on the line after the header, lines are 1-based.
            let line = idx + 2;
            let record = result.map_err(|e| {
                PipelineError::schema(format!("'{}' line {line}: CSV parse error: {e}", self.path.display()))
            })?;
            out.push((line, record));
        }
        Ok(out)
    }

    fn cell<'a>(&self, record: &'a StringRecord, line: usize, idx: usize, name: &str) -> Result<&'a str, PipelineError> {
        record
            .get(idx)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                PipelineError::invalid_input(format!(
                    "'{}' line {line}: missing value in column `{name}`",
                    self.path.display()
                ))
            })
    }

    fn year(&self, record: &StringRecord, line: usize, idx: usize) -> Result<i32, PipelineError> {
        let raw = self.cell(record, line, idx, YEAR_COLUMN)?;
        raw.parse::<i32>().map_err(|_| {
            PipelineError::invalid_input(format!(
                "'{}' line {line}: `{YEAR_COLUMN}` is not a year: '{raw}'",
                self.path.display()
            ))
        })
    }

    /// A finite, non-negative number.
    fn count(&self, record: &StringRecord, line: usize, idx: usize, name: &str) -> Result<f64, PipelineError> {
        let raw = self.cell(record, line, idx, name)?;
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
            _ => Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: `{name}` must be a non-negative number, got '{raw}'",
                self.path.display()
            ))),
        }
    }

    fn year_not_found(&self, year: i32) -> PipelineError {
        PipelineError::configuration(format!("Year {year} not found in '{}'", self.path.display()))
    }
}

/// Read a yearly transit-count series.
pub fn read_transit_series(path: &Path, transit_column: &str) -> Result<TransitSeries, PipelineError> {
    let mut input = CsvInput::open(path)?;
    let year_idx = input.column(YEAR_COLUMN)?;
    let transit_idx = input.column(transit_column)?;

    let mut series = TransitSeries::new();
    for (line, record) in input.records()? {
        let year = input.year(&record, line, year_idx)?;
        let count = input.count(&record, line, transit_idx, transit_column)?;
        // u64::MAX rounds up to 2^64 as f64, so anything at or above it overflows.
        if count >= u64::MAX as f64 {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: `{transit_column}` is too large for a transit count: {count}",
                path.display()
            )));
        }
        if count.fract() != 0.0 {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: `{transit_column}` must be a whole number of transits, got {count}",
                path.display()
            )));
        }
        if series.insert(year, count as u64).is_some() {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: duplicate year {year}",
                path.display()
            )));
        }
    }

    if series.is_empty() {
        return Err(PipelineError::invalid_input(format!("'{}' has no data rows", path.display())));
    }
    Ok(series)
}

/// Read the per-type transit counts of one year.
pub fn read_type_transits(path: &Path, year: i32) -> Result<TypeTransits, PipelineError> {
    let mut input = CsvInput::open(path)?;
    let year_idx = input.column(YEAR_COLUMN)?;
    let total_idx = input.column(TOTAL_TRANSITS_COLUMN)?;
    let type_idx = VesselType::ALL
        .iter()
        .map(|t| input.column(t.column_name()).map(|idx| (*t, idx)))
        .collect::<Result<Vec<_>, PipelineError>>()?;

    for (line, record) in input.records()? {
        if input.year(&record, line, year_idx)? != year {
            continue;
        }
        let total_transits = input.count(&record, line, total_idx, TOTAL_TRANSITS_COLUMN)?;
        let mut counts = TypeTable::new();
        for (t, idx) in &type_idx {
            counts.insert(*t, input.count(&record, line, *idx, t.column_name())?);
        }
        return Ok(TypeTransits {
            year,
            total_transits,
            counts,
        });
    }

    Err(input.year_not_found(year))
}

/// Read the Stage 1 unique-ship totals of one year.
pub fn read_unique_totals(path: &Path, year: i32) -> Result<UniqueTotals, PipelineError> {
    let mut input = CsvInput::open(path)?;
    let year_idx = input.column(YEAR_COLUMN)?;
    let mid_idx = input.column(EST_UNIQUE_COLUMN)?;
    let low_idx = input.column(EST_UNIQUE_LOW_COLUMN)?;
    let high_idx = input.column(EST_UNIQUE_HIGH_COLUMN)?;

    for (line, record) in input.records()? {
        if input.year(&record, line, year_idx)? != year {
            continue;
        }
        let totals = UniqueTotals {
            mid: input.count(&record, line, mid_idx, EST_UNIQUE_COLUMN)?,
            low: input.count(&record, line, low_idx, EST_UNIQUE_LOW_COLUMN)?,
            high: input.count(&record, line, high_idx, EST_UNIQUE_HIGH_COLUMN)?,
        };
        if !(totals.low <= totals.mid && totals.mid <= totals.high) {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: expected {EST_UNIQUE_LOW_COLUMN} <= {EST_UNIQUE_COLUMN} <= {EST_UNIQUE_HIGH_COLUMN}",
                path.display()
            )));
        }
        return Ok(totals);
    }

    Err(input.year_not_found(year))
}

/// Read per-type addressable ships from a Stage 2 output file.
///
/// The trailing totals row is skipped. Every vessel type must appear exactly
/// once.
pub fn read_addressable(path: &Path) -> Result<TypeTable<Band>, PipelineError> {
    let mut input = CsvInput::open(path)?;
    let type_idx = input.column(TYPE_COLUMN)?;
    let low_idx = input.column(LEO_LOW_COLUMN)?;
    let high_idx = input.column(LEO_HIGH_COLUMN)?;

    let mut table = TypeTable::new();
    for (line, record) in input.records()? {
        let raw_type = input.cell(&record, line, type_idx, TYPE_COLUMN)?;
        if raw_type.eq_ignore_ascii_case(TOTAL_ROW) {
            continue;
        }
        let vessel_type: VesselType = raw_type.parse().map_err(|e| {
            PipelineError::schema(format!("'{}' line {line}: {e}", path.display()))
        })?;
        let low = input.count(&record, line, low_idx, LEO_LOW_COLUMN)?;
        let high = input.count(&record, line, high_idx, LEO_HIGH_COLUMN)?;
        if low > high {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: {LEO_LOW_COLUMN} {low} exceeds {LEO_HIGH_COLUMN} {high}",
                path.display()
            )));
        }
        if table.insert(vessel_type, Band::new(low, high)).is_some() {
            return Err(PipelineError::invalid_input(format!(
                "'{}' line {line}: duplicate row for {vessel_type}",
                path.display()
            )));
        }
    }

    let missing: Vec<&str> = VesselType::ALL
        .iter()
        .filter(|t| !table.contains_key(t))
        .map(|t| t.column_name())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::schema(format!(
            "'{}' is missing rows for vessel types: {}",
            path.display(),
            missing.join(", ")
        )));
    }
    Ok(table)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}
