//! CSV ingest and normalization.
//!
//! This module turns the two published tables into clean in-memory data:
//!
//! - the daily case table (one row per prefecture per day) becomes one
//!   date-ordered `PrefectureSeries` per prefecture
//! - the census table becomes one `PopulationRecord` per prefecture
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (prefectures keep first-appearance order)
//!
//! The census table is published as cp932 (Shift_JIS), so both readers decode
//! their input before CSV parsing. `InputEncoding::Auto` sniffs the first
//! block: a BOM wins, valid UTF-8 stays UTF-8, anything else is Shift_JIS.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use encoding_rs::{Encoding, SHIFT_JIS, UTF_8};
use encoding_rs_io::{DecodeReaderBytes, DecodeReaderBytesBuilder};
use tracing::{debug, info, warn};

use crate::domain::{CaseRecord, InputEncoding, PopulationRecord, PrefectureSeries};
use crate::error::AppError;

/// Header names accepted for each column (Japanese source header first).
const CASE_DATE: &[&str] = &["日付", "date"];
const CASE_PREFECTURE: &[&str] = &["都道府県名", "prefecture"];
const CASE_NEW: &[&str] = &["各地の感染者数_1日ごとの発表数", "new_cases"];

const POP_PREFECTURE: &[&str] = &["都道府県名", "prefecture"];
const POP_ERA: &[&str] = &["元号", "era"];
const POP_YEAR: &[&str] = &["西暦（年）", "西暦(年)", "year"];
const POP_TOTAL: &[&str] = &["人口（総数）", "人口(総数)", "population"];

/// How many skipped rows are logged individually before summarizing.
const LOGGED_ROW_ERRORS: usize = 5;

/// Bytes inspected when guessing the encoding of a table.
const SNIFF_BYTES: usize = 8 * 1024;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Bookkeeping for one loaded file.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_used: usize,
    pub row_errors: Vec<RowError>,
}

/// Daily case counts grouped per prefecture.
#[derive(Debug, Clone)]
pub struct CaseTable {
    series: Vec<PrefectureSeries>,
    index: HashMap<String, usize>,
    pub report: LoadReport,
}

impl CaseTable {
    /// Prefecture names in first-appearance order.
    pub fn prefectures(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.prefecture.as_str())
    }

    pub fn series(&self, prefecture: &str) -> Option<&PrefectureSeries> {
        self.index.get(prefecture).map(|&idx| &self.series[idx])
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Earliest and latest dates across every prefecture.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.series.iter().filter_map(|s| s.first_date()).min()?;
        let last = self.series.iter().filter_map(|s| s.last_date()).max()?;
        Some((first, last))
    }
}

/// Census population, one record per prefecture.
#[derive(Debug, Clone)]
pub struct PopulationTable {
    by_prefecture: HashMap<String, PopulationRecord>,
    pub report: LoadReport,
}

impl PopulationTable {
    pub fn get(&self, prefecture: &str) -> Option<&PopulationRecord> {
        self.by_prefecture.get(prefecture)
    }

    pub fn len(&self) -> usize {
        self.by_prefecture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefecture.is_empty()
    }
}

/// Load the daily case CSV.
pub fn load_cases(path: &Path, encoding: InputEncoding) -> Result<CaseTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!("Failed to open case CSV '{}': {e}", path.display()))
    })?;
    let table = read_cases(file, encoding)?;
    info!(
        path = %path.display(),
        prefectures = table.len(),
        rows_read = table.report.rows_read,
        rows_used = table.report.rows_used,
        skipped = table.report.row_errors.len(),
        "loaded case table"
    );
    Ok(table)
}

/// Parse daily case rows from any reader.
pub fn read_cases<R: Read>(reader: R, encoding: InputEncoding) -> Result<CaseTable, AppError> {
    let mut reader = csv_reader(decode_input(reader, encoding)?);
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read case CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = require_column(&header_map, CASE_DATE, "case")?;
    let pref_idx = require_column(&header_map, CASE_PREFECTURE, "case")?;
    let new_idx = require_column(&header_map, CASE_NEW, "case")?;

    let mut series: Vec<PrefectureSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<(usize, NaiveDate)> = HashSet::new();
    let mut report = LoadReport::default();

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and CSV lines are 1-based.
        let line = idx + 2;
        report.rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_case_row(&record, date_idx, pref_idx, new_idx));

        match parsed {
            Ok(row) => {
                let slot = match index.get(&row.prefecture) {
                    Some(&slot) => slot,
                    None => {
                        index.insert(row.prefecture.clone(), series.len());
                        series.push(PrefectureSeries {
                            prefecture: row.prefecture.clone(),
                            records: Vec::new(),
                        });
                        series.len() - 1
                    }
                };
                // A repeated day would be counted twice by the trailing window.
                if !seen.insert((slot, row.date)) {
                    let message = format!(
                        "Duplicate row for {} on {}; the first one is kept.",
                        row.prefecture, row.date
                    );
                    record_row_error(&mut report, "case", line, message);
                    continue;
                }
                series[slot].records.push(row);
                report.rows_used += 1;
            }
            Err(message) => record_row_error(&mut report, "case", line, message),
        }
    }

    if report.rows_used == 0 {
        return Err(AppError::data("No valid rows in the case CSV."));
    }

    for s in &mut series {
        s.records.sort_by_key(|r| r.date);
    }

    Ok(CaseTable {
        series,
        index,
        report,
    })
}

/// Load the census CSV and keep one record per prefecture.
///
/// Rows are filtered to `era` (when given); then either the pinned
/// `census_year` or the latest available year is kept.
pub fn load_population(
    path: &Path,
    era: Option<&str>,
    census_year: Option<i32>,
    encoding: InputEncoding,
) -> Result<PopulationTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::input(format!(
            "Failed to open population CSV '{}': {e}",
            path.display()
        ))
    })?;
    let table = read_population(file, era, census_year, encoding)?;
    info!(
        path = %path.display(),
        prefectures = table.len(),
        era = era.unwrap_or("*"),
        census_year = ?census_year,
        rows_read = table.report.rows_read,
        skipped = table.report.row_errors.len(),
        "loaded population table"
    );
    Ok(table)
}

/// Parse census rows from any reader.
pub fn read_population<R: Read>(
    reader: R,
    era: Option<&str>,
    census_year: Option<i32>,
    encoding: InputEncoding,
) -> Result<PopulationTable, AppError> {
    let mut reader = csv_reader(decode_input(reader, encoding)?);
    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read population CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let pref_idx = require_column(&header_map, POP_PREFECTURE, "population")?;
    let year_idx = require_column(&header_map, POP_YEAR, "population")?;
    let total_idx = require_column(&header_map, POP_TOTAL, "population")?;
    let era_filter = era.map(str::trim).filter(|e| !e.is_empty());
    let era_idx = match era_filter {
        Some(_) => Some(require_column(&header_map, POP_ERA, "population")?),
        None => find_column(&header_map, POP_ERA),
    };

    let mut by_prefecture: HashMap<String, PopulationRecord> = HashMap::new();
    let mut report = LoadReport::default();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        report.rows_read += 1;

        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_population_row(&record, pref_idx, era_idx, year_idx, total_idx));

        let row = match parsed {
            Ok(row) => row,
            Err(message) => {
                record_row_error(&mut report, "population", line, message);
                continue;
            }
        };

        if let Some(wanted) = era_filter {
            if row.era != wanted {
                continue;
            }
        }
        if let Some(year) = census_year {
            if row.year != year {
                continue;
            }
        }

        report.rows_used += 1;
        match by_prefecture.get(&row.prefecture) {
            Some(existing) if existing.year > row.year => {}
            _ => {
                by_prefecture.insert(row.prefecture.clone(), row);
            }
        }
    }

    if by_prefecture.is_empty() {
        return Err(AppError::data(format!(
            "No population rows match era={} census_year={}.",
            era_filter.unwrap_or("*"),
            census_year.map(|y| y.to_string()).unwrap_or_else(|| "latest".to_string()),
        )));
    }

    Ok(PopulationTable {
        by_prefecture,
        report,
    })
}

/// Wrap `reader` so it yields UTF-8 whatever the source encoding.
fn decode_input<R: Read>(
    reader: R,
    encoding: InputEncoding,
) -> Result<DecodeReaderBytes<BufReader<R>, Vec<u8>>, AppError> {
    let mut reader = BufReader::with_capacity(SNIFF_BYTES, reader);
    let encoding = match encoding {
        InputEncoding::Fixed(encoding) => encoding,
        InputEncoding::Auto => {
            let head = reader
                .fill_buf()
                .map_err(|e| AppError::input(format!("Failed to read CSV: {e}")))?;
            sniff_encoding(head)
        }
    };
    debug!(encoding = encoding.name(), "decoding table");
    Ok(DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(reader))
}

fn sniff_encoding(head: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(head) {
        return encoding;
    }
    match std::str::from_utf8(head) {
        Ok(_) => UTF_8,
        // Only the trailing character was cut off by the block boundary.
        Err(e) if e.error_len().is_none() => UTF_8,
        Err(_) => SHIFT_JIS,
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

fn parse_case_row(
    record: &StringRecord,
    date_idx: usize,
    pref_idx: usize,
    new_idx: usize,
) -> Result<CaseRecord, String> {
    let date = parse_date(get_required(record, date_idx, "date")?)?;
    let prefecture = get_required(record, pref_idx, "prefecture")?.to_string();
    let raw = get_required(record, new_idx, "new_cases")?;
    let value = parse_count(raw).ok_or_else(|| format!("Invalid case count '{raw}'."))?;
    let new_cases =
        u64::try_from(value).map_err(|_| format!("Negative case count '{raw}'."))?;

    Ok(CaseRecord {
        prefecture,
        date,
        new_cases,
    })
}

fn parse_population_row(
    record: &StringRecord,
    pref_idx: usize,
    era_idx: Option<usize>,
    year_idx: usize,
    total_idx: usize,
) -> Result<PopulationRecord, String> {
    let prefecture = get_required(record, pref_idx, "prefecture")?.to_string();
    let era = era_idx
        .and_then(|idx| get_optional(record, idx))
        .unwrap_or_default()
        .to_string();
    let raw_year = get_required(record, year_idx, "year")?;
    let year = raw_year
        .parse::<i32>()
        .map_err(|_| format!("Invalid census year '{raw_year}'."))?;
    let raw_total = get_required(record, total_idx, "population")?;
    let population = parse_count(raw_total)
        .filter(|&v| v > 0)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| format!("Invalid population '{raw_total}' (must be > 0)."))?;

    Ok(PopulationRecord {
        prefecture,
        era,
        year,
        population,
    })
}

fn record_row_error(report: &mut LoadReport, table: &str, line: usize, message: String) {
    if report.row_errors.len() < LOGGED_ROW_ERRORS {
        warn!(table, line, %message, "skipping row");
    } else {
        debug!(table, line, %message, "skipping row");
    }
    report.row_errors.push(RowError { line, message });
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names
        .iter()
        .find_map(|name| header_map.get(&normalize_header_name(name)).copied())
}

fn require_column(
    header_map: &HashMap<String, usize>,
    names: &[&str],
    table: &str,
) -> Result<usize, AppError> {
    find_column(header_map, names).ok_or_else(|| {
        let expected: Vec<String> = names.iter().map(|n| format!("`{n}`")).collect();
        AppError::input(format!(
            "Missing required column in {table} CSV: one of {}",
            expected.join(", ")
        ))
    })
}

fn get_required<'a>(record: &'a StringRecord, idx: usize, name: &str) -> Result<&'a str, String> {
    get_optional(record, idx).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // The published table uses `YYYY/M/D`; ISO dates are accepted too.
    const FMTS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}'. Expected YYYY/M/D or YYYY-MM-DD."))
}

/// Integer with optional thousands separators (`13,515,271`).
fn parse_count(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<i64>().ok()
}
