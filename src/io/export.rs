//! Export the displayed case series to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::domain::{CaseRecord, DateInterval};
use crate::error::AppError;

/// Write `prefecture,date,new_cases` rows to `path`.
pub fn write_series_csv(path: &Path, records: &[CaseRecord]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display()))
    })?;
    let mut writer = csv::Writer::from_writer(file);

    // An empty series still gets a header so the file is self-describing.
    if records.is_empty() {
        writer
            .write_record(["prefecture", "date", "new_cases"])
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV header: {e}")))?;
    }
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::runtime(format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::runtime(format!("Failed to flush export CSV: {e}")))?;

    info!(path = %path.display(), rows = records.len(), "exported series");
    Ok(())
}

/// Write the series into `dir` under a timestamped name and return the path.
pub fn write_series_snapshot(
    dir: &Path,
    prefecture: &str,
    interval: &DateInterval,
    records: &[CaseRecord],
) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::runtime(format!("Failed to create export dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!(
        "cases_{prefecture}_{}{:02}-{}{:02}_{ts}.csv",
        interval.start_year(),
        interval.start_month(),
        interval.end_year(),
        interval.end_month(),
    ));

    write_series_csv(&path, records)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::YearMonth;
    use chrono::NaiveDate;

    fn rec(d: u32, n: u64) -> CaseRecord {
        CaseRecord {
            prefecture: "東京都".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 3, d).unwrap(),
            new_cases: n,
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_series_csv(&path, &[rec(1, 5), rec(2, 7)]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "prefecture,date,new_cases");
        assert_eq!(lines[1], "東京都,2020-03-01,5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn empty_series_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        write_series_csv(&path, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap().trim(),
            "prefecture,date,new_cases"
        );
    }

    #[test]
    fn write_failures_are_runtime_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_series_csv(&path, &[rec(1, 5)]).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
        assert!(err.message().contains("Failed to create export CSV"));

        // A regular file where the snapshot directory should be.
        let blocker = dir.path().join("exports");
        std::fs::write(&blocker, "").unwrap();
        let month = YearMonth::new(2020, 3).unwrap();
        let interval = DateInterval::new(month, month).unwrap();
        let err = write_series_snapshot(&blocker, "東京都", &interval, &[]).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_RUNTIME);
    }

    #[test]
    fn snapshot_name_includes_interval() {
        let dir = tempfile::tempdir().unwrap();
        let month = YearMonth::new(2020, 3).unwrap();
        let interval = DateInterval::new(month, month).unwrap();
        let path = write_series_snapshot(dir.path(), "東京都", &interval, &[rec(1, 5)]).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cases_東京都_202003-202003_"));
        assert!(path.exists());
    }
}
