//! Interactive CSV picker.
//!
//! Used when a table path (flag, env var or default name) does not exist and
//! stdin is a terminal: the user picks one of the `*.csv` files found under
//! the current directory or types a path.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Default directory recursion depth for finding CSV files.
const DEFAULT_SEARCH_DEPTH: usize = 3;

/// Ask which CSV to use for `label` (e.g. "case", "population").
pub fn prompt_for_csv_path(label: &str, missing: &Path) -> Result<PathBuf, AppError> {
    let files = discover_csv_files(Path::new("."));
    if files.is_empty() {
        return Err(AppError::input(format!(
            "{label} CSV not found: {} (and no .csv files under the current directory).",
            missing.display()
        )));
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    pick_from(label, missing, &files, &mut stdin.lock(), &mut stdout)
}

fn pick_from<R: BufRead, W: Write>(
    label: &str,
    missing: &Path,
    files: &[PathBuf],
    input: &mut R,
    out: &mut W,
) -> Result<PathBuf, AppError> {
    let write_err = |e: io::Error| AppError::input(format!("Failed to write prompt: {e}"));

    writeln!(out, "{label} CSV not found: {}", missing.display()).map_err(write_err)?;
    for (idx, path) in files.iter().enumerate() {
        writeln!(out, "{:>3}) {}", idx + 1, pretty_path(path)).map_err(write_err)?;
    }

    loop {
        write!(out, "Select the {label} CSV (1-{}), type a path, or q to quit: ", files.len())
            .map_err(write_err)?;
        out.flush().map_err(write_err)?;

        let mut line = String::new();
        let bytes = input
            .read_line(&mut line)
            .map_err(|e| AppError::input(format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Err(AppError::input(format!(
                "No input received. Pass the {label} CSV with a flag."
            )));
        }

        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            return Err(AppError::input("Canceled."));
        }

        if let Ok(n) = choice.parse::<usize>() {
            if (1..=files.len()).contains(&n) {
                return validate_csv_path(&files[n - 1]);
            }
            writeln!(out, "Invalid choice: {n}.").map_err(write_err)?;
            continue;
        }

        match validate_csv_path(Path::new(choice)) {
            Ok(path) => return Ok(path),
            Err(err) => writeln!(out, "{err}").map_err(write_err)?,
        }
    }
}

/// Validate the provided path points to an existing `.csv` file.
pub fn validate_csv_path(path: &Path) -> Result<PathBuf, AppError> {
    if !path.exists() {
        return Err(AppError::input(format!("CSV file not found: {}", path.display())));
    }
    if path.is_dir() {
        return Err(AppError::input(format!(
            "Expected a file, got a directory: {}",
            path.display()
        )));
    }
    if !has_csv_extension(path) {
        return Err(AppError::input(format!(
            "Expected a .csv file (got: {}).",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

/// `*.csv` files under `root`, sorted by display path.
pub fn discover_csv_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    walk(root, 0, &mut out);
    out.sort_by_key(|p| pretty_path(p));
    out
}

fn walk(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > DEFAULT_SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !should_skip_dir(&path) {
                walk(&path, depth + 1, out);
            }
        } else if file_type.is_file() && has_csv_extension(&path) {
            out.push(path);
        }
    }
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn should_skip_dir(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
    matches!(name, ".git" | "target" | "exports")
}

fn pretty_path(path: &Path) -> String {
    let stripped = path.strip_prefix("./").unwrap_or(path);
    stripped.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(dir.path().join("data/cases.csv"), "date\n").unwrap();
        fs::write(dir.path().join("population.CSV"), "year\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("target/skip.csv"), "x").unwrap();
        let files = discover_csv_files(dir.path());
        (dir, files)
    }

    #[test]
    fn discovery_skips_build_dirs_and_other_extensions() {
        let (dir, files) = fixture();
        let names: Vec<PathBuf> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("data/cases.csv"), PathBuf::from("population.CSV")]
        );
    }

    #[test]
    fn pick_by_number_after_bad_choice() {
        let (_dir, files) = fixture();
        let mut input = io::Cursor::new("9\n2\n");
        let mut out = Vec::new();
        let picked = pick_from("population", Path::new("population.csv"), &files, &mut input, &mut out)
            .unwrap();
        assert_eq!(picked, files[1]);
        assert!(String::from_utf8(out).unwrap().contains("Invalid choice: 9."));
    }

    #[test]
    fn quit_and_eof_cancel() {
        let (_dir, files) = fixture();
        let mut out = Vec::new();
        assert!(pick_from("case", Path::new("x.csv"), &files, &mut io::Cursor::new("q\n"), &mut out).is_err());
        assert!(pick_from("case", Path::new("x.csv"), &files, &mut io::Cursor::new(""), &mut out).is_err());
    }

    #[test]
    fn validate_rejects_non_csv() {
        let (dir, _) = fixture();
        assert!(validate_csv_path(&dir.path().join("notes.txt")).is_err());
        assert!(validate_csv_path(&dir.path().join("data")).is_err());
        assert!(validate_csv_path(&dir.path().join("missing.csv")).is_err());
    }
}
