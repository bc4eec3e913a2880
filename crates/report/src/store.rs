//! Workbook persistence: a directory of CSV sheets.
//!
//! Each report is one `<sheet>.csv` inside the workbook directory. A commit
//! writes the merged table to `<sheet>.csv.tmp`, moves the live sheet to
//! the single `<sheet>.csv.bak` slot, then renames the temp file into
//! place. Readers of the live path therefore see the old sheet or the new
//! one, never a half-written file, and the previous version survives one
//! run as the backup.

use std::fs;
use std::path::{Path, PathBuf};

use costbook_billing::period::ReportMonth;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::table::ReportTable;
use crate::trend;

/// Column header reserved for the trend sparkline.
pub const TREND_HEADER: &str = "trend";

/// Errors from workbook persistence.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("workbook I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sheet is not readable CSV.
    #[error("unreadable sheet: {0}")]
    Csv(#[from] csv::Error),

    /// The sheet parsed as CSV but not as a report.
    #[error("sheet '{sheet}' is malformed: {reason}")]
    Malformed { sheet: String, reason: String },

    /// The table could not be rendered back to CSV.
    #[error("failed to render sheet: {0}")]
    Render(String),
}

/// A workbook directory of report sheets.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    dir: PathBuf,
}

impl WorkbookStore {
    /// Open a workbook rooted at `dir`. The directory is created on the
    /// first commit.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a sheet's live CSV file.
    #[must_use]
    pub fn sheet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv"))
    }

    /// Path of a sheet's single backup slot.
    #[must_use]
    pub fn backup_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv.bak"))
    }

    fn tmp_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.csv.tmp"))
    }

    /// Load a sheet, or start a fresh table when none exists yet.
    ///
    /// A trailing trend column is dropped here; it is presentation only
    /// and gets rebuilt after the next commit.
    ///
    /// # Errors
    ///
    /// Returns an error when the sheet exists but cannot be read as a
    /// report: unreadable CSV, a non-numeric amount cell, or columns in an
    /// order the writer would never produce.
    pub fn load(&self, name: &str, default_identity: &[String]) -> Result<ReportTable, StoreError> {
        let path = self.sheet_path(name);
        if !path.exists() {
            debug!(sheet = %name, "No existing sheet, starting fresh");
            return Ok(ReportTable::new(default_identity.to_vec()));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();

        let mut identity_headers: Vec<String> = Vec::new();
        let mut period_columns: Vec<(usize, String)> = Vec::new();
        let mut saw_trend = false;
        for (index, header) in headers.iter().enumerate() {
            if ReportMonth::from_label(header).is_ok() {
                if saw_trend {
                    return Err(self.malformed(name, "period column after trend column"));
                }
                period_columns.push((index, header.to_string()));
            } else if header == TREND_HEADER && !period_columns.is_empty() && !saw_trend {
                saw_trend = true;
            } else if period_columns.is_empty() && !saw_trend {
                identity_headers.push(header.to_string());
            } else {
                return Err(self.malformed(
                    name,
                    &format!("unexpected column '{header}' after period columns"),
                ));
            }
        }
        if identity_headers.is_empty() {
            return Err(self.malformed(name, "no identity columns"));
        }

        let identity_len = identity_headers.len();
        let mut table = ReportTable::new(identity_headers);
        for record in reader.records() {
            let record = record?;
            let identity: Vec<String> = (0..identity_len)
                .map(|index| record.get(index).unwrap_or("").to_string())
                .collect();
            table.ensure_row(&identity);
            for (index, label) in &period_columns {
                let cell = record.get(*index).unwrap_or("").trim();
                if cell.is_empty() {
                    continue;
                }
                let amount: f64 = cell.parse().map_err(|_| {
                    self.malformed(name, &format!("cell '{cell}' under '{label}' is not a number"))
                })?;
                table.upsert(&identity, label, amount);
            }
        }

        debug!(sheet = %name, rows = table.len(), periods = table.period_labels().len(), "Sheet loaded");
        Ok(table)
    }

    /// Commit a sheet: temp write, rotate the backup slot, atomic swap.
    ///
    /// # Errors
    ///
    /// Returns an error when any filesystem step fails. If the final swap
    /// fails after the live sheet was moved aside, the backup is moved
    /// back so the live path is not left empty.
    pub fn commit(&self, name: &str, table: &ReportTable) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.sheet_path(name);
        let tmp = self.tmp_path(name);
        let bak = self.backup_path(name);

        let bytes = render_csv(table, None)?;
        fs::write(&tmp, &bytes)?;

        let had_previous = path.exists();
        if had_previous {
            // single slot: the stale backup goes away first
            let _ = fs::remove_file(&bak);
            if let Err(error) = fs::rename(&path, &bak) {
                let _ = fs::remove_file(&tmp);
                return Err(StoreError::Io(error));
            }
        }

        if let Err(error) = fs::rename(&tmp, &path) {
            if had_previous {
                let restored = fs::rename(&bak, &path).is_ok();
                warn!(sheet = %name, error = %error, restored, "Sheet swap failed");
            }
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io(error));
        }

        info!(
            sheet = %name,
            rows = table.len(),
            periods = table.period_labels().len(),
            path = %path.display(),
            "Sheet committed"
        );
        Ok(())
    }

    /// Rewrite the committed sheet with a trailing trend column.
    ///
    /// A table with no period columns is left as committed: the trend
    /// header may only ever follow period columns, or `load` would read
    /// it back as an identity column.
    ///
    /// Uses temp write plus rename only; the backup slot from the commit
    /// stays untouched, so a failure here can always be recovered from.
    ///
    /// # Errors
    ///
    /// Returns an error when rendering or the rewrite fails. Callers treat
    /// this as non-fatal: the committed data sheet is already in place.
    pub fn annotate(&self, name: &str, table: &ReportTable) -> Result<(), StoreError> {
        if table.period_labels().is_empty() {
            debug!(sheet = %name, "No period columns, skipping trend annotation");
            return Ok(());
        }
        let tmp = self.tmp_path(name);
        let trends = trend::row_trends(table);
        let bytes = render_csv(table, Some(&trends))?;
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, self.sheet_path(name))?;
        debug!(sheet = %name, "Trend column annotated");
        Ok(())
    }

    fn malformed(&self, sheet: &str, reason: &str) -> StoreError {
        StoreError::Malformed {
            sheet: sheet.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Render a table to CSV bytes, amounts always with two decimals.
fn render_csv(table: &ReportTable, trends: Option<&[String]>) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = table.identity_headers().to_vec();
    header.extend(table.period_labels().iter().cloned());
    if trends.is_some() {
        header.push(TREND_HEADER.to_string());
    }
    writer.write_record(&header)?;

    for (index, row) in table.rows().iter().enumerate() {
        let mut record: Vec<String> = row.identity().to_vec();
        for label in table.period_labels() {
            record.push(
                row.amount(label)
                    .map_or_else(String::new, |amount| format!("{amount:.2}")),
            );
        }
        if let Some(trends) = trends {
            record.push(trends.get(index).cloned().unwrap_or_default());
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|error| StoreError::Render(error.to_string()))
}

/// Verify a directory is usable as a workbook before fetching anything.
///
/// # Errors
///
/// Returns an error when the path exists but is not a directory.
pub fn check_workbook_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() && !dir.is_dir() {
        return Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::NotADirectory,
            format!("workbook path {} is not a directory", dir.display()),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Vec<String> {
        vec!["account_id".to_string(), "account_name".to_string()]
    }

    fn sample_table() -> ReportTable {
        let mut table = ReportTable::new(headers());
        table.upsert(
            &["111".to_string(), "prod".to_string()],
            "2022-04",
            90.0,
        );
        table.upsert(
            &["111".to_string(), "prod".to_string()],
            "2022-05",
            1234.57,
        );
        table.upsert(
            &["222".to_string(), "staging".to_string()],
            "2022-05",
            10.5,
        );
        table
    }

    #[test]
    fn test_commit_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        store.commit("2022", &sample_table()).unwrap();
        let loaded = store.load("2022", &headers()).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.period_labels(), ["2022-04".to_string(), "2022-05".to_string()]);
        assert_eq!(loaded.get("111").unwrap().amount("2022-05"), Some(1234.57));
        // 222 has no April column value
        assert_eq!(loaded.get("222").unwrap().amount("2022-04"), None);
    }

    #[test]
    fn test_amounts_render_with_two_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        let mut table = ReportTable::new(headers());
        table.upsert(&["111".to_string(), "prod".to_string()], "2022-05", 99.0);

        store.commit("2022", &table).unwrap();

        let raw = fs::read_to_string(store.sheet_path("2022")).unwrap();
        assert!(raw.contains("99.00"));
    }

    #[test]
    fn test_load_missing_sheet_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        let table = store.load("2022", &headers()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.identity_headers(), headers());
    }

    #[test]
    fn test_second_commit_rotates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        let mut first = ReportTable::new(headers());
        first.upsert(&["111".to_string(), "prod".to_string()], "2022-04", 1.0);
        store.commit("2022", &first).unwrap();
        assert!(!store.backup_path("2022").exists());

        let mut second = first.clone();
        second.upsert(&["111".to_string(), "prod".to_string()], "2022-05", 2.0);
        store.commit("2022", &second).unwrap();

        // the backup slot now holds exactly the previous version
        let backup = fs::read_to_string(store.backup_path("2022")).unwrap();
        assert!(backup.contains("2022-04"));
        assert!(!backup.contains("2022-05"));

        let live = fs::read_to_string(store.sheet_path("2022")).unwrap();
        assert!(live.contains("2022-05"));
    }

    #[test]
    fn test_third_commit_replaces_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        for (label, amount) in [("2022-04", 1.0), ("2022-05", 2.0), ("2022-06", 3.0)] {
            let mut table = store.load("2022", &headers()).unwrap();
            table.upsert(&["111".to_string(), "prod".to_string()], label, amount);
            store.commit("2022", &table).unwrap();
        }

        let backup = fs::read_to_string(store.backup_path("2022")).unwrap();
        assert!(backup.contains("2022-05"));
        assert!(!backup.contains("2022-06"));
    }

    #[test]
    fn test_commit_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        store.commit("2022", &sample_table()).unwrap();
        assert!(!dir.path().join("2022.csv.tmp").exists());
    }

    #[test]
    fn test_annotate_appends_trend_and_load_strips_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        let table = sample_table();

        store.commit("2022", &table).unwrap();
        store.annotate("2022", &table).unwrap();

        let raw = fs::read_to_string(store.sheet_path("2022")).unwrap();
        let first_line = raw.lines().next().unwrap();
        assert!(first_line.ends_with(TREND_HEADER));

        let loaded = store.load("2022", &headers()).unwrap();
        assert_eq!(loaded.period_labels(), ["2022-04".to_string(), "2022-05".to_string()]);
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_annotate_leaves_backup_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());

        let mut first = ReportTable::new(headers());
        first.upsert(&["111".to_string(), "prod".to_string()], "2022-04", 1.0);
        store.commit("2022", &first).unwrap();

        let mut second = first.clone();
        second.upsert(&["111".to_string(), "prod".to_string()], "2022-05", 2.0);
        store.commit("2022", &second).unwrap();
        let backup_before = fs::read_to_string(store.backup_path("2022")).unwrap();

        store.annotate("2022", &second).unwrap();
        let backup_after = fs::read_to_string(store.backup_path("2022")).unwrap();
        assert_eq!(backup_before, backup_after);
    }

    #[test]
    fn test_annotate_without_periods_keeps_plain_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        let empty = ReportTable::new(headers());

        store.commit("2022", &empty).unwrap();
        store.annotate("2022", &empty).unwrap();

        // no trend header without period columns to trend over
        let raw = fs::read_to_string(store.sheet_path("2022")).unwrap();
        assert_eq!(raw.trim_end(), "account_id,account_name");

        // a second empty cycle must not grow the header either
        let reloaded = store.load("2022", &headers()).unwrap();
        assert_eq!(reloaded.identity_headers(), headers());
        store.commit("2022", &reloaded).unwrap();
        store.annotate("2022", &reloaded).unwrap();

        let again = store.load("2022", &headers()).unwrap();
        assert_eq!(again.identity_headers(), headers());
        assert!(again.is_empty());
    }

    #[test]
    fn test_non_numeric_cell_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        fs::write(
            store.sheet_path("2022"),
            "account_id,account_name,2022-05\n111,prod,oops\n",
        )
        .unwrap();

        let error = store.load("2022", &headers()).unwrap_err();
        assert!(matches!(error, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_identity_column_after_periods_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        fs::write(
            store.sheet_path("2022"),
            "account_id,2022-05,notes\n111,1.00,hello\n",
        )
        .unwrap();

        let error = store.load("2022", &headers()).unwrap_err();
        assert!(matches!(error, StoreError::Malformed { .. }));
    }

    #[test]
    fn test_row_with_all_empty_cells_survives() {
        let dir = tempfile::tempdir().unwrap();
        let store = WorkbookStore::new(dir.path());
        fs::write(
            store.sheet_path("2022"),
            "account_id,account_name,2022-05\n111,prod,\n",
        )
        .unwrap();

        let loaded = store.load("2022", &headers()).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("111").unwrap().amount("2022-05"), None);

        // and a rewrite keeps the row
        store.commit("2022", &loaded).unwrap();
        let again = store.load("2022", &headers()).unwrap();
        assert_eq!(again.len(), 1);
    }

    #[test]
    fn test_check_workbook_dir_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        assert!(check_workbook_dir(&file).is_err());
        assert!(check_workbook_dir(dir.path()).is_ok());
        assert!(check_workbook_dir(&dir.path().join("missing")).is_ok());
    }
}
