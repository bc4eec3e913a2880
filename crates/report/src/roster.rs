//! Account roster input.
//!
//! The roster is the operator-maintained CSV listing the accounts a run
//! reports on, in the order their rows should appear on the sheet. The two
//! leading columns are fixed; anything after them is onboarding metadata
//! that gets carried onto new sheet rows untouched.

use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

/// Errors reading the roster file.
#[derive(Error, Debug)]
pub enum RosterError {
    /// The file could not be read or is not valid CSV.
    #[error("invalid roster: {0}")]
    Csv(#[from] csv::Error),

    /// The header row does not start with the fixed columns.
    #[error("roster header must start with 'account_id,account_name', got '{0}'")]
    Header(String),

    /// A data row has no account id.
    #[error("roster row {row} is missing an account id")]
    MissingId { row: usize },
}

/// One onboarded account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterAccount {
    /// 12-digit account id, the row key on the sheet.
    pub id: String,
    /// Human-readable account name.
    pub name: String,
    /// Extra onboarding cells, in header order.
    pub metadata: Vec<String>,
}

impl RosterAccount {
    /// The sheet identity cells for this account: id, name, metadata.
    #[must_use]
    pub fn identity_cells(&self) -> Vec<String> {
        let mut cells = vec![self.id.clone(), self.name.clone()];
        cells.extend(self.metadata.iter().cloned());
        cells
    }
}

/// The ordered roster plus its metadata column headers.
#[derive(Debug, Clone)]
pub struct Roster {
    pub accounts: Vec<RosterAccount>,
    /// Headers of the columns beyond id and name.
    pub metadata_headers: Vec<String>,
}

impl Roster {
    /// Read a roster from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is unreadable, the header is not the
    /// expected shape, or a row is missing its account id.
    pub fn from_path(path: &Path) -> Result<Self, RosterError> {
        debug!(path = %path.display(), "Reading roster");
        Self::from_reader(csv::Reader::from_path(path)?)
    }

    /// Read a roster from any CSV source.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Roster::from_path`].
    pub fn from_csv(source: impl io::Read) -> Result<Self, RosterError> {
        Self::from_reader(csv::Reader::from_reader(source))
    }

    fn from_reader<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self, RosterError> {
        let headers = reader.headers()?.clone();
        if headers.get(0) != Some("account_id") || headers.get(1) != Some("account_name") {
            let joined: Vec<&str> = headers.iter().collect();
            return Err(RosterError::Header(joined.join(",")));
        }
        let metadata_headers: Vec<String> = headers.iter().skip(2).map(String::from).collect();

        let mut accounts = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let id = record.get(0).unwrap_or("").trim().to_string();
            if id.is_empty() {
                // +2: one for the header row, one for zero-based enumerate
                return Err(RosterError::MissingId { row: index + 2 });
            }
            accounts.push(RosterAccount {
                id,
                name: record.get(1).unwrap_or("").trim().to_string(),
                metadata: record
                    .iter()
                    .skip(2)
                    .map(|cell| cell.trim().to_string())
                    .collect(),
            });
        }

        debug!(accounts = accounts.len(), "Roster loaded");
        Ok(Self {
            accounts,
            metadata_headers,
        })
    }

    /// Identity column headers a fresh sheet should carry for this roster.
    #[must_use]
    pub fn identity_headers(&self) -> Vec<String> {
        let mut headers = vec!["account_id".to_string(), "account_name".to_string()];
        headers.extend(self.metadata_headers.iter().cloned());
        headers
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_roster_preserves_order_and_metadata() {
        let csv = "account_id,account_name,owner\n\
                   222,staging,platform\n\
                   111,prod,payments\n";
        let roster = Roster::from_csv(csv.as_bytes()).unwrap();

        assert_eq!(roster.metadata_headers, ["owner".to_string()]);
        assert_eq!(roster.accounts.len(), 2);
        assert_eq!(roster.accounts[0].id, "222");
        assert_eq!(roster.accounts[0].metadata, ["platform".to_string()]);
        assert_eq!(roster.accounts[1].name, "prod");
        assert_eq!(
            roster.identity_headers(),
            ["account_id", "account_name", "owner"]
        );
    }

    #[test]
    fn test_roster_rejects_wrong_header() {
        let csv = "id,name\n111,prod\n";
        let error = Roster::from_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, RosterError::Header(_)));
    }

    #[test]
    fn test_roster_rejects_missing_id() {
        let csv = "account_id,account_name\n111,prod\n,orphan\n";
        let error = Roster::from_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(error, RosterError::MissingId { row: 3 }));
    }

    #[test]
    fn test_roster_trims_whitespace() {
        let csv = "account_id,account_name\n 111 , prod \n";
        let roster = Roster::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(roster.accounts[0].id, "111");
        assert_eq!(roster.accounts[0].name, "prod");
    }

    #[test]
    fn test_roster_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "account_id,account_name").unwrap();
        writeln!(file, "111,prod").unwrap();

        let roster = Roster::from_path(&path).unwrap();
        assert_eq!(roster.accounts[0].identity_cells(), ["111", "prod"]);
    }
}
