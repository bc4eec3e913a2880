//! The report table: one row per account, one column per report month.
//!
//! Rows are keyed by their first identity cell and stay in first-seen
//! order. Period columns stay in first-seen order too, so a sheet grows
//! rightward month after month. Writing an existing cell overwrites it,
//! which is what makes reruns idempotent.

use std::collections::HashMap;

/// One row: immutable identity cells plus amounts keyed by period label.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    identity: Vec<String>,
    amounts: HashMap<String, f64>,
}

impl AccountRecord {
    fn new(identity: Vec<String>) -> Self {
        Self {
            identity,
            amounts: HashMap::new(),
        }
    }

    /// The row key (first identity cell).
    #[must_use]
    pub fn key(&self) -> &str {
        self.identity.first().map_or("", String::as_str)
    }

    /// All identity cells in column order.
    #[must_use]
    pub fn identity(&self) -> &[String] {
        &self.identity
    }

    /// The amount stored under a period label, if any.
    #[must_use]
    pub fn amount(&self, label: &str) -> Option<f64> {
        self.amounts.get(label).copied()
    }

    /// Amounts in the order of the given labels, `None` for empty cells.
    #[must_use]
    pub fn amounts_for(&self, labels: &[String]) -> Vec<Option<f64>> {
        labels.iter().map(|label| self.amount(label)).collect()
    }
}

/// Ordered rows and insertion-ordered period columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    identity_headers: Vec<String>,
    period_labels: Vec<String>,
    rows: Vec<AccountRecord>,
}

impl ReportTable {
    /// An empty table with the given identity column headers.
    #[must_use]
    pub fn new(identity_headers: Vec<String>) -> Self {
        Self {
            identity_headers,
            period_labels: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Headers of the identity columns.
    #[must_use]
    pub fn identity_headers(&self) -> &[String] {
        &self.identity_headers
    }

    /// Period labels in column order.
    #[must_use]
    pub fn period_labels(&self) -> &[String] {
        &self.period_labels
    }

    /// Rows in sheet order.
    #[must_use]
    pub fn rows(&self) -> &[AccountRecord] {
        &self.rows
    }

    /// Look up a row by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AccountRecord> {
        self.rows.iter().find(|row| row.key() == key)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a row without touching any amounts, keeping an all-empty row
    /// visible across reruns.
    pub fn ensure_row(&mut self, identity: &[String]) {
        let _ = self.row_index_or_insert(identity);
    }

    /// Set one cell, inserting the row and the column as needed.
    ///
    /// An existing cell under the same key and label is overwritten, never
    /// duplicated. Identity cells of an existing row are left as they are;
    /// the key decides row identity, not the display columns.
    pub fn upsert(&mut self, identity: &[String], label: &str, amount: f64) {
        if !self.period_labels.iter().any(|known| known == label) {
            self.period_labels.push(label.to_string());
        }
        let index = self.row_index_or_insert(identity);
        self.rows[index].amounts.insert(label.to_string(), amount);
    }

    fn row_index_or_insert(&mut self, identity: &[String]) -> usize {
        let key = identity.first().map_or("", String::as_str);
        if let Some(index) = self.rows.iter().position(|row| row.key() == key) {
            return index;
        }
        self.rows
            .push(AccountRecord::new(self.normalized_identity(identity)));
        self.rows.len() - 1
    }

    /// Pad or truncate incoming identity cells to the header width.
    fn normalized_identity(&self, identity: &[String]) -> Vec<String> {
        let mut cells: Vec<String> = identity
            .iter()
            .take(self.identity_headers.len())
            .cloned()
            .collect();
        cells.resize(self.identity_headers.len(), String::new());
        cells
    }
}
