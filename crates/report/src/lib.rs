//! Monthly cloud cost report workbook.
//!
//! This crate turns blended billing totals into a historical CSV workbook:
//! one sheet per report year (or per project), one row per account, one
//! column per report month. Reruns overwrite cells in place, every commit
//! rotates a one-deep backup, and a trend sparkline column is rebuilt
//! after each write.
//!
//! The `costbook` binary wires these pieces to the AWS Cost Explorer
//! clients from `costbook-billing`; the library itself only sees the
//! [`costbook_billing::providers::ClientBroker`] and
//! [`costbook_billing::providers::BillingClient`] traits, which is what
//! the tests swap out.

pub mod config;
pub mod console;
pub mod fetch;
pub mod merge;
pub mod roster;
pub mod run;
pub mod store;
pub mod table;
pub mod trend;

pub use config::{AccessMode, RunConfig};
pub use fetch::PeriodUpdate;
pub use roster::Roster;
pub use store::WorkbookStore;
pub use table::ReportTable;
