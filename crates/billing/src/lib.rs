//! Billing period resolution and AWS Cost Explorer access.
//!
//! This crate is the data-retrieval half of costbook. It turns a report
//! month into the billing period it covers and fetches blended cost totals
//! for that period, either for whole accounts or broken down by service.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use costbook_billing::period::ReportMonth;
//! use costbook_billing::providers::{BillingClient, CostExplorer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Keys from AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY
//!     let client = CostExplorer::from_env("eu-west-2")?;
//!
//!     // The 2022-05 column holds April's bill
//!     let month = ReportMonth::parse("2022", "05")?;
//!     let total = client.month_total(&month.period()).await?;
//!
//!     println!("{}: {:.2} {}", month.label(), total.amount, total.unit);
//!     Ok(())
//! }
//! ```
//!
//! ## Cross-account access
//!
//! A [`providers::RoleBroker`] assumes `OrganizationAccountAccessRole` in
//! each account before handing out a scoped client, so one set of payer
//! credentials can read every member account's bill:
//!
//! ```rust,ignore
//! use costbook_billing::providers::{AccessKeys, ClientBroker, RoleBroker};
//!
//! let broker = RoleBroker::new(AccessKeys::from_env()?, "eu-west-2")?;
//! let client = broker.client_for("123456789012").await?;
//! ```

pub mod period;
pub mod providers;

pub use period::{BillingPeriod, PeriodError, ReportMonth};
pub use providers::{
    AccessKeys, BillingClient, BillingError, ClientBroker, CostExplorer, PeriodCost,
    ProfileBroker, RoleBroker, ServiceCost,
};
