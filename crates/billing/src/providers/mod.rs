//! Billing provider implementations.
//!
//! This module provides:
//!
//! - AWS Cost Explorer - monthly blended cost retrieval
//! - STS role assumption for cross-account access

pub mod aws;
mod traits;

pub use aws::{AccessKeys, CostExplorer, ProfileBroker, RoleBroker, DEFAULT_ROLE_NAME};
pub use traits::{BillingClient, BillingError, ClientBroker, PeriodCost, ServiceCost};
