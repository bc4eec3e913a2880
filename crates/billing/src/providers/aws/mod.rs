//! AWS Cost Explorer integration.

mod client;
mod credentials;
mod models;

pub use client::{CostExplorer, ProfileBroker, RoleBroker};
pub use credentials::{role_arn_for_account, AccessKeys, DEFAULT_ROLE_NAME};
