//! Billing client traits and common types.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::period::BillingPeriod;

/// Errors that can occur during billing operations
#[derive(Error, Debug)]
pub enum BillingError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Credentials were rejected or lack permission
    #[error("access denied: {0}")]
    Auth(String),

    /// The API throttled the request
    #[error("request throttled: {0}")]
    Throttled(String),

    /// The API rejected the request as invalid
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API answered with a body this client cannot use
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The API returned no cost buckets for the period
    #[error("no results returned for period {0}")]
    EmptyResults(BillingPeriod),
}

/// One monthly blended-cost bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodCost {
    /// The bucket's date range
    pub period: BillingPeriod,
    /// Blended cost total, rounded to two decimal places
    pub amount: f64,
    /// Currency unit as reported by the API (e.g., "USD")
    pub unit: String,
    /// Whether the API marked the bucket as an estimate
    pub estimated: bool,
}

/// Blended cost of one service within one bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCost {
    /// Service name as reported by the API
    pub service: String,
    /// Blended cost, rounded to two decimal places
    pub amount: f64,
    /// Currency unit as reported by the API
    pub unit: String,
    /// The bucket's date range
    pub period: BillingPeriod,
}

/// Trait for billing API clients scoped to one credential context
#[async_trait]
pub trait BillingClient: Send + Sync + std::fmt::Debug {
    /// Client name for logging (e.g., "aws-cost-explorer")
    fn name(&self) -> &str;

    /// Blended cost totals, one bucket per month in the period
    async fn blended_costs(&self, period: &BillingPeriod)
        -> Result<Vec<PeriodCost>, BillingError>;

    /// Blended cost totals broken down by service
    async fn blended_costs_by_service(
        &self,
        period: &BillingPeriod,
    ) -> Result<Vec<ServiceCost>, BillingError>;

    /// The single blended total of a one-month period
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::EmptyResults`] when the API answers with no
    /// buckets at all, so callers never mistake an absent bill for zero.
    async fn month_total(&self, period: &BillingPeriod) -> Result<PeriodCost, BillingError> {
        let mut buckets = self.blended_costs(period).await?;
        if buckets.is_empty() {
            return Err(BillingError::EmptyResults(*period));
        }
        Ok(buckets.remove(0))
    }
}

/// Hands out billing clients scoped to individual accounts
///
/// Implementations decide how an account id maps to credentials: a shared
/// profile context, or a freshly assumed per-account role.
#[async_trait]
pub trait ClientBroker: Send + Sync {
    /// A billing client authorized for the given account
    async fn client_for(&self, account_id: &str) -> Result<Arc<dyn BillingClient>, BillingError>;
}
