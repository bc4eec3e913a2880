//! Per-account batch fetch with failure isolation.
//!
//! One account failing its credential exchange or its billing query must
//! not take the rest of the batch down with it. Failed accounts are
//! logged, collected for the run summary, and skipped; nothing is recorded
//! for them, not even a zero.

use costbook_billing::period::{BillingPeriod, ReportMonth};
use costbook_billing::providers::{BillingError, ClientBroker};
use tracing::{info, warn};

use crate::roster::RosterAccount;

/// Successfully fetched amount for one account.
#[derive(Debug, Clone)]
pub struct AccountCost {
    pub account: RosterAccount,
    /// Blended total for the period, rounded to two decimal places.
    pub amount: f64,
}

/// An account skipped this run, with the rendered reason.
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub account: RosterAccount,
    pub reason: String,
}

/// The outcome of one period's batch.
#[derive(Debug, Clone)]
pub struct PeriodUpdate {
    /// Column key, `YYYY-MM`.
    pub label: String,
    /// The billed range behind the label.
    pub period: BillingPeriod,
    /// Fetched accounts, in roster order.
    pub entries: Vec<AccountCost>,
    /// Skipped accounts, in roster order.
    pub failures: Vec<FetchFailure>,
}

impl PeriodUpdate {
    /// Whether every account failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetch the month's blended total for every roster account.
///
/// Visits accounts in roster order and never aborts on a single failure;
/// the returned update carries both the fetched entries and the skipped
/// accounts.
pub async fn fetch_month(
    broker: &dyn ClientBroker,
    accounts: &[RosterAccount],
    month: &ReportMonth,
) -> PeriodUpdate {
    let period = month.period();
    let label = month.label();
    info!(
        label = %label,
        period = %period,
        accounts = accounts.len(),
        "Fetching blended costs"
    );

    let mut update = PeriodUpdate {
        label,
        period,
        entries: Vec::new(),
        failures: Vec::new(),
    };

    for account in accounts {
        match fetch_one(broker, account, &period).await {
            Ok(amount) => {
                info!(
                    account = %account.id,
                    name = %account.name,
                    amount,
                    "Fetched blended cost"
                );
                update.entries.push(AccountCost {
                    account: account.clone(),
                    amount,
                });
            }
            Err(error) => {
                warn!(
                    account = %account.id,
                    name = %account.name,
                    error = %error,
                    "Skipping account"
                );
                update.failures.push(FetchFailure {
                    account: account.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    update
}

async fn fetch_one(
    broker: &dyn ClientBroker,
    account: &RosterAccount,
    period: &BillingPeriod,
) -> Result<f64, BillingError> {
    let client = broker.client_for(&account.id).await?;
    let total = client.month_total(period).await?;
    Ok(total.amount)
}
