//! Run orchestration: fetch, merge, commit, annotate, report.
//!
//! Failure handling follows one rule throughout: configuration and
//! persistence faults abort the run with an error, per-account billing
//! faults never do.

use std::path::Path;

use anyhow::{Context, Result};
use costbook_billing::period::{BillingPeriod, ReportMonth};
use costbook_billing::providers::{BillingClient, ClientBroker, PeriodCost, ServiceCost};
use tracing::{info, warn};

use crate::config;
use crate::console;
use crate::fetch::{self, PeriodUpdate};
use crate::merge;
use crate::roster::Roster;
use crate::store::{self, WorkbookStore};

/// Sheet name for a workbook run: the project when given, otherwise the
/// report year.
fn sheet_name(month: &ReportMonth, project: Option<&str>) -> Result<String> {
    let name = match project {
        Some(project) => project.to_string(),
        None => format!("{:04}", month.year()),
    };
    config::validate_sheet_name(&name)?;
    Ok(name)
}

/// The monthly workbook run: fetch every roster account, merge into the
/// sheet, commit, annotate.
///
/// Accounts that fail are reported in the returned update and on the
/// console; the run still completes cleanly. A fully-failed batch still
/// goes through the same commit cycle, it just adds no column values.
pub async fn run_month(
    broker: &dyn ClientBroker,
    roster: &Roster,
    month: &ReportMonth,
    workbook: &Path,
    project: Option<&str>,
) -> Result<PeriodUpdate> {
    let sheet = sheet_name(month, project)?;
    store::check_workbook_dir(workbook)?;
    let store = WorkbookStore::new(workbook);

    let mut table = store
        .load(&sheet, &roster.identity_headers())
        .with_context(|| format!("failed to load sheet '{sheet}'"))?;

    let update = fetch::fetch_month(broker, &roster.accounts, month).await;
    if update.is_empty() {
        warn!(label = %update.label, "No account produced a value this run");
    }

    merge::merge_update(&mut table, &update);
    store
        .commit(&sheet, &table)
        .with_context(|| format!("failed to commit sheet '{sheet}'"))?;

    // presentation only, never fails the run
    if let Err(error) = store.annotate(&sheet, &table) {
        warn!(sheet = %sheet, error = %error, "Trend annotation failed");
    }

    console::print_sheet(&table);
    console::print_run_summary(&update);
    Ok(update)
}

/// Ad-hoc span report: monthly buckets for an explicit date range, printed
/// as the Start / End / Total table. Nothing is persisted.
pub async fn run_span(
    client: &dyn BillingClient,
    period: &BillingPeriod,
) -> Result<Vec<PeriodCost>> {
    info!(period = %period, "Fetching span totals");
    let buckets = client
        .blended_costs(period)
        .await
        .context("failed to fetch span totals")?;
    console::print_periods(&buckets);
    Ok(buckets)
}

/// Per-service breakdown for one report month.
///
/// Always printed; merged into the project's sheet with the same upsert
/// semantics as the account path when a workbook is given.
pub async fn run_services(
    client: &dyn BillingClient,
    month: &ReportMonth,
    project: &str,
    workbook: Option<&Path>,
) -> Result<Vec<ServiceCost>> {
    config::validate_sheet_name(project)?;
    let period = month.period();
    info!(label = %month.label(), period = %period, project, "Fetching service breakdown");

    let costs = client
        .blended_costs_by_service(&period)
        .await
        .context("failed to fetch service breakdown")?;
    console::print_services(&month.label(), &costs);

    if let Some(dir) = workbook {
        store::check_workbook_dir(dir)?;
        let store = WorkbookStore::new(dir);
        let mut table = store
            .load(project, &["service".to_string()])
            .with_context(|| format!("failed to load sheet '{project}'"))?;
        merge::merge_services(&mut table, &month.label(), &costs);
        store
            .commit(project, &table)
            .with_context(|| format!("failed to commit sheet '{project}'"))?;
        if let Err(error) = store.annotate(project, &table) {
            warn!(sheet = %project, error = %error, "Trend annotation failed");
        }
    }

    Ok(costs)
}
