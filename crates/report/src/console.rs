//! Console rendering of run results.
//!
//! Everything here is presentation: tables for humans watching the run,
//! never an input to any later stage.

use comfy_table::{presets::UTF8_FULL, Table};
use costbook_billing::providers::{PeriodCost, ServiceCost};

use crate::fetch::PeriodUpdate;
use crate::table::ReportTable;
use crate::trend;

/// Print a committed sheet, trend sparkline in the last column.
pub fn print_sheet(report: &ReportTable) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    let mut header: Vec<String> = report
        .identity_headers()
        .iter()
        .map(|name| name.to_uppercase())
        .collect();
    header.extend(report.period_labels().iter().cloned());
    header.push("TREND".to_string());
    table.set_header(header);

    let trends = trend::row_trends(report);
    for (index, row) in report.rows().iter().enumerate() {
        let mut cells: Vec<String> = row.identity().to_vec();
        for label in report.period_labels() {
            cells.push(
                row.amount(label)
                    .map_or_else(String::new, |amount| format!("{amount:.2}")),
            );
        }
        cells.push(trends.get(index).cloned().unwrap_or_default());
        table.add_row(cells);
    }

    println!("{table}");
}

/// Print what one period's batch fetched and what it skipped.
pub fn print_run_summary(update: &PeriodUpdate) {
    println!(
        "Period {} covers {}: fetched {}, skipped {}",
        update.label,
        update.period,
        update.entries.len(),
        update.failures.len()
    );
    for failure in &update.failures {
        println!(
            "  skipped {} ({}): {}",
            failure.account.id, failure.account.name, failure.reason
        );
    }
}

/// Print monthly buckets as the Start / End / Total table.
pub fn print_periods(buckets: &[PeriodCost]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["START", "END", "TOTAL"]);

    for bucket in buckets {
        let mut total = format!("{:.2} {}", bucket.amount, bucket.unit);
        if bucket.estimated {
            total.push_str(" (estimated)");
        }
        table.add_row([
            bucket.period.start.to_string(),
            bucket.period.end.to_string(),
            total,
        ]);
    }

    println!("{table}");
}

/// Print a per-service breakdown with its total.
pub fn print_services(label: &str, costs: &[ServiceCost]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["SERVICE", "AMOUNT", "UNIT"]);

    for cost in costs {
        table.add_row([
            cost.service.clone(),
            format!("{:.2}", cost.amount),
            cost.unit.clone(),
        ]);
    }

    let total: f64 = costs.iter().map(|cost| cost.amount).sum();
    println!("{table}");
    println!("{label} total: {total:.2}");
}
