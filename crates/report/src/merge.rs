//! Column-wise merge of fetch results into the report table.
//!
//! A merge is an upsert keyed on account id and period label. Rerunning a
//! month replaces that month's cells in place; it never appends duplicate
//! columns or rows, and it never touches cells outside the fetched batch.
//! Accounts that failed this run keep whatever their cells already held.

use costbook_billing::providers::ServiceCost;
use tracing::debug;

use crate::fetch::PeriodUpdate;
use crate::table::ReportTable;

/// Apply one period's account batch to the table.
///
/// New accounts are appended below the existing rows, in batch (roster)
/// order.
pub fn merge_update(table: &mut ReportTable, update: &PeriodUpdate) {
    for entry in &update.entries {
        table.upsert(&entry.account.identity_cells(), &update.label, entry.amount);
    }
    debug!(
        label = %update.label,
        merged = update.entries.len(),
        skipped = update.failures.len(),
        "Merged period column"
    );
}

/// Apply a per-service breakdown to a service table.
///
/// Rows are keyed by service name; the same overwrite rules apply.
pub fn merge_services(table: &mut ReportTable, label: &str, services: &[ServiceCost]) {
    for cost in services {
        table.upsert(&[cost.service.clone()], label, cost.amount);
    }
    debug!(label = %label, merged = services.len(), "Merged service column");
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use costbook_billing::period::{BillingPeriod, ReportMonth};

    use super::*;
    use crate::fetch::AccountCost;
    use crate::roster::RosterAccount;

    fn account(id: &str, name: &str) -> RosterAccount {
        RosterAccount {
            id: id.to_string(),
            name: name.to_string(),
            metadata: Vec::new(),
        }
    }

    fn update_for(month: &str, entries: Vec<(&str, &str, f64)>) -> PeriodUpdate {
        let month = ReportMonth::from_label(month).unwrap();
        PeriodUpdate {
            label: month.label(),
            period: month.period(),
            entries: entries
                .into_iter()
                .map(|(id, name, amount)| AccountCost {
                    account: account(id, name),
                    amount,
                })
                .collect(),
            failures: Vec::new(),
        }
    }

    fn headers() -> Vec<String> {
        vec!["account_id".to_string(), "account_name".to_string()]
    }

    #[test]
    fn test_rerun_overwrites_cells_in_place() {
        let mut table = ReportTable::new(headers());
        merge_update(&mut table, &update_for("2022-05", vec![("111", "prod", 100.0)]));
        merge_update(&mut table, &update_for("2022-05", vec![("111", "prod", 99.5)]));

        assert_eq!(table.period_labels(), ["2022-05".to_string()]);
        assert_eq!(table.get("111").unwrap().amount("2022-05"), Some(99.5));
    }

    #[test]
    fn test_skipped_account_keeps_prior_cells() {
        let mut table = ReportTable::new(headers());
        merge_update(
            &mut table,
            &update_for("2022-04", vec![("111", "prod", 90.0), ("222", "staging", 9.0)]),
        );
        // 222 failed in May; it simply is not part of the batch
        merge_update(&mut table, &update_for("2022-05", vec![("111", "prod", 100.0)]));

        let staging = table.get("222").unwrap();
        assert_eq!(staging.amount("2022-04"), Some(9.0));
        assert_eq!(staging.amount("2022-05"), None);
    }

    #[test]
    fn test_new_account_appended_below() {
        let mut table = ReportTable::new(headers());
        merge_update(&mut table, &update_for("2022-04", vec![("111", "prod", 90.0)]));
        merge_update(
            &mut table,
            &update_for("2022-05", vec![("111", "prod", 100.0), ("444", "sandbox", 1.0)]),
        );

        let keys: Vec<&str> = table.rows().iter().map(|row| row.key()).collect();
        assert_eq!(keys, ["111", "444"]);
        assert_eq!(table.get("444").unwrap().amount("2022-04"), None);
    }

    #[test]
    fn test_metadata_lands_in_identity_cells() {
        let mut table = ReportTable::new(vec![
            "account_id".to_string(),
            "account_name".to_string(),
            "owner".to_string(),
        ]);
        let mut update = update_for("2022-05", vec![("111", "prod", 10.0)]);
        update.entries[0].account.metadata = vec!["payments".to_string()];

        merge_update(&mut table, &update);

        let row = table.get("111").unwrap();
        assert_eq!(row.identity(), ["111", "prod", "payments"]);
    }

    #[test]
    fn test_service_rows_keyed_by_name() {
        let period = BillingPeriod {
            start: NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
        };
        let costs = vec![
            ServiceCost {
                service: "Amazon S3".to_string(),
                amount: 12.4,
                unit: "USD".to_string(),
                period,
            },
            ServiceCost {
                service: "AWS Lambda".to_string(),
                amount: 3.1,
                unit: "USD".to_string(),
                period,
            },
        ];

        let mut table = ReportTable::new(vec!["service".to_string()]);
        merge_services(&mut table, "2022-05", &costs);
        merge_services(&mut table, "2022-05", &costs);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Amazon S3").unwrap().amount("2022-05"), Some(12.4));
    }
}
