//! Transaction display formatting
//!
//! Ledger listings, single-entry details and the reconciliation report.

use crate::models::{AccountNumber, Transaction};
use crate::services::ReconciliationReport;
use crate::storage::Page;

use super::{build_table, truncate};

const DESCRIPTION_WIDTH: usize = 32;

fn masked(number: &Option<AccountNumber>) -> String {
    number
        .as_ref()
        .map(AccountNumber::masked)
        .unwrap_or_else(|| "-".to_string())
}

/// Format ledger entries as a table, in the order given
pub fn format_transaction_list(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return "No transactions found.".to_string();
    }

    let rows = transactions.iter().map(|t| {
        vec![
            t.created_at.format("%Y-%m-%d %H:%M").to_string(),
            t.reference.clone(),
            t.transaction_type.to_string(),
            masked(&t.from_account),
            masked(&t.to_account),
            t.amount.to_string(),
            t.status.to_string(),
            truncate(&t.description, DESCRIPTION_WIDTH),
        ]
    });

    build_table(
        &[
            "Date",
            "Reference",
            "Type",
            "From",
            "To",
            "Amount",
            "Status",
            "Description",
        ],
        rows,
        &[5],
    )
}

/// Format one page of history with a page footer
pub fn format_transaction_page(page: &Page<Transaction>) -> String {
    let mut output = format_transaction_list(&page.items);
    if page.total > 0 {
        output.push_str(&format!(
            "\nPage {} of {} ({} transactions)",
            page.page,
            page.total_pages(),
            page.total
        ));
        if page.has_next() {
            output.push_str(&format!(" - next: --page {}", page.page + 1));
        }
        output.push('\n');
    }
    output
}

pub fn format_transaction_details(txn: &Transaction) -> String {
    let mut output = String::new();

    output.push_str(&format!("Transaction {}\n", txn.reference));
    output.push_str(&format!("  Type:        {}\n", txn.transaction_type));
    output.push_str(&format!("  Status:      {}\n", txn.status));
    output.push_str(&format!("  Amount:      {}\n", txn.amount));
    if let Some(from) = &txn.from_account {
        output.push_str(&format!("  From:        {}\n", from));
    }
    if let Some(to) = &txn.to_account {
        output.push_str(&format!("  To:          {}\n", to));
    }
    output.push_str(&format!("  Description: {}\n", txn.description));
    output.push_str(&format!(
        "  Created:     {}\n",
        txn.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

/// Format the result of replaying the ledger
pub fn format_reconciliation(report: &ReconciliationReport) -> String {
    let mut output = format!(
        "Checked {} accounts against {} completed transactions.\n",
        report.accounts_checked, report.transactions_replayed
    );

    if report.is_balanced() {
        output.push_str("All balances reconcile with the ledger.\n");
    } else {
        let rows = report.mismatches.iter().map(|m| {
            vec![
                m.account_number.to_string(),
                m.stored.to_string(),
                m.replayed.to_string(),
                (m.stored - m.replayed).to_string(),
            ]
        });
        output.push_str(&format!(
            "{} account(s) do not reconcile:\n",
            report.mismatches.len()
        ));
        output.push_str(&build_table(
            &["Account", "Stored", "Ledger", "Difference"],
            rows,
            &[1, 2, 3],
        ));
        output.push('\n');
    }

    if !report.unknown_accounts.is_empty() {
        output.push_str(&format!(
            "{} closed or deleted account(s) appear in the ledger.\n",
            report.unknown_accounts.len()
        ));
    }

    output
}
