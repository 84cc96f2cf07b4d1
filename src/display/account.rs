//! Account display formatting
//!
//! Formats accounts for terminal output in table and detail views.

use crate::models::{Account, Money};
use crate::services::OwnerSummary;

use super::build_table;

/// Format a list of accounts as a table with a total row
pub fn format_account_list(accounts: &[Account]) -> String {
    if accounts.is_empty() {
        return "No accounts found.".to_string();
    }

    let total: Money = accounts.iter().map(|a| a.balance).sum();

    let rows = accounts
        .iter()
        .map(|a| {
            vec![
                a.account_number.to_string(),
                a.name.clone(),
                a.account_type.to_string(),
                a.status.to_string(),
                a.balance.to_string(),
                a.currency.to_string(),
            ]
        })
        .chain(std::iter::once(vec![
            "TOTAL".to_string(),
            String::new(),
            String::new(),
            String::new(),
            total.to_string(),
            String::new(),
        ]));

    build_table(
        &["Number", "Name", "Type", "Status", "Balance", "Currency"],
        rows,
        &[4],
    )
}

/// Format a single account's details
pub fn format_account_details(account: &Account) -> String {
    let mut output = String::new();

    output.push_str(&format!("Account: {}\n", account.name));
    output.push_str(&format!("  Number:   {}\n", account.account_number));
    output.push_str(&format!("  Type:     {}\n", account.account_type));
    output.push_str(&format!("  Status:   {}\n", account.status));
    output.push_str(&format!("  ID:       {}\n", account.id));
    output.push('\n');
    output.push_str(&format!(
        "  Balance:  {} {}\n",
        account.balance, account.currency
    ));
    output.push('\n');
    output.push_str(&format!(
        "  Created:  {}\n",
        account.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        account.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

pub fn format_owner_summary(summary: &OwnerSummary) -> String {
    let mut output = String::new();

    output.push_str("Financial Summary\n");
    output.push_str(&format!(
        "  Accounts:          {} ({} active)\n",
        summary.total_accounts, summary.active_accounts
    ));
    output.push_str(&format!("  Total Balance:     {}\n", summary.total_balance));
    output.push_str(&format!("  30-day Income:     {}\n", summary.monthly_income));
    output.push_str(&format!(
        "  30-day Spending:   {}\n",
        summary.monthly_spending
    ));
    output.push_str(&format!("  Savings Rate:      {:.1}%\n", summary.savings_rate));
    output.push_str(&format!("  Account Health:    {}\n", summary.health));

    output
}
