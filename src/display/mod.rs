//! Display formatting for terminal output
//!
//! Lists are rendered as `tabled` tables; single entities as aligned
//! label/value blocks.

pub mod account;
pub mod transaction;
pub mod user;

pub use account::{format_account_details, format_account_list, format_owner_summary};
pub use transaction::{
    format_reconciliation, format_transaction_details, format_transaction_list,
    format_transaction_page,
};
pub use user::{format_registration, format_user_details, format_user_list};

use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Style};

/// Build a table with a header row, right-aligning the given columns
pub(crate) fn build_table<I>(header: &[&str], rows: I, right_aligned: &[usize]) -> String
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut builder = Builder::default();
    builder.push_record(header.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::sharp());
    for column in right_aligned {
        table.modify(Columns::single(*column), Alignment::right());
    }
    table.to_string()
}

/// Shorten text to `max` characters, marking the cut with "..."
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
