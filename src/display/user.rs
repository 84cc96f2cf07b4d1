//! User display formatting

use crate::models::{Account, User};
use crate::services::Registration;

use super::{account::format_account_list, build_table};

pub fn format_user_list(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.".to_string();
    }

    let rows = users.iter().map(|u| {
        vec![
            u.username.clone(),
            u.full_name(),
            u.email.clone(),
            if u.is_active { "yes" } else { "no" }.to_string(),
            u.created_at.format("%Y-%m-%d").to_string(),
        ]
    });

    build_table(&["Username", "Name", "Email", "Active", "Joined"], rows, &[])
}

/// Format a user with their accounts
pub fn format_user_details(user: &User, accounts: &[Account]) -> String {
    let mut output = String::new();

    output.push_str(&format!("User: {}\n", user.full_name()));
    output.push_str(&format!("  Username: {}\n", user.username));
    output.push_str(&format!("  Email:    {}\n", user.email));
    output.push_str(&format!("  ID:       {}\n", user.id));
    output.push_str(&format!(
        "  Joined:   {}\n",
        user.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push('\n');
    output.push_str(&format_account_list(accounts));
    output.push('\n');

    output
}

pub fn format_registration(registration: &Registration) -> String {
    format!(
        "Registered {} ({})\n{}\n",
        registration.user.full_name(),
        registration.user.username,
        format_account_list(&registration.accounts)
    )
}
