//! User model
//!
//! A bank customer. Users own their accounts exclusively.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::UserId;

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9_]{3,20}$").expect("valid username regex"))
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
    })
}

/// A registered customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    /// Login name, 3-20 characters of letters, digits and underscore
    pub username: String,

    /// Stored lower-cased
    pub email: String,

    pub first_name: String,

    pub last_name: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into().trim().to_string(),
            email: email.into().trim().to_lowercase(),
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Validate the user
    pub fn validate(&self) -> Result<(), UserValidationError> {
        if !username_pattern().is_match(&self.username) {
            return Err(UserValidationError::InvalidUsername(self.username.clone()));
        }

        if !email_pattern().is_match(&self.email) {
            return Err(UserValidationError::InvalidEmail(self.email.clone()));
        }

        if self.first_name.chars().count() < 2 || self.last_name.chars().count() < 2 {
            return Err(UserValidationError::NameTooShort);
        }

        Ok(())
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.full_name(), self.username)
    }
}

/// Validation errors for users
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    InvalidUsername(String),
    InvalidEmail(String),
    NameTooShort,
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUsername(name) => write!(
                f,
                "Username '{}' must be 3-20 characters, alphanumeric and underscore only",
                name
            ),
            Self::InvalidEmail(email) => write!(f, "Invalid email address: '{}'", email),
            Self::NameTooShort => {
                write!(f, "First and last name must be at least 2 characters")
            }
        }
    }
}

impl std::error::Error for UserValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes() {
        let user = User::new(" jane_doe ", " Jane@Example.COM ", "Jane", "Doe");
        assert_eq!(user.username, "jane_doe");
        assert_eq!(user.email, "jane@example.com");
        assert!(user.is_active);
        assert_eq!(user.full_name(), "Jane Doe");
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_username_rules() {
        for bad in ["ab", "a".repeat(21).as_str(), "jane-doe", "jane doe"] {
            let user = User::new(bad, "jane@example.com", "Jane", "Doe");
            assert!(
                matches!(user.validate(), Err(UserValidationError::InvalidUsername(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_email_rules() {
        let user = User::new("jane_doe", "not-an-email", "Jane", "Doe");
        assert!(matches!(
            user.validate(),
            Err(UserValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn test_short_names_rejected() {
        let user = User::new("jane_doe", "jane@example.com", "J", "Doe");
        assert_eq!(user.validate(), Err(UserValidationError::NameTooShort));
    }
}
