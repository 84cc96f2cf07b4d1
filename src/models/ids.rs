//! Strongly-typed ID wrappers for all entity types
//!
//! Using newtype wrappers prevents accidentally mixing up IDs from different
//! entity types at compile time. Account numbers are the customer-facing
//! identifier and get their own type.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an ID from a string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                s.parse()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(AccountId, "acc-");
define_id!(TransactionId, "txn-");
define_id!(UserId, "usr-");

/// Number of digits in an account number
pub const ACCOUNT_NUMBER_LEN: usize = 16;

/// Customer-facing 16-digit account number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// Generate a random account number; uniqueness is checked by the caller
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let digits: String = (0..ACCOUNT_NUMBER_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self(digits)
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.len() == ACCOUNT_NUMBER_LEN && s.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!(
                "Account number must be {} digits, got '{}'",
                ACCOUNT_NUMBER_LEN, s
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four digits, for display
    pub fn masked(&self) -> String {
        format!("****{}", &self.0[ACCOUNT_NUMBER_LEN - 4..])
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountNumber> for String {
    fn from(number: AccountNumber) -> Self {
        number.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        let id = AccountId::new();
        let display = format!("{}", id);
        assert!(display.starts_with("acc-"));
        assert_eq!(display.len(), 12);
    }

    #[test]
    fn test_id_parse_accepts_prefix() {
        let uuid_str = "550e8400-e29b-41d4-a716-446655440000";
        let plain = UserId::parse(uuid_str).unwrap();
        let prefixed: UserId = format!("usr-{}", uuid_str).parse().unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain.as_uuid().to_string(), uuid_str);
    }

    #[test]
    fn test_id_serialization() {
        let id = TransactionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: TransactionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_generated_account_number_shape() {
        for _ in 0..50 {
            let number = AccountNumber::generate();
            assert_eq!(number.as_str().len(), ACCOUNT_NUMBER_LEN);
            assert!(number.as_str().chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_account_number_parse() {
        assert!(AccountNumber::parse("1234567890123456").is_ok());
        assert!(AccountNumber::parse("12345").is_err());
        assert!(AccountNumber::parse("12345678901234ab").is_err());
        assert!(serde_json::from_str::<AccountNumber>("\"42\"").is_err());
    }

    #[test]
    fn test_account_number_masked() {
        let number = AccountNumber::parse("1234567890123456").unwrap();
        assert_eq!(number.masked(), "****3456");
    }
}
