//! Typed row identifiers for Formstead.
//!
//! Every table keys its rows with an SQLite `INTEGER PRIMARY KEY`. Wrapping
//! them keeps a `FormId` from being passed where a `FormInstanceId` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing a row identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_row_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Parse a positive decimal id (as typed on a command line).
            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                let raw: i64 = value
                    .trim()
                    .parse()
                    .map_err(|e| IdParseError::new(format!("Invalid {}: {}", $label, e)))?;
                if raw < 1 {
                    return Err(IdParseError::new(format!(
                        "Invalid {}: must be >= 1, got {}",
                        $label, raw
                    )));
                }
                Ok(Self(raw))
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_row_id!(UserId, "user ID");
define_row_id!(FormId, "form ID");
define_row_id!(FormInstanceId, "form instance ID");
define_row_id!(SubmissionId, "submission ID");
