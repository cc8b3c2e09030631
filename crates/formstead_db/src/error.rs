//! Error kinds shared by the form and submission stores.

use formstead_ids::{FormId, UserId};
use formstead_schema::{ConstraintFailure, FieldType, ValidationError};
use std::time::Duration;
use thiserror::Error;

/// Store and processing result type.
pub type Result<T> = std::result::Result<T, FormError>;

/// Every failure a form or submission operation can report.
#[derive(Error, Debug)]
pub enum FormError {
    /// Malformed schema definition or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Owner id out of range or not a known user
    #[error("Invalid user ID: {0}")]
    InvalidUserId(UserId),

    #[error("Form not found: {0}")]
    FormNotFound(FormId),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Submitted value does not match the declared field type
    #[error("Invalid type for field '{field}': expected {expected}, got {actual}")]
    InvalidFieldType {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    /// Value already submitted for a `unique` field of this form instance
    #[error("Duplicate value for unique field '{field}'")]
    DuplicateUniqueField { field: String },

    /// Submitted value breaks a `required`, `email` or `interval` rule
    #[error("Field '{field}' violates {failure}")]
    ConstraintViolation {
        field: String,
        failure: ConstraintFailure,
    },

    #[error("Transaction exceeded its deadline of {0:?}")]
    TransactionTimeout(Duration),

    /// Anything else from the database driver
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for FormError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl FormError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Errors the submitter can fix by changing the submitted data.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidFieldType { .. }
                | Self::DuplicateUniqueField { .. }
                | Self::ConstraintViolation { .. }
        )
    }
}

/// True when the driver reports a UNIQUE constraint failure.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// True when the driver reports a FOREIGN KEY constraint failure.
pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
