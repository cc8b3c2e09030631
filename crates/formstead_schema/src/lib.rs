//! Form Schema Model
//!
//! # Philosophy: a published schema is a contract
//!
//! A form definition goes through two gates:
//!
//! 1. **Definition**: the field list is validated once, when the form is
//!    created or its fields are redefined. Bad names, unknown types and
//!    malformed constraints are rejected before anything is stored.
//! 2. **Submission**: every incoming value is matched against the declared
//!    type of the snapshot that was live when it arrived. No coercion: an
//!    integer never satisfies a `float` field and a raw string never
//!    satisfies a `datetime` field.
//!
//! # Modules
//!
//! - [`field_type`]: the fixed primitive set, typed values, type matching and
//!   canonical serialization
//! - [`constraint`]: the tagged constraint vocabulary and the JSON wire shape
//! - [`validate`]: definition-time validation of names, types and constraints
//! - [`enforce`]: submission-time checks for `required`, `email` and `interval`

pub mod constraint;
pub mod enforce;
pub mod field_type;
pub mod validate;

pub use constraint::{Bound, Constraint, ConstraintSpec, FieldDescriptor, FieldSpec};
pub use enforce::{check_missing, check_value, ConstraintFailure};
pub use field_type::{fingerprint, matches_type, matches_type_name, FieldType, FieldValue};
pub use validate::{
    validate_constraints, validate_field_name, validate_field_type, validate_fields,
    ValidationError,
};
