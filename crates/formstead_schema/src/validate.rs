//! Definition-time validation.
//!
//! Runs once, when a form is created or its fields are redefined. Nothing in
//! here is re-run at submission time; see [`crate::enforce`] for that.

use crate::constraint::{Bound, Constraint, ConstraintSpec, FieldDescriptor, FieldSpec};
use crate::field_type::FieldType;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use thiserror::Error;

/// A malformed schema definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name is empty or whitespace")]
    EmptyName,

    #[error("form has to have at least one field")]
    NoFields,

    #[error("unsupported field type: '{0}'")]
    UnsupportedFieldType(String),

    #[error("unsupported constraint: '{0}'")]
    UnsupportedConstraint(String),

    #[error("constraint '{constraint}' does not apply to {field_type} fields")]
    ConstraintNotApplicable {
        constraint: String,
        field_type: String,
    },

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("field '{0}' is defined more than once")]
    DuplicateField(String),

    #[error("field '{field}': {source}")]
    InField {
        field: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    fn in_field(self, field: &str) -> Self {
        Self::InField {
            field: field.to_string(),
            source: Box::new(self),
        }
    }
}

pub fn validate_field_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

pub fn validate_field_type(field_type: &str) -> Result<FieldType, ValidationError> {
    FieldType::parse(field_type)
        .ok_or_else(|| ValidationError::UnsupportedFieldType(field_type.to_string()))
}

/// Check a constraint list against the (raw) declared type and decode it.
///
/// The type is taken as written so that `interval` on a `bool` field gets its
/// own diagnosis even though `bool` is not a storable field type.
pub fn validate_constraints(
    field_type: &str,
    constraints: &[ConstraintSpec],
) -> Result<Vec<Constraint>, ValidationError> {
    constraints
        .iter()
        .map(|spec| match spec.constraint_name.as_str() {
            "required" => Ok(Constraint::Required),
            "email" if field_type == "string" => Ok(Constraint::Email),
            "email" => Err(ValidationError::ConstraintNotApplicable {
                constraint: "email".to_string(),
                field_type: field_type.to_string(),
            }),
            "unique" => Ok(Constraint::Unique),
            "hash" => Ok(Constraint::Hash),
            "interval" => parse_interval(field_type, spec),
            other => Err(ValidationError::UnsupportedConstraint(other.to_string())),
        })
        .collect()
}

fn parse_interval(field_type: &str, spec: &ConstraintSpec) -> Result<Constraint, ValidationError> {
    let (Some(min), Some(max)) = (spec.min.as_ref(), spec.max.as_ref()) else {
        return Err(ValidationError::InvalidInterval(
            "interval constraint missing min or max".to_string(),
        ));
    };

    let decode: fn(&serde_json::Value) -> Option<Bound> = match field_type {
        "int" => |v| v.as_i64().map(Bound::Int),
        "float" => |v| v.as_f64().map(Bound::Float),
        "string" => |v| v.as_u64().map(Bound::StringLength),
        "datetime" => |v| v.as_str().and_then(parse_timestamp).map(Bound::Timestamp),
        "bool" => {
            return Err(ValidationError::InvalidInterval(
                "bool type cannot have intervals".to_string(),
            ))
        }
        other => {
            return Err(ValidationError::InvalidInterval(format!(
                "unsupported field type for interval: '{}'",
                other
            )))
        }
    };

    let expected = match field_type {
        "int" => "integers",
        "float" => "numbers",
        "string" => "non-negative integer lengths",
        _ => "RFC 3339 timestamps",
    };
    let min = decode(min).ok_or_else(|| {
        ValidationError::InvalidInterval(format!("min should be {} for {} fields", expected, field_type))
    })?;
    let max = decode(max).ok_or_else(|| {
        ValidationError::InvalidInterval(format!("max should be {} for {} fields", expected, field_type))
    })?;

    match min.partial_cmp_same_kind(&max) {
        Some(Ordering::Less | Ordering::Equal) => Ok(Constraint::Interval { min, max }),
        _ => Err(ValidationError::InvalidInterval(format!(
            "min > max for {} interval",
            field_type
        ))),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Validate one wire-shaped field into a descriptor. Errors are not wrapped
/// with the field name; [`validate_fields`] does that.
pub(crate) fn validate_field(spec: &FieldSpec) -> Result<FieldDescriptor, ValidationError> {
    validate_field_name(&spec.field_name)?;
    let field_type = validate_field_type(&spec.field_type)?;
    let constraints = validate_constraints(&spec.field_type, &spec.field_constraints)?;

    Ok(FieldDescriptor {
        name: spec.field_name.clone(),
        field_type,
        constraints,
    })
}

/// Validate a complete field list, preserving order.
pub fn validate_fields(specs: &[FieldSpec]) -> Result<Vec<FieldDescriptor>, ValidationError> {
    if specs.is_empty() {
        return Err(ValidationError::NoFields);
    }

    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(specs.len());
    for spec in specs {
        let descriptor = validate_field(spec).map_err(|e| e.in_field(&spec.field_name))?;
        if !seen.insert(descriptor.name.clone()) {
            return Err(ValidationError::DuplicateField(descriptor.name));
        }
        descriptors.push(descriptor);
    }

    Ok(descriptors)
}
