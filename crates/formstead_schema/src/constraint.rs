//! Constraint vocabulary and field descriptors.
//!
//! Callers exchange fields in a loose JSON shape:
//!
//! ```json
//! {"field_name": "age", "field_type": "int",
//!  "field_constraints": [{"constraint_name": "interval", "min": 0, "max": 150}]}
//! ```
//!
//! [`FieldSpec`] / [`ConstraintSpec`] mirror that shape exactly. A
//! [`FieldDescriptor`] is the validated form: constraints become the tagged
//! [`Constraint`] enum and interval bounds are decoded once, against the
//! field's declared type.

use crate::field_type::FieldType;
use crate::validate::{self, ValidationError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// One end of an `interval` constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    /// Length in characters, for `string` fields.
    StringLength(u64),
}

impl Bound {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Timestamp(v) => {
                serde_json::Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::StringLength(v) => serde_json::Value::from(*v),
        }
    }

    /// Ordering between two bounds of the same kind. Mixed kinds are unordered.
    pub fn partial_cmp_same_kind(&self, other: &Bound) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::StringLength(a), Self::StringLength(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// A named rule attached to a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    Email,
    Unique,
    /// Store the value's fingerprint instead of the value itself.
    Hash,
    Interval { min: Bound, max: Bound },
}

impl Constraint {
    pub const NAMES: [&'static str; 5] = ["required", "email", "unique", "hash", "interval"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Email => "email",
            Self::Unique => "unique",
            Self::Hash => "hash",
            Self::Interval { .. } => "interval",
        }
    }
}

impl From<&Constraint> for ConstraintSpec {
    fn from(constraint: &Constraint) -> Self {
        let (min, max) = match constraint {
            Constraint::Interval { min, max } => (Some(min.to_json()), Some(max.to_json())),
            _ => (None, None),
        };
        Self {
            constraint_name: constraint.name().to_string(),
            min,
            max,
        }
    }
}

/// Wire shape of a constraint, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    pub constraint_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
}

impl ConstraintSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            constraint_name: name.into(),
            min: None,
            max: None,
        }
    }

    pub fn interval(min: serde_json::Value, max: serde_json::Value) -> Self {
        Self {
            constraint_name: "interval".to_string(),
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Wire shape of a field, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_name: String,
    pub field_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub field_constraints: Vec<ConstraintSpec>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            field_name: name.into(),
            field_type: field_type.into(),
            field_constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: ConstraintSpec) -> Self {
        self.field_constraints.push(constraint);
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<ConstraintSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<ConstraintSpec>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A validated, typed field of a form instance.
///
/// Serializes to (and only deserializes from) the [`FieldSpec`] wire shape,
/// re-running definition-time validation on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub constraints: Vec<Constraint>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.constraints.iter().any(|c| c.name() == name)
    }

    pub fn is_unique(&self) -> bool {
        self.constraints.contains(&Constraint::Unique)
    }

    pub fn is_hashed(&self) -> bool {
        self.constraints.contains(&Constraint::Hash)
    }

    pub fn to_spec(&self) -> FieldSpec {
        FieldSpec {
            field_name: self.name.clone(),
            field_type: self.field_type.as_str().to_string(),
            field_constraints: self.constraints.iter().map(ConstraintSpec::from).collect(),
        }
    }
}

impl TryFrom<FieldSpec> for FieldDescriptor {
    type Error = ValidationError;

    fn try_from(spec: FieldSpec) -> Result<Self, Self::Error> {
        validate::validate_field(&spec)
    }
}

impl From<FieldDescriptor> for FieldSpec {
    fn from(descriptor: FieldDescriptor) -> Self {
        descriptor.to_spec()
    }
}
