//! Submission-time constraint checks.
//!
//! Only the value-local rules live here (`required`, `email`, `interval`).
//! `unique` needs the submission store and `hash` only changes how a value
//! is stored, so both are handled by the submission processor.

use crate::constraint::{Bound, Constraint, FieldDescriptor};
use crate::field_type::FieldValue;
use std::fmt;

/// A submitted value that breaks one of its field's constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintFailure {
    pub constraint: &'static str,
    pub reason: String,
}

impl ConstraintFailure {
    fn new(constraint: &'static str, reason: impl Into<String>) -> Self {
        Self {
            constraint,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ConstraintFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.constraint, self.reason)
    }
}

/// Check a field that was not submitted at all (or submitted blank).
pub fn check_missing(descriptor: &FieldDescriptor) -> Result<(), ConstraintFailure> {
    if descriptor.constraints.contains(&Constraint::Required) {
        return Err(ConstraintFailure::new("required", "value is missing"));
    }
    Ok(())
}

/// Check a type-matched value against its field's constraints, in order.
pub fn check_value(descriptor: &FieldDescriptor, value: &FieldValue) -> Result<(), ConstraintFailure> {
    for constraint in &descriptor.constraints {
        match constraint {
            Constraint::Required if value.is_blank() => {
                return Err(ConstraintFailure::new("required", "value is empty"));
            }
            Constraint::Email => {
                if let FieldValue::String(s) = value {
                    if !looks_like_email(s) {
                        return Err(ConstraintFailure::new(
                            "email",
                            format!("'{}' is not an email address", s),
                        ));
                    }
                }
            }
            Constraint::Interval { min, max } => check_interval(value, min, max)?,
            _ => {}
        }
    }
    Ok(())
}

fn check_interval(value: &FieldValue, min: &Bound, max: &Bound) -> Result<(), ConstraintFailure> {
    let inside = match (value, min, max) {
        (FieldValue::Int(v), Bound::Int(lo), Bound::Int(hi)) => lo <= v && v <= hi,
        (FieldValue::Float(v), Bound::Float(lo), Bound::Float(hi)) => lo <= v && v <= hi,
        (FieldValue::DateTime(v), Bound::Timestamp(lo), Bound::Timestamp(hi)) => lo <= v && v <= hi,
        (FieldValue::String(s), Bound::StringLength(lo), Bound::StringLength(hi)) => {
            let len = s.chars().count() as u64;
            *lo <= len && len <= *hi
        }
        // Bounds were decoded against the declared type and the value was
        // matched against it, so other pairings cannot be compared.
        _ => true,
    };

    if inside {
        Ok(())
    } else {
        Err(ConstraintFailure::new(
            "interval",
            format!(
                "{} is outside [{}, {}]",
                value.canonical(),
                min.to_json(),
                max.to_json()
            ),
        ))
    }
}

fn looks_like_email(raw: &str) -> bool {
    let candidate = raw.trim();
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_type::FieldType;
    use chrono::{TimeZone, Utc};

    fn field(field_type: FieldType, constraint: Constraint) -> FieldDescriptor {
        FieldDescriptor::new("f", field_type).with_constraint(constraint)
    }

    #[test]
    fn test_required() {
        let d = field(FieldType::String, Constraint::Required);
        assert!(check_value(&d, &FieldValue::String("x".into())).is_ok());
        assert_eq!(
            check_value(&d, &FieldValue::String("   ".into())).unwrap_err().constraint,
            "required"
        );
        assert!(check_missing(&d).is_err());
        assert!(check_missing(&FieldDescriptor::new("g", FieldType::String)).is_ok());
    }

    #[test]
    fn test_email() {
        let d = field(FieldType::String, Constraint::Email);
        for ok in ["a@b.com", "first.last@mail.example.org"] {
            assert!(check_value(&d, &FieldValue::String(ok.into())).is_ok(), "{ok}");
        }
        for bad in ["plain", "@b.com", "a@b", "a@@b.com", "a b@c.com", "a@.com", "a@b.com."] {
            assert!(check_value(&d, &FieldValue::String(bad.into())).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_numeric_interval() {
        let d = field(
            FieldType::Int,
            Constraint::Interval { min: Bound::Int(0), max: Bound::Int(150) },
        );
        assert!(check_value(&d, &FieldValue::Int(0)).is_ok());
        assert!(check_value(&d, &FieldValue::Int(150)).is_ok());
        let err = check_value(&d, &FieldValue::Int(151)).unwrap_err();
        assert_eq!(err.constraint, "interval");
        assert!(err.reason.contains("151"));

        let d = field(
            FieldType::Float,
            Constraint::Interval { min: Bound::Float(0.5), max: Bound::Float(2.5) },
        );
        assert!(check_value(&d, &FieldValue::Float(1.75)).is_ok());
        assert!(check_value(&d, &FieldValue::Float(0.25)).is_err());
    }

    #[test]
    fn test_string_length_interval_counts_chars() {
        let d = field(
            FieldType::String,
            Constraint::Interval { min: Bound::StringLength(1), max: Bound::StringLength(3) },
        );
        assert!(check_value(&d, &FieldValue::String("ñño".into())).is_ok());
        assert!(check_value(&d, &FieldValue::String("abcd".into())).is_err());
        assert!(check_value(&d, &FieldValue::String(String::new())).is_err());
    }

    #[test]
    fn test_datetime_interval() {
        let lo = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
        let hi = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let d = field(
            FieldType::Datetime,
            Constraint::Interval { min: Bound::Timestamp(lo), max: Bound::Timestamp(hi) },
        );
        let inside = Utc.with_ymd_and_hms(2024, 4, 8, 12, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert!(check_value(&d, &FieldValue::DateTime(inside)).is_ok());
        assert!(check_value(&d, &FieldValue::DateTime(outside)).is_err());
    }

    #[test]
    fn test_unique_and_hash_are_not_checked_here() {
        let d = FieldDescriptor::new("f", FieldType::String)
            .with_constraint(Constraint::Unique)
            .with_constraint(Constraint::Hash);
        assert!(check_value(&d, &FieldValue::String("anything".into())).is_ok());
        assert!(check_missing(&d).is_ok());
    }
}
