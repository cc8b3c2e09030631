//! Field Type Registry
//!
//! The closed set of primitive field types, the typed values a submission
//! carries, and the strict matcher between the two.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Declared primitive type of a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    String,
    Datetime,
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 5] = [
        FieldType::Int,
        FieldType::Float,
        FieldType::String,
        FieldType::Datetime,
        FieldType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Datetime => "datetime",
            Self::Json => "json",
        }
    }

    /// Exact, case-sensitive lookup. Anything outside the fixed set is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A submitted value after deserialization.
///
/// `Bool` and `Null` can arrive from JSON clients but no field type accepts
/// them; they exist so a mismatch can name what was actually observed.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl FieldValue {
    /// Name of the observed kind, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::Json(_) => "json",
        }
    }

    /// Decode form-encoded text for a field declared as `declared`.
    ///
    /// Numeric text decodes to the kind its literal spells (`42` is an int,
    /// `4.2` and `4e2` are floats) regardless of the declared type, so the
    /// matcher can reject `42` for a `float` field. Text that does not decode
    /// is kept as a `String`. Blank text for a non-string field, and the JSON
    /// literal `null` for a `json` field, decode to `Null`.
    pub fn decode(raw: &str, declared: FieldType) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() && declared != FieldType::String {
            return Self::Null;
        }

        match declared {
            FieldType::String => Self::String(raw.to_string()),
            FieldType::Int | FieldType::Float => decode_number(trimmed)
                .unwrap_or_else(|| Self::String(raw.to_string())),
            FieldType::Datetime => DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| Self::DateTime(dt.with_timezone(&Utc)))
                .unwrap_or_else(|_| Self::String(raw.to_string())),
            FieldType::Json => match serde_json::from_str::<serde_json::Value>(raw) {
                Ok(serde_json::Value::Null) => Self::Null,
                Ok(json) => Self::Json(json),
                Err(_) => Self::String(raw.to_string()),
            },
        }
    }

    /// Decode a value from a JSON payload.
    ///
    /// Strings stay strings: JSON clients submitting a `datetime` field must
    /// use [`FieldValue::DateTime`] or go through [`FieldValue::decode`].
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }

    /// Rebuild a value from its stored canonical form.
    pub fn from_canonical(content: &str, declared: FieldType) -> Option<Self> {
        let json: serde_json::Value = serde_json::from_str(content).ok()?;
        match declared {
            FieldType::Int => json.as_i64().map(Self::Int),
            FieldType::Float => json.as_f64().map(Self::Float),
            FieldType::String => json.as_str().map(|s| Self::String(s.to_string())),
            FieldType::Datetime => json
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| Self::DateTime(dt.with_timezone(&Utc))),
            FieldType::Json => Some(Self::Json(json)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            // -0.0 and 0.0 are the same value and must share a canonical form
            Self::Float(f) => serde_json::Number::from_f64(if *f == 0.0 { 0.0 } else { *f })
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::DateTime(dt) => {
                serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Json(v) => v.clone(),
        }
    }

    /// Canonical textual form: the compact JSON encoding of the value.
    ///
    /// This is what gets stored and what fingerprints are computed over, so
    /// two submissions of the same logical value always produce the same text.
    pub fn canonical(&self) -> String {
        self.to_json().to_string()
    }

    /// True when nothing was actually submitted: `Null`, or a JSON `null`.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Null | Self::Json(serde_json::Value::Null))
    }

    /// True for absent values and for strings that are empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::String(s) => s.trim().is_empty(),
            other => other.is_absent(),
        }
    }
}

fn decode_number(text: &str) -> Option<FieldValue> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(FieldValue::Int(i));
    }
    if !text.contains(['.', 'e', 'E']) {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(FieldValue::Float)
}

/// Strict runtime type match between a submitted value and a declared type.
pub fn matches_type(value: &FieldValue, declared: FieldType) -> bool {
    matches!(
        (value, declared),
        (FieldValue::Int(_), FieldType::Int)
            | (FieldValue::Float(_), FieldType::Float)
            | (FieldValue::String(_), FieldType::String)
            | (FieldValue::DateTime(_), FieldType::Datetime)
            | (FieldValue::Json(_), FieldType::Json)
    )
}

/// Like [`matches_type`], for a declared type that is still a raw name.
/// Unrecognized names never match.
pub fn matches_type_name(value: &FieldValue, declared: &str) -> bool {
    FieldType::parse(declared).is_some_and(|t| matches_type(value, t))
}

/// SHA-256 of a canonical serialization, hex encoded.
pub fn fingerprint(canonical: &str) -> String {
    hex::encode(Sha256::digest(canonical.as_bytes()))
}
