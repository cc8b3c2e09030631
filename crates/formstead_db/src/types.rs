//! Stored entities and request-scoped inputs.

use chrono::{DateTime, Utc};
use formstead_ids::{FormId, FormInstanceId, SubmissionId, UserId};
use formstead_schema::{FieldDescriptor, FieldType, FieldValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// Form Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A form joined with its live instance: what readers see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormData {
    pub id: FormId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "last_modified")]
    pub updated_at: DateTime<Utc>,
    /// Version of the instance carried in `fields`
    pub form_version: u32,
    #[serde(rename = "form_instance_id")]
    pub instance_id: FormInstanceId,
    pub fields: Vec<FieldDescriptor>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// One immutable schema version of a form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormInstance {
    pub id: FormInstanceId,
    pub form_id: FormId,
    pub form_version: u32,
    pub fields: Vec<FieldDescriptor>,
    pub created_at: DateTime<Utc>,
}

impl FormInstance {
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

// ============================================================================
// Submission Types
// ============================================================================

/// Per-request data that travels with a submission.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Client data recorded with the submission, e.g. `{"user_agent": .., "ip_address": ..}`
    pub metadata: serde_json::Value,
    /// Caller-imposed deadline; the store never runs past it.
    pub deadline: Option<Instant>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            deadline: None,
        }
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Time left for a transaction: the configured budget, capped by the deadline.
    pub fn budget(&self, configured: Duration) -> Duration {
        match self.deadline {
            Some(deadline) => configured.min(deadline.saturating_duration_since(Instant::now())),
            None => configured,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= Instant::now())
    }
}

/// A validated field value, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionField {
    pub name: String,
    pub field_type: FieldType,
    pub value: FieldValue,
    /// Canonical text, or the fingerprint when the field is hashed
    pub content: String,
    pub hashed: bool,
    /// Set when the field carries `unique`; recorded in the uniqueness index
    pub fingerprint: Option<String>,
}

/// A validated submission, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub form_id: FormId,
    pub form_instance_id: FormInstanceId,
    pub metadata: serde_json::Value,
    pub fields: Vec<SubmissionField>,
}

impl Submission {
    pub fn field(&self, name: &str) -> Option<&SubmissionField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field value as read back from storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredField {
    pub name: String,
    pub field_type: FieldType,
    pub content: String,
    pub hashed: bool,
}

impl StoredField {
    /// Decoded value. Hashed fields only keep a fingerprint, so they have none.
    pub fn value(&self) -> Option<FieldValue> {
        if self.hashed {
            return None;
        }
        FieldValue::from_canonical(&self.content, self.field_type)
    }
}

/// A persisted submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub form_id: FormId,
    pub form_instance_id: FormInstanceId,
    pub metadata: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
    pub fields: Vec<StoredField>,
}

impl SubmissionRecord {
    pub fn field(&self, name: &str) -> Option<&StoredField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// An entry of the per-instance uniqueness index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UniquenessRecord {
    pub form_instance_id: FormInstanceId,
    pub field_name: String,
    pub fingerprint: String,
    pub submission_id: SubmissionId,
}
