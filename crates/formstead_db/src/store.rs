//! Store capabilities.
//!
//! Split by concern so a component can be handed exactly the access it
//! needs. [`crate::SqliteStore`] implements both.

use crate::error::Result;
use crate::types::{FormData, FormInstance, RequestContext, Submission, SubmissionRecord, UniquenessRecord};
use async_trait::async_trait;
use formstead_ids::{FormId, FormInstanceId, SubmissionId, UserId};
use formstead_schema::FieldSpec;

/// Forms and their versioned field definitions.
#[async_trait]
pub trait FormStore: Send + Sync {
    /// Validate `fields` and create a form with instance version 1.
    ///
    /// Nothing is written unless the whole definition is valid.
    async fn create_form(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
        fields: &[FieldSpec],
    ) -> Result<FormId>;

    /// The form joined with its live instance.
    async fn get_form(&self, form_id: FormId) -> Result<FormData>;

    /// All forms owned by `user_id`, each with its live instance. Empty when
    /// the user has none.
    async fn get_forms_by_user(&self, user_id: UserId) -> Result<Vec<FormData>>;

    /// Id of the highest-versioned instance of the form.
    async fn resolve_live_instance_id(&self, form_id: FormId) -> Result<FormInstanceId>;

    /// The highest-versioned instance of the form.
    async fn live_instance(&self, form_id: FormId) -> Result<FormInstance>;

    /// Every instance of the form joined with the form row, oldest version first.
    async fn list_instances(&self, form_id: FormId) -> Result<Vec<FormData>>;

    /// Replace the field list by appending a new instance at version + 1.
    async fn redefine_fields(&self, form_id: FormId, fields: &[FieldSpec]) -> Result<FormInstance>;

    async fn rename_form(&self, form_id: FormId, name: &str) -> Result<()>;

    async fn update_description(&self, form_id: FormId, description: &str) -> Result<()>;

    /// Delete the form with all its instances and submissions.
    async fn delete_form(&self, form_id: FormId) -> Result<()>;
}

/// Submissions and the uniqueness index.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a validated submission atomically.
    ///
    /// The transaction is bounded by the store's timeout and by the
    /// context's deadline, whichever is sooner.
    async fn insert(&self, submission: &Submission, ctx: &RequestContext) -> Result<SubmissionId>;

    /// Whether `fingerprint` is already recorded for a unique field of the instance.
    async fn fingerprint_exists(
        &self,
        form_instance_id: FormInstanceId,
        field_name: &str,
        fingerprint: &str,
    ) -> Result<bool>;

    async fn get_submission(&self, submission_id: SubmissionId) -> Result<SubmissionRecord>;

    /// Submissions to any instance of the form, oldest first.
    async fn list_submissions(&self, form_id: FormId) -> Result<Vec<SubmissionRecord>>;

    async fn uniqueness_records(&self, form_instance_id: FormInstanceId) -> Result<Vec<UniquenessRecord>>;
}
