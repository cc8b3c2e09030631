//! Submission Processor
//!
//! Turns incoming name/value pairs into a validated [`Submission`] bound to
//! the form's live instance, then hands it to the submission store. Holds no
//! state of its own.

use formstead_db::{
    FormError, FormInstance, FormStore, RequestContext, Result, Submission, SubmissionField,
    SubmissionStore,
};
use formstead_ids::{FormId, SubmissionId};
use formstead_schema::{check_missing, check_value, fingerprint, matches_type, FieldDescriptor, FieldValue};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct SubmissionProcessor {
    forms: Arc<dyn FormStore>,
    submissions: Arc<dyn SubmissionStore>,
}

impl SubmissionProcessor {
    pub fn new(forms: Arc<dyn FormStore>, submissions: Arc<dyn SubmissionStore>) -> Self {
        Self { forms, submissions }
    }

    /// Process form-encoded pairs, decoding each value against its declared type.
    pub async fn process(
        &self,
        form_id: FormId,
        raw_fields: &[(String, String)],
        ctx: &RequestContext,
    ) -> Result<SubmissionId> {
        check_deadline(ctx)?;
        let instance = self.forms.live_instance(form_id).await?;
        let values = select_fields(&instance, raw_fields.iter().map(|(k, v)| (k.as_str(), v)))
            .into_iter()
            .map(|(descriptor, raw)| (descriptor, FieldValue::decode(raw, descriptor.field_type)))
            .collect();

        self.store(&instance, values, ctx).await
    }

    /// Process values that were already typed by the caller (JSON clients).
    pub async fn process_values(
        &self,
        form_id: FormId,
        values: Vec<(String, FieldValue)>,
        ctx: &RequestContext,
    ) -> Result<SubmissionId> {
        check_deadline(ctx)?;
        let instance = self.forms.live_instance(form_id).await?;
        let values = select_fields(&instance, values.iter().map(|(k, v)| (k.as_str(), v)))
            .into_iter()
            .map(|(descriptor, value)| (descriptor, value.clone()))
            .collect();

        self.store(&instance, values, ctx).await
    }

    async fn store(
        &self,
        instance: &FormInstance,
        values: Vec<(&FieldDescriptor, FieldValue)>,
        ctx: &RequestContext,
    ) -> Result<SubmissionId> {
        let submission = self.build(instance, values, ctx).await?;
        let submission_id = self.submissions.insert(&submission, ctx).await?;

        info!(
            submission_id = %submission_id,
            form_id = %instance.form_id,
            form_version = instance.form_version,
            "Processed submission"
        );
        Ok(submission_id)
    }

    /// Validate selected values in arrival order, then check declared fields
    /// that never arrived.
    async fn build(
        &self,
        instance: &FormInstance,
        values: Vec<(&FieldDescriptor, FieldValue)>,
        ctx: &RequestContext,
    ) -> Result<Submission> {
        let mut present = HashSet::new();
        let mut fields = Vec::with_capacity(values.len());

        for (descriptor, value) in values {
            present.insert(descriptor.name.as_str());

            // Blank non-string input and JSON null count as not submitted
            if value.is_absent() {
                check_missing(descriptor).map_err(|failure| FormError::ConstraintViolation {
                    field: descriptor.name.clone(),
                    failure,
                })?;
                continue;
            }

            fields.push(self.validate_field(instance, descriptor, value).await?);
        }

        for descriptor in instance.fields.iter().filter(|d| !present.contains(d.name.as_str())) {
            check_missing(descriptor).map_err(|failure| FormError::ConstraintViolation {
                field: descriptor.name.clone(),
                failure,
            })?;
        }

        Ok(Submission {
            form_id: instance.form_id,
            form_instance_id: instance.id,
            metadata: ctx.metadata.clone(),
            fields,
        })
    }

    async fn validate_field(
        &self,
        instance: &FormInstance,
        descriptor: &FieldDescriptor,
        value: FieldValue,
    ) -> Result<SubmissionField> {
        if !matches_type(&value, descriptor.field_type) {
            return Err(FormError::InvalidFieldType {
                field: descriptor.name.clone(),
                expected: descriptor.field_type,
                actual: value.kind(),
            });
        }

        check_value(descriptor, &value).map_err(|failure| FormError::ConstraintViolation {
            field: descriptor.name.clone(),
            failure,
        })?;

        let canonical = value.canonical();
        let digest = (descriptor.is_unique() || descriptor.is_hashed()).then(|| fingerprint(&canonical));

        if descriptor.is_unique() {
            if let Some(digest) = &digest {
                let taken = self
                    .submissions
                    .fingerprint_exists(instance.id, &descriptor.name, digest)
                    .await?;
                if taken {
                    debug!(field = %descriptor.name, form_instance_id = %instance.id, "Unique value already submitted");
                    return Err(FormError::DuplicateUniqueField {
                        field: descriptor.name.clone(),
                    });
                }
            }
        }

        let hashed = descriptor.is_hashed();
        let content = match (&digest, hashed) {
            (Some(digest), true) => digest.clone(),
            _ => canonical,
        };

        Ok(SubmissionField {
            name: descriptor.name.clone(),
            field_type: descriptor.field_type,
            value,
            content,
            hashed,
            fingerprint: if descriptor.is_unique() { digest } else { None },
        })
    }
}

/// Refuse work whose deadline passed before any store read.
fn check_deadline(ctx: &RequestContext) -> Result<()> {
    if ctx.is_expired() {
        warn!("Deadline already passed, submission not processed");
        return Err(FormError::TransactionTimeout(Duration::ZERO));
    }
    Ok(())
}

/// Pair incoming values with the instance's fields.
///
/// Names the instance does not declare are skipped. A repeated name keeps
/// its first value.
fn select_fields<'i, 'v, V: ?Sized>(
    instance: &'i FormInstance,
    incoming: impl IntoIterator<Item = (&'v str, &'v V)>,
) -> Vec<(&'i FieldDescriptor, &'v V)> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();

    for (name, value) in incoming {
        let Some(descriptor) = instance.field(name) else {
            warn!(field = name, form_id = %instance.form_id, "Skipping field not in form");
            continue;
        };
        if !seen.insert(name) {
            debug!(field = name, "Field submitted more than once, keeping the first value");
            continue;
        }
        selected.push((descriptor, value));
    }

    selected
}
