//! SubmissionStore implementation.

use crate::error::{is_foreign_key_violation, is_unique_violation, FormError, Result};
use crate::store::SubmissionStore;
use crate::types::{RequestContext, StoredField, Submission, SubmissionRecord, UniquenessRecord};
use crate::SqliteStore;
use async_trait::async_trait;
use formstead_ids::{FormId, FormInstanceId, SubmissionId};
use formstead_schema::FieldType;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::HashMap;
use tracing::{debug, info};

#[async_trait]
impl SubmissionStore for SqliteStore {
    async fn insert(&self, submission: &Submission, ctx: &RequestContext) -> Result<SubmissionId> {
        let budget = ctx.budget(self.config.transaction_timeout);
        let submission_id = self
            .bounded(budget, "insert_submission", self.write_submission(submission))
            .await?;

        info!(
            submission_id = %submission_id,
            form_id = %submission.form_id,
            form_instance_id = %submission.form_instance_id,
            fields = submission.fields.len(),
            "Stored submission"
        );
        Ok(submission_id)
    }

    async fn fingerprint_exists(
        &self,
        form_instance_id: FormInstanceId,
        field_name: &str,
        fingerprint: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"SELECT 1 FROM unique_submission_fields
               WHERE form_instance_id = ? AND field_name = ? AND fingerprint = ?"#,
        )
        .bind(form_instance_id.get())
        .bind(field_name)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn get_submission(&self, submission_id: SubmissionId) -> Result<SubmissionRecord> {
        let row = sqlx::query(
            r#"SELECT id, form_id, form_instance_id, metadata, submitted_at
               FROM submissions WHERE id = ?"#,
        )
        .bind(submission_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(FormError::not_found(format!("Submission not found: {}", submission_id)));
        };

        let field_rows = sqlx::query(
            r#"SELECT submission_id, field_name, field_type, content, hashed
               FROM submission_fields WHERE submission_id = ? ORDER BY id"#,
        )
        .bind(submission_id.get())
        .fetch_all(&self.pool)
        .await?;

        let fields = field_rows
            .iter()
            .map(Self::row_to_stored_field)
            .collect::<Result<Vec<_>>>()?;

        Self::row_to_record(&row, fields)
    }

    async fn list_submissions(&self, form_id: FormId) -> Result<Vec<SubmissionRecord>> {
        let exists = sqlx::query("SELECT 1 FROM forms WHERE id = ?")
            .bind(form_id.get())
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(FormError::FormNotFound(form_id));
        }

        let rows = sqlx::query(
            r#"SELECT id, form_id, form_instance_id, metadata, submitted_at
               FROM submissions WHERE form_id = ? ORDER BY id"#,
        )
        .bind(form_id.get())
        .fetch_all(&self.pool)
        .await?;

        let field_rows = sqlx::query(
            r#"SELECT sf.submission_id, sf.field_name, sf.field_type, sf.content, sf.hashed
               FROM submission_fields sf
               JOIN submissions s ON s.id = sf.submission_id
               WHERE s.form_id = ?
               ORDER BY sf.id"#,
        )
        .bind(form_id.get())
        .fetch_all(&self.pool)
        .await?;

        let mut fields_by_submission: HashMap<i64, Vec<StoredField>> = HashMap::new();
        for row in &field_rows {
            fields_by_submission
                .entry(row.get("submission_id"))
                .or_default()
                .push(Self::row_to_stored_field(row)?);
        }

        rows.iter()
            .map(|row| {
                let id: i64 = row.get("id");
                let fields = fields_by_submission.remove(&id).unwrap_or_default();
                Self::row_to_record(row, fields)
            })
            .collect()
    }

    async fn uniqueness_records(&self, form_instance_id: FormInstanceId) -> Result<Vec<UniquenessRecord>> {
        let rows = sqlx::query(
            r#"SELECT form_instance_id, field_name, fingerprint, submission_id
               FROM unique_submission_fields
               WHERE form_instance_id = ?
               ORDER BY id"#,
        )
        .bind(form_instance_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| UniquenessRecord {
                form_instance_id: FormInstanceId::new(row.get("form_instance_id")),
                field_name: row.get("field_name"),
                fingerprint: row.get("fingerprint"),
                submission_id: SubmissionId::new(row.get("submission_id")),
            })
            .collect())
    }
}

impl SqliteStore {
    /// Write the submission row, its field values and its uniqueness entries
    /// in one transaction. Any failure drops the transaction uncommitted.
    async fn write_submission(&self, submission: &Submission) -> Result<SubmissionId> {
        let mut tx = self.pool.begin().await?;
        let metadata = serde_json::to_string(&submission.metadata)?;

        // First statement is a write so the transaction takes the write lock up front
        let result = sqlx::query(
            r#"INSERT INTO submissions (form_id, form_instance_id, metadata, submitted_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(submission.form_id.get())
        .bind(submission.form_instance_id.get())
        .bind(&metadata)
        .bind(Self::now_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                FormError::FormNotFound(submission.form_id)
            } else {
                e.into()
            }
        })?;
        let submission_id = SubmissionId::new(result.last_insert_rowid());

        let owner = sqlx::query("SELECT form_id FROM form_instances WHERE id = ?")
            .bind(submission.form_instance_id.get())
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| FormId::new(row.get("form_id")));
        if owner != Some(submission.form_id) {
            return Err(FormError::invalid_input(format!(
                "form instance {} does not belong to form {}",
                submission.form_instance_id, submission.form_id
            )));
        }

        for field in &submission.fields {
            sqlx::query(
                r#"INSERT INTO submission_fields (submission_id, field_name, field_type, content, hashed)
                   VALUES (?, ?, ?, ?, ?)"#,
            )
            .bind(submission_id.get())
            .bind(&field.name)
            .bind(field.field_type.as_str())
            .bind(&field.content)
            .bind(field.hashed)
            .execute(&mut *tx)
            .await?;

            let Some(fingerprint) = &field.fingerprint else {
                continue;
            };
            sqlx::query(
                r#"INSERT INTO unique_submission_fields (form_instance_id, field_name, fingerprint, submission_id)
                   VALUES (?, ?, ?, ?)"#,
            )
            .bind(submission.form_instance_id.get())
            .bind(&field.name)
            .bind(fingerprint)
            .bind(submission_id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    debug!(field = %field.name, "Unique value already stored, rolling back");
                    FormError::DuplicateUniqueField {
                        field: field.name.clone(),
                    }
                } else {
                    e.into()
                }
            })?;
        }

        tx.commit().await?;
        Ok(submission_id)
    }

    fn row_to_stored_field(row: &SqliteRow) -> Result<StoredField> {
        let type_name: String = row.get("field_type");
        let field_type = FieldType::parse(&type_name).ok_or_else(|| {
            FormError::invalid_input(format!("stored field has unknown type '{}'", type_name))
        })?;

        Ok(StoredField {
            name: row.get("field_name"),
            field_type,
            content: row.get("content"),
            hashed: row.get("hashed"),
        })
    }

    fn row_to_record(row: &SqliteRow, fields: Vec<StoredField>) -> Result<SubmissionRecord> {
        let metadata: String = row.get("metadata");

        Ok(SubmissionRecord {
            id: SubmissionId::new(row.get("id")),
            form_id: FormId::new(row.get("form_id")),
            form_instance_id: FormInstanceId::new(row.get("form_instance_id")),
            metadata: serde_json::from_str(&metadata)?,
            submitted_at: Self::millis_to_datetime(row.get("submitted_at")),
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FormStore;
    use crate::test_support::{contact_fields, store_with_user};
    use crate::types::SubmissionField;
    use formstead_schema::{fingerprint, FieldValue};

    fn text_field(name: &str, text: &str, unique: bool) -> SubmissionField {
        let value = FieldValue::String(text.to_string());
        let content = value.canonical();
        SubmissionField {
            name: name.to_string(),
            field_type: FieldType::String,
            fingerprint: unique.then(|| fingerprint(&content)),
            value,
            content,
            hashed: false,
        }
    }

    async fn contact_submission(store: &SqliteStore, form_id: FormId, email: &str) -> Submission {
        Submission {
            form_id,
            form_instance_id: store.resolve_live_instance_id(form_id).await.unwrap(),
            metadata: serde_json::json!({"user_agent": "test", "ip_address": "127.0.0.1"}),
            fields: vec![text_field("name", "Ann", false), text_field("email", email, true)],
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (store, user) = store_with_user().await;
        let form_id = store.create_form(user, "Contact", "", &contact_fields()).await.unwrap();
        let submission = contact_submission(&store, form_id, "a@b.com").await;

        let id = store.insert(&submission, &RequestContext::new()).await.unwrap();

        let record = store.get_submission(id).await.unwrap();
        assert_eq!(record.form_id, form_id);
        assert_eq!(record.form_instance_id, submission.form_instance_id);
        assert_eq!(record.metadata["ip_address"], "127.0.0.1");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(
            record.field("email").and_then(|f| f.value()),
            Some(FieldValue::String("a@b.com".into()))
        );

        let unique = store.uniqueness_records(submission.form_instance_id).await.unwrap();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].field_name, "email");
        assert_eq!(unique[0].submission_id, id);
        assert!(store
            .fingerprint_exists(submission.form_instance_id, "email", &unique[0].fingerprint)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_unique_rolls_back() {
        let (store, user) = store_with_user().await;
        let form_id = store.create_form(user, "Contact", "", &contact_fields()).await.unwrap();
        let submission = contact_submission(&store, form_id, "a@b.com").await;

        store.insert(&submission, &RequestContext::new()).await.unwrap();
        let err = store.insert(&submission, &RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, FormError::DuplicateUniqueField { ref field } if field == "email"));

        // The losing submission left no rows behind
        assert_eq!(store.list_submissions(form_id).await.unwrap().len(), 1);
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM submission_fields")
            .fetch_one(store.pool())
            .await
            .unwrap()
            .get("n");
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_uniqueness_is_scoped_to_instance() {
        let (store, user) = store_with_user().await;
        let form_id = store.create_form(user, "Contact", "", &contact_fields()).await.unwrap();
        let first = contact_submission(&store, form_id, "a@b.com").await;
        store.insert(&first, &RequestContext::new()).await.unwrap();

        store.redefine_fields(form_id, &contact_fields()).await.unwrap();
        let second = contact_submission(&store, form_id, "a@b.com").await;
        assert_ne!(first.form_instance_id, second.form_instance_id);

        store.insert(&second, &RequestContext::new()).await.unwrap();
        assert_eq!(store.list_submissions(form_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_instance_must_belong_to_form() {
        let (store, user) = store_with_user().await;
        let a = store.create_form(user, "A", "", &contact_fields()).await.unwrap();
        let b = store.create_form(user, "B", "", &contact_fields()).await.unwrap();

        let mut submission = contact_submission(&store, a, "a@b.com").await;
        submission.form_instance_id = store.resolve_live_instance_id(b).await.unwrap();

        let err = store.insert(&submission, &RequestContext::new()).await.unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
        assert!(store.list_submissions(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_stores_nothing() {
        let (store, user) = store_with_user().await;
        let form_id = store.create_form(user, "Contact", "", &contact_fields()).await.unwrap();
        let submission = contact_submission(&store, form_id, "a@b.com").await;

        let ctx = RequestContext::new().with_deadline(tokio::time::Instant::now());
        let err = store.insert(&submission, &ctx).await.unwrap_err();
        assert!(matches!(err, FormError::TransactionTimeout(_)));
        assert!(store.list_submissions(form_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_records() {
        let (store, _) = store_with_user().await;
        assert!(matches!(
            store.get_submission(SubmissionId::new(5)).await,
            Err(FormError::NotFound(_))
        ));
        assert!(matches!(
            store.list_submissions(FormId::new(5)).await,
            Err(FormError::FormNotFound(_))
        ));
        assert!(store.uniqueness_records(FormInstanceId::new(5)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_form_cascades_to_submissions() {
        let (store, user) = store_with_user().await;
        let form_id = store.create_form(user, "Contact", "", &contact_fields()).await.unwrap();
        let submission = contact_submission(&store, form_id, "a@b.com").await;
        let id = store.insert(&submission, &RequestContext::new()).await.unwrap();

        store.delete_form(form_id).await.unwrap();
        assert!(matches!(store.get_submission(id).await, Err(FormError::NotFound(_))));
        assert!(store
            .uniqueness_records(submission.form_instance_id)
            .await
            .unwrap()
            .is_empty());
    }
}
