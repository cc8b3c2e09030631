//! FormStore implementation.
//!
//! A form row holds the mutable metadata (name, description) and mirrors the
//! current version number. Field definitions live in `form_instances`, one
//! immutable row per version. The live instance is always the one with the
//! highest version.

use crate::error::{is_foreign_key_violation, FormError, Result};
use crate::store::FormStore;
use crate::types::{FormData, FormInstance};
use crate::SqliteStore;
use async_trait::async_trait;
use formstead_ids::{FormId, FormInstanceId, UserId};
use formstead_schema::{validate_field_name, validate_fields, FieldDescriptor, FieldSpec};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info};

/// Form rows joined with one of their instances.
const FORM_WITH_INSTANCE: &str = r#"
    SELECT f.id, f.user_id, f.name, f.description, f.created_at, f.updated_at,
           fi.id AS instance_id, fi.form_version AS instance_version, fi.fields
    FROM forms f
    JOIN form_instances fi ON fi.form_id = f.id
"#;

/// Restricts [`FORM_WITH_INSTANCE`] to the live instance.
const LIVE_ONLY: &str =
    "fi.form_version = (SELECT MAX(form_version) FROM form_instances WHERE form_id = f.id)";

#[async_trait]
impl FormStore for SqliteStore {
    async fn create_form(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
        fields: &[FieldSpec],
    ) -> Result<FormId> {
        if user_id.get() < 1 {
            return Err(FormError::InvalidUserId(user_id));
        }
        validate_field_name(name).map_err(|_| FormError::invalid_input("form name is empty"))?;
        let descriptors = validate_fields(fields)?;
        let fields_json = serde_json::to_string(&descriptors)?;

        let form_id = self
            .bounded(
                self.config.transaction_timeout,
                "create_form",
                self.insert_form(user_id, name, description, &fields_json),
            )
            .await?;

        info!(form_id = %form_id, user_id = %user_id, fields = descriptors.len(), "Created form");
        Ok(form_id)
    }

    async fn get_form(&self, form_id: FormId) -> Result<FormData> {
        let sql = format!("{} WHERE f.id = ? AND {}", FORM_WITH_INSTANCE, LIVE_ONLY);
        let row = sqlx::query(&sql)
            .bind(form_id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_form_data(&row),
            None => Err(FormError::FormNotFound(form_id)),
        }
    }

    async fn get_forms_by_user(&self, user_id: UserId) -> Result<Vec<FormData>> {
        let sql = format!(
            "{} WHERE f.user_id = ? AND {} ORDER BY f.id",
            FORM_WITH_INSTANCE, LIVE_ONLY
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_form_data).collect()
    }

    async fn resolve_live_instance_id(&self, form_id: FormId) -> Result<FormInstanceId> {
        let row = sqlx::query(
            "SELECT id FROM form_instances WHERE form_id = ? ORDER BY form_version DESC LIMIT 1",
        )
        .bind(form_id.get())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(FormInstanceId::new(row.get("id"))),
            None => Err(FormError::FormNotFound(form_id)),
        }
    }

    async fn live_instance(&self, form_id: FormId) -> Result<FormInstance> {
        let row = sqlx::query(
            r#"SELECT id, form_id, form_version, fields, created_at
               FROM form_instances
               WHERE form_id = ?
               ORDER BY form_version DESC
               LIMIT 1"#,
        )
        .bind(form_id.get())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_instance(&row),
            None => Err(FormError::FormNotFound(form_id)),
        }
    }

    async fn list_instances(&self, form_id: FormId) -> Result<Vec<FormData>> {
        let sql = format!("{} WHERE f.id = ? ORDER BY fi.form_version ASC", FORM_WITH_INSTANCE);
        let rows = sqlx::query(&sql)
            .bind(form_id.get())
            .fetch_all(&self.pool)
            .await?;

        // Every form has at least its first instance
        if rows.is_empty() {
            return Err(FormError::FormNotFound(form_id));
        }
        rows.iter().map(Self::row_to_form_data).collect()
    }

    async fn redefine_fields(&self, form_id: FormId, fields: &[FieldSpec]) -> Result<FormInstance> {
        let descriptors = validate_fields(fields)?;
        let fields_json = serde_json::to_string(&descriptors)?;

        let instance = self
            .bounded(
                self.config.transaction_timeout,
                "redefine_fields",
                self.append_instance(form_id, &fields_json, descriptors),
            )
            .await?;

        info!(
            form_id = %form_id,
            form_version = instance.form_version,
            instance_id = %instance.id,
            "Redefined form fields"
        );
        Ok(instance)
    }

    async fn rename_form(&self, form_id: FormId, name: &str) -> Result<()> {
        validate_field_name(name).map_err(|_| FormError::invalid_input("form name is empty"))?;

        let result = sqlx::query("UPDATE forms SET name = ?, updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(Self::now_millis())
            .bind(form_id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FormError::FormNotFound(form_id));
        }
        debug!(form_id = %form_id, "Renamed form");
        Ok(())
    }

    async fn update_description(&self, form_id: FormId, description: &str) -> Result<()> {
        let result = sqlx::query("UPDATE forms SET description = ?, updated_at = ? WHERE id = ?")
            .bind(description)
            .bind(Self::now_millis())
            .bind(form_id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FormError::FormNotFound(form_id));
        }
        Ok(())
    }

    async fn delete_form(&self, form_id: FormId) -> Result<()> {
        let result = sqlx::query("DELETE FROM forms WHERE id = ?")
            .bind(form_id.get())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(FormError::FormNotFound(form_id));
        }
        info!(form_id = %form_id, "Deleted form");
        Ok(())
    }
}

impl SqliteStore {
    async fn insert_form(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
        fields_json: &str,
    ) -> Result<FormId> {
        let mut tx = self.pool.begin().await?;
        let now = Self::now_millis();

        let result = sqlx::query(
            r#"INSERT INTO forms (user_id, name, description, form_version, created_at, updated_at)
               VALUES (?, ?, ?, 1, ?, ?)"#,
        )
        .bind(user_id.get())
        .bind(name)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                FormError::InvalidUserId(user_id)
            } else {
                e.into()
            }
        })?;
        let form_id = FormId::new(result.last_insert_rowid());

        sqlx::query(
            "INSERT INTO form_instances (form_id, form_version, fields, created_at) VALUES (?, 1, ?, ?)",
        )
        .bind(form_id.get())
        .bind(fields_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(form_id)
    }

    /// Bump the form's version and store the new field list under it.
    ///
    /// The UPDATE runs first so the transaction holds the write lock before
    /// it reads the version; UNIQUE(form_id, form_version) backs this up.
    async fn append_instance(
        &self,
        form_id: FormId,
        fields_json: &str,
        fields: Vec<FieldDescriptor>,
    ) -> Result<FormInstance> {
        let mut tx = self.pool.begin().await?;
        let now = Self::now_millis();

        let updated = sqlx::query(
            "UPDATE forms SET form_version = form_version + 1, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(form_id.get())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(FormError::FormNotFound(form_id));
        }

        let version: i64 = sqlx::query("SELECT form_version FROM forms WHERE id = ?")
            .bind(form_id.get())
            .fetch_one(&mut *tx)
            .await?
            .get("form_version");

        let result = sqlx::query(
            "INSERT INTO form_instances (form_id, form_version, fields, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(form_id.get())
        .bind(version)
        .bind(fields_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(FormInstance {
            id: FormInstanceId::new(result.last_insert_rowid()),
            form_id,
            form_version: version as u32,
            fields,
            created_at: Self::millis_to_datetime(now),
        })
    }

    fn row_to_form_data(row: &SqliteRow) -> Result<FormData> {
        let fields: String = row.get("fields");
        let version: i64 = row.get("instance_version");

        Ok(FormData {
            id: FormId::new(row.get("id")),
            user_id: UserId::new(row.get("user_id")),
            name: row.get("name"),
            description: row.get("description"),
            created_at: Self::millis_to_datetime(row.get("created_at")),
            updated_at: Self::millis_to_datetime(row.get("updated_at")),
            form_version: version as u32,
            instance_id: FormInstanceId::new(row.get("instance_id")),
            fields: serde_json::from_str(&fields)?,
        })
    }

    fn row_to_instance(row: &SqliteRow) -> Result<FormInstance> {
        let fields: String = row.get("fields");
        let version: i64 = row.get("form_version");

        Ok(FormInstance {
            id: FormInstanceId::new(row.get("id")),
            form_id: FormId::new(row.get("form_id")),
            form_version: version as u32,
            fields: serde_json::from_str(&fields)?,
            created_at: Self::millis_to_datetime(row.get("created_at")),
        })
    }
}
