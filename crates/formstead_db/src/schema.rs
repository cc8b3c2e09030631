//! Database schema creation for all Formstead tables.
//!
//! All CREATE TABLE statements live here - single source of truth.

use crate::error::Result;
use crate::SqliteStore;
use tracing::info;

impl SqliteStore {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        // Connection options already set these for file databases; repeat
        // them so in-memory and externally supplied pools agree.
        sqlx::query("PRAGMA foreign_keys=ON")
            .execute(&self.pool)
            .await?;

        self.create_form_tables().await?;
        self.create_submission_tables().await?;

        info!("Database schema verified");
        Ok(())
    }

    /// Users, forms and their immutable schema versions
    async fn create_form_tables(&self) -> Result<()> {
        // Users: only referenced for ownership
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // Forms: logical form, form_version tracks the live instance
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS forms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                form_version INTEGER NOT NULL DEFAULT 1,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_forms_user ON forms(user_id)")
            .execute(&self.pool)
            .await?;

        // Form instances: one row per schema version, never updated
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS form_instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                form_id INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                form_version INTEGER NOT NULL,
                fields TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(form_id, form_version)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Submissions, their field values and the uniqueness index
    async fn create_submission_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS submissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                form_id INTEGER NOT NULL REFERENCES forms(id) ON DELETE CASCADE,
                form_instance_id INTEGER NOT NULL REFERENCES form_instances(id) ON DELETE CASCADE,
                metadata TEXT NOT NULL DEFAULT '{}',
                submitted_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_form ON submissions(form_id)")
            .execute(&self.pool)
            .await?;

        // Field values: content is canonical JSON, or the fingerprint when hashed
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS submission_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                submission_id INTEGER NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
                field_name TEXT NOT NULL,
                field_type TEXT NOT NULL,
                content TEXT NOT NULL,
                hashed INTEGER NOT NULL DEFAULT 0,
                UNIQUE(submission_id, field_name)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // One row per stored value of a `unique` field. The UNIQUE constraint
        // is what makes concurrent duplicate submissions lose.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS unique_submission_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                form_instance_id INTEGER NOT NULL REFERENCES form_instances(id) ON DELETE CASCADE,
                field_name TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                submission_id INTEGER NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
                UNIQUE(form_instance_id, field_name, fingerprint)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
