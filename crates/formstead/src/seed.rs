//! Demo data for development databases.

use formstead_db::{FormError, FormStore, SqliteStore};
use formstead_ids::{FormId, UserId};
use formstead_schema::{ConstraintSpec, FieldSpec};
use serde::Serialize;
use tracing::info;

pub const DEMO_USER_NAME: &str = "Alice";
pub const DEMO_USER_EMAIL: &str = "alice@example.com";

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub user_id: UserId,
    pub form_ids: Vec<FormId>,
    /// False when the demo user already existed and nothing was written.
    pub created: bool,
}

fn contact_form_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", "string").with_constraint(ConstraintSpec::named("required")),
        FieldSpec::new("email", "string")
            .with_constraint(ConstraintSpec::named("email"))
            .with_constraint(ConstraintSpec::named("unique")),
        FieldSpec::new("subject", "string"),
        FieldSpec::new("message", "string"),
    ]
}

fn form_two_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", "string").with_constraint(ConstraintSpec::named("required")),
        FieldSpec::new("email", "string").with_constraint(ConstraintSpec::named("unique")),
    ]
}

/// Insert the demo user and the two demo forms. Safe to run repeatedly.
pub async fn seed_demo_data(store: &SqliteStore) -> Result<SeedReport, FormError> {
    if let Some(user) = store.find_user_by_email(DEMO_USER_EMAIL).await? {
        let form_ids = store
            .get_forms_by_user(user.id)
            .await?
            .into_iter()
            .map(|f| f.id)
            .collect();
        return Ok(SeedReport {
            user_id: user.id,
            form_ids,
            created: false,
        });
    }

    let user_id = store.create_user(DEMO_USER_NAME, DEMO_USER_EMAIL).await?;
    let contact = store
        .create_form(
            user_id,
            "hapaxredux.com contact form",
            "Contact form for hapaxredux.com CTA.",
            &contact_form_fields(),
        )
        .await?;
    let second = store
        .create_form(user_id, "form2", "Form Two", &form_two_fields())
        .await?;

    info!(user_id = %user_id, "Seeded demo user and forms");
    Ok(SeedReport {
        user_id,
        form_ids: vec![contact, second],
        created: true,
    })
}
