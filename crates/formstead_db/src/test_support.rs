use crate::{SqliteStore, StoreConfig};
use formstead_ids::UserId;
use formstead_schema::{ConstraintSpec, FieldSpec};

pub(crate) async fn store_with_user() -> (SqliteStore, UserId) {
    let store = SqliteStore::open_in_memory(StoreConfig::default()).await.unwrap();
    let user = store.create_user("Alice", "alice@example.com").await.unwrap();
    (store, user)
}

pub(crate) fn contact_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("name", "string").with_constraint(ConstraintSpec::named("required")),
        FieldSpec::new("email", "string")
            .with_constraint(ConstraintSpec::named("email"))
            .with_constraint(ConstraintSpec::named("unique")),
        FieldSpec::new("message", "string"),
    ]
}
