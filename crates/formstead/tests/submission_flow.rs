//! End-to-end submission behavior against an on-disk database.

use formstead::{AppConfig, Environment, SubmissionProcessor};
use formstead_db::{FormError, FormStore, RequestContext, SqliteStore, SubmissionStore};
use formstead_ids::{FormId, UserId};
use formstead_schema::{ConstraintSpec, FieldSpec};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    _tmp: TempDir,
    store: Arc<SqliteStore>,
    processor: SubmissionProcessor,
    user: UserId,
}

async fn harness(environment: Environment) -> Harness {
    let tmp = TempDir::new().unwrap();
    let config = AppConfig::new(environment, tmp.path().join("formstead.sqlite3"));
    let store = Arc::new(
        SqliteStore::open(&config.db_path, config.store_config())
            .await
            .unwrap(),
    );
    let user = store.create_user("Alice", "alice@example.com").await.unwrap();
    let processor = SubmissionProcessor::new(store.clone(), store.clone());
    Harness {
        _tmp: tmp,
        store,
        processor,
        user,
    }
}

fn email_only() -> Vec<FieldSpec> {
    vec![FieldSpec::new("email", "string").with_constraint(ConstraintSpec::named("unique"))]
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

async fn submit(h: &Harness, form_id: FormId, items: &[(&str, &str)]) -> Result<i64, FormError> {
    h.processor
        .process(form_id, &pairs(items), &RequestContext::new())
        .await
        .map(|id| id.get())
}

#[tokio::test]
async fn test_unique_email_scenario() {
    let h = harness(Environment::Testing).await;
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();

    let first = submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap();
    assert!(first > 0);

    let err = submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap_err();
    assert!(matches!(err, FormError::DuplicateUniqueField { ref field } if field == "email"));

    let third = submit(&h, form_id, &[("email", "c@d.com")]).await.unwrap();
    assert!(third > first);
}

#[tokio::test]
async fn test_uniqueness_resets_with_new_version() {
    let h = harness(Environment::Testing).await;
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();
    submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap();

    h.store.redefine_fields(form_id, &email_only()).await.unwrap();
    submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap();

    // ...but is enforced again within the new version
    let err = submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap_err();
    assert!(matches!(err, FormError::DuplicateUniqueField { .. }));

    let records = h.store.list_submissions(form_id).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_ne!(records[0].form_instance_id, records[1].form_instance_id);
}

#[tokio::test]
async fn test_submission_binds_to_live_instance() {
    let h = harness(Environment::Testing).await;
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();
    let v1 = h.store.resolve_live_instance_id(form_id).await.unwrap();

    let id = submit(&h, form_id, &[("email", "a@b.com")]).await.unwrap();
    let v2 = h
        .store
        .redefine_fields(form_id, &[FieldSpec::new("phone", "string")])
        .await
        .unwrap();

    let record = h.store.get_submission(formstead_ids::SubmissionId::new(id)).await.unwrap();
    assert_eq!(record.form_instance_id, v1);
    assert_ne!(v1, v2.id);

    // The old field no longer exists on the live version and is skipped
    let id = submit(&h, form_id, &[("email", "x@y.com"), ("phone", "555")]).await.unwrap();
    let record = h.store.get_submission(formstead_ids::SubmissionId::new(id)).await.unwrap();
    assert_eq!(record.form_instance_id, v2.id);
    assert_eq!(record.fields.len(), 1);
    assert_eq!(record.fields[0].name, "phone");
}

#[tokio::test]
async fn test_type_mismatch_only_for_declared_int() {
    let h = harness(Environment::Testing).await;
    let form_id = h
        .store
        .create_form(
            h.user,
            "Types",
            "",
            &[FieldSpec::new("count", "int"), FieldSpec::new("label", "string")],
        )
        .await
        .unwrap();

    let err = submit(&h, form_id, &[("count", "abc")]).await.unwrap_err();
    assert!(matches!(err, FormError::InvalidFieldType { ref field, .. } if field == "count"));

    submit(&h, form_id, &[("label", "abc")]).await.unwrap();
}

#[tokio::test]
async fn test_failed_validation_stores_nothing() {
    let h = harness(Environment::Testing).await;
    let form_id = h
        .store
        .create_form(
            h.user,
            "Four",
            "",
            &[
                FieldSpec::new("a", "string"),
                FieldSpec::new("b", "string"),
                FieldSpec::new("c", "int"),
                FieldSpec::new("d", "string").with_constraint(ConstraintSpec::named("unique")),
            ],
        )
        .await
        .unwrap();

    let err = submit(&h, form_id, &[("a", "1"), ("b", "2"), ("c", "three"), ("d", "4")])
        .await
        .unwrap_err();
    assert!(matches!(err, FormError::InvalidFieldType { .. }));

    assert!(h.store.list_submissions(form_id).await.unwrap().is_empty());
    let instance = h.store.resolve_live_instance_id(form_id).await.unwrap();
    assert!(h.store.uniqueness_records(instance).await.unwrap().is_empty());

    // The unique value of the rejected submission is still free
    submit(&h, form_id, &[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_round_trip_and_idempotent_reads() {
    let h = harness(Environment::Testing).await;
    let fields: Vec<FieldSpec> = serde_json::from_str(
        r#"[
            {"field_name": "name", "field_type": "string",
             "field_constraints": [{"constraint_name": "required"}]},
            {"field_name": "age", "field_type": "int",
             "field_constraints": [{"constraint_name": "interval", "min": 0, "max": 150}]},
            {"field_name": "ratio", "field_type": "float",
             "field_constraints": [{"constraint_name": "interval", "min": 0.5, "max": 2.5}]},
            {"field_name": "born", "field_type": "datetime",
             "field_constraints": [{"constraint_name": "interval",
                                    "min": "1900-01-01T00:00:00Z", "max": "2025-01-01T00:00:00Z"}]},
            {"field_name": "extra", "field_type": "json", "field_constraints": []}
        ]"#,
    )
    .unwrap();

    let form_id = h.store.create_form(h.user, "Profile", "", &fields).await.unwrap();
    let first = h.store.get_form(form_id).await.unwrap();
    let second = h.store.get_form(form_id).await.unwrap();
    assert_eq!(first, second);

    let reread: Vec<FieldSpec> = first.fields.iter().map(|f| f.to_spec()).collect();
    assert_eq!(
        serde_json::to_string(&reread).unwrap(),
        serde_json::to_string(&fields).unwrap()
    );
}

#[tokio::test]
async fn test_invalid_definition_leaves_no_rows() {
    let h = harness(Environment::Testing).await;

    for (name, fields) in [("", email_only()), ("Empty", Vec::new())] {
        let err = h.store.create_form(h.user, name, "", &fields).await.unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }
    assert!(h.store.get_forms_by_user(h.user).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_duplicate_submissions() {
    let h = Arc::new(harness(Environment::Testing).await);
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();

    let a = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { submit(&h, form_id, &[("email", "race@b.com")]).await })
    };
    let b = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { submit(&h, form_id, &[("email", "race@b.com")]).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let dup = results
        .iter()
        .filter(|r| matches!(r, Err(FormError::DuplicateUniqueField { .. })))
        .count();
    assert_eq!((ok, dup), (1, 1));
}

#[tokio::test]
async fn test_request_deadline_caps_transaction() {
    let h = harness(Environment::Development).await;
    assert_eq!(h.store.config().transaction_timeout, Duration::from_secs(3600));
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();

    let ctx = RequestContext::new().with_deadline(tokio::time::Instant::now());
    let err = h
        .processor
        .process(form_id, &pairs(&[("email", "late@b.com")]), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, FormError::TransactionTimeout(_)));
    assert!(h.store.list_submissions(form_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_metadata_is_recorded() {
    let h = harness(Environment::Testing).await;
    let form_id = h.store.create_form(h.user, "Signup", "", &email_only()).await.unwrap();

    let ctx = RequestContext::new().with_metadata(serde_json::json!({
        "user_agent": "curl/8.0",
        "ip_address": "10.0.0.1",
    }));
    let id = h
        .processor
        .process(form_id, &pairs(&[("email", "a@b.com")]), &ctx)
        .await
        .unwrap();

    let record = h.store.get_submission(id).await.unwrap();
    assert_eq!(record.metadata["user_agent"], "curl/8.0");
    assert_eq!(record.metadata["ip_address"], "10.0.0.1");
}
