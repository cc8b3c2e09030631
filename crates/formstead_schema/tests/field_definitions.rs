//! Field definitions as callers send them, end to end through validation.

use formstead_schema::{
    check_value, matches_type, validate_fields, Bound, Constraint, FieldDescriptor, FieldSpec,
    FieldType, FieldValue, ValidationError,
};

const CONTACT_FORM: &str = r#"[
    {"field_name": "name", "field_type": "string",
     "field_constraints": [{"constraint_name": "required"}]},
    {"field_name": "email", "field_type": "string",
     "field_constraints": [{"constraint_name": "email"}, {"constraint_name": "unique"}]},
    {"field_name": "age", "field_type": "int",
     "field_constraints": [{"constraint_name": "interval", "min": 0, "max": 150}]},
    {"field_name": "born", "field_type": "datetime",
     "field_constraints": [{"constraint_name": "interval",
                            "min": "1900-01-01T00:00:00Z", "max": "2025-01-01T00:00:00Z"}]},
    {"field_name": "message", "field_type": "string", "field_constraints": null}
]"#;

#[test]
fn test_contact_form_validates() {
    let specs: Vec<FieldSpec> = serde_json::from_str(CONTACT_FORM).unwrap();
    let fields = validate_fields(&specs).unwrap();

    assert_eq!(
        fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        ["name", "email", "age", "born", "message"]
    );
    assert_eq!(fields[2].field_type, FieldType::Int);
    assert_eq!(
        fields[2].constraints,
        vec![Constraint::Interval { min: Bound::Int(0), max: Bound::Int(150) }]
    );
    assert!(fields[1].is_unique());
    assert!(fields[4].constraints.is_empty());
}

#[test]
fn test_stored_json_round_trips() {
    let specs: Vec<FieldSpec> = serde_json::from_str(CONTACT_FORM).unwrap();
    let fields = validate_fields(&specs).unwrap();

    let stored = serde_json::to_string(&fields).unwrap();
    let reloaded: Vec<FieldDescriptor> = serde_json::from_str(&stored).unwrap();
    assert_eq!(reloaded, fields);

    // Serializing again yields the same bytes
    assert_eq!(serde_json::to_string(&reloaded).unwrap(), stored);
}

#[test]
fn test_bad_interval_in_one_field_rejects_the_list() {
    let specs = vec![
        FieldSpec::new("ok", "string"),
        FieldSpec::new("score", "float").with_constraint(
            formstead_schema::ConstraintSpec::interval(serde_json::json!(9.5), serde_json::json!(1)),
        ),
    ];
    let err = validate_fields(&specs).unwrap_err();
    match err {
        ValidationError::InField { field, source } => {
            assert_eq!(field, "score");
            assert!(matches!(*source, ValidationError::InvalidInterval(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_decoded_values_against_contact_form() {
    let specs: Vec<FieldSpec> = serde_json::from_str(CONTACT_FORM).unwrap();
    let fields = validate_fields(&specs).unwrap();
    let age = &fields[2];

    let decoded = FieldValue::decode("30", age.field_type);
    assert!(matches_type(&decoded, age.field_type));
    assert!(check_value(age, &decoded).is_ok());

    let decoded = FieldValue::decode("abc", age.field_type);
    assert!(!matches_type(&decoded, age.field_type));
    assert_eq!(decoded.kind(), "string");

    let decoded = FieldValue::decode("200", age.field_type);
    assert!(check_value(age, &decoded).is_err());
}
