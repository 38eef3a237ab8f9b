//! Validation of the circular-refs fixture, end to end

use oas_refs_common::{CircularPolicy, ParserOptions};
use oas_refs_validator::validate;

fn circular_fixture() -> String {
    format!(
        "{}/../engine/tests/fixtures/circular/circular.yaml",
        env!("CARGO_MANIFEST_DIR")
    )
}

fn options(circular: CircularPolicy) -> ParserOptions {
    let mut options = ParserOptions::default();
    options.dereference.circular = circular;
    options
}

#[tokio::test]
async fn test_validate_succeeds_with_default_policy() {
    let api = validate(&circular_fixture(), ParserOptions::default())
        .await
        .unwrap();
    // Cycles were materialized, with identity intact
    assert_eq!(
        api.node_at("/definitions/person/properties/spouse").unwrap(),
        api.node_at("/definitions/person").unwrap()
    );
}

#[tokio::test]
async fn test_validate_ignore_keeps_circular_refs() {
    let api = validate(&circular_fixture(), options(CircularPolicy::Ignore))
        .await
        .unwrap();
    let value = api.to_value().unwrap();
    assert_eq!(
        value["definitions"]["person"]["properties"]["spouse"]["$ref"],
        "person.yaml"
    );
    assert_eq!(
        api.node_at("/paths/~1pet/get/responses/200/schema").unwrap(),
        api.node_at("/definitions/pet").unwrap()
    );
}

#[tokio::test]
async fn test_validate_forbid_fails_on_circular_api() {
    let err = validate(&circular_fixture(), options(CircularPolicy::Forbid))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "The API contains circular references");
}

#[tokio::test]
async fn test_validate_reports_structural_violations() {
    let broken = format!(
        "{}/tests/fixtures/invalid.yaml",
        env!("CARGO_MANIFEST_DIR")
    );
    let err = validate(&broken, ParserOptions::default()).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("API validation failed"), "unexpected error: {msg}");
    assert!(msg.contains("/responses/999"), "unexpected error: {msg}");
}
