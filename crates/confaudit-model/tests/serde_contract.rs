// SPDX-License-Identifier: Apache-2.0

use confaudit_model::{
    ExpectedConfig, ExpectedValue, Recommendation, Scalar, Severity, Snapshot, Status,
    ValidationReport,
};
use serde_json::json;

#[test]
fn expected_values_serialize_as_plain_json() {
    let config = ExpectedConfig::from_entries([
        ("resolution", ExpectedValue::text("FHD")),
        ("ram_gb", ExpectedValue::number(16.0)),
        ("ratio", ExpectedValue::number(1.5)),
        ("secure_boot", ExpectedValue::Scalar(Scalar::Bool(true))),
        ("network", ExpectedValue::Scalar(Scalar::Null)),
        (
            "langs",
            ExpectedValue::List(vec![ExpectedValue::text("en-US")]),
        ),
        (
            "ui",
            ExpectedValue::Mapping(vec![("dpi".to_string(), ExpectedValue::number(120.0))]),
        ),
    ])
    .expect("config");

    assert_eq!(
        serde_json::to_value(&config).expect("encode"),
        json!({
            "resolution": "FHD",
            "ram_gb": 16,
            "ratio": 1.5,
            "secure_boot": true,
            "network": null,
            "langs": ["en-US"],
            "ui": {"dpi": 120}
        })
    );
}

#[test]
fn expected_value_decodes_from_json() {
    let value: ExpectedValue =
        serde_json::from_value(json!({"b": [1, "x"], "a": false})).expect("decode");
    assert_eq!(
        value,
        ExpectedValue::Mapping(vec![
            (
                "b".to_string(),
                ExpectedValue::List(vec![ExpectedValue::number(1.0), ExpectedValue::text("x")])
            ),
            ("a".to_string(), ExpectedValue::Scalar(Scalar::Bool(false))),
        ])
    );
}

#[test]
fn choices_round_trip_through_serde() {
    let value = ExpectedValue::Choices(vec!["Dark".to_string(), "Light".to_string()]);
    let encoded = serde_json::to_value(&value).expect("encode");
    assert_eq!(encoded, json!({"choices": ["Dark", "Light"]}));
    let decoded: ExpectedValue = serde_json::from_value(encoded).expect("decode");
    assert_eq!(decoded, value);
}

#[test]
fn snapshot_serializes_its_tree() {
    let doc = json!({"ui": {"dpi": 120, "theme": {"Apps": 0}}, "tags": ["a", null]});
    let snapshot: Snapshot = serde_json::from_value(doc.clone()).expect("decode");
    assert_eq!(serde_json::to_value(&snapshot).expect("encode"), doc);
}

#[test]
fn report_roundtrips_with_snake_case_enums() {
    let report = ValidationReport {
        summary: "Validation performed: 0% checks matched".to_string(),
        match_percentage: 0,
        matched_count: 0,
        partial_count: 0,
        mismatched_count: 1,
        total_checks: 1,
        mismatch_ratio: 1.0,
        likely_wrong_expectation: true,
        expectation_digest: "0".repeat(64),
        details: Vec::new(),
        recommendations: vec![Recommendation {
            key: "network".to_string(),
            suggestion: "Review expected Online; actual: missing".to_string(),
            impact: Severity::High,
        }],
    };
    let value = serde_json::to_value(&report).expect("encode");
    assert_eq!(value["recommendations"][0]["impact"], json!("high"));
    assert_eq!(value["likelyWrongExpectation"], json!(true));
    let back: ValidationReport = serde_json::from_value(value).expect("decode");
    assert_eq!(back, report);
    assert_eq!(
        serde_json::to_value(Status::Mismatched).expect("status"),
        json!("mismatched")
    );
}
