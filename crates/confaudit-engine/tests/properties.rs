// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeSet;

use confaudit_engine::validate;
use confaudit_model::{
    ExpectedConfig, ExpectedValue, ResolvedVia, Scalar, Severity, Snapshot, SnapshotBuilder,
    Status,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ._-]{0,12}".prop_map(Value::String),
    ]
}

fn json_tree() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z_]{1,8}", inner, 0..5)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn expected_value() -> impl Strategy<Value = ExpectedValue> {
    prop_oneof![
        "[a-zA-Z0-9 %@x]{0,10}".prop_map(ExpectedValue::text),
        (0u32..100_000).prop_map(|n| ExpectedValue::number(f64::from(n))),
        any::<bool>().prop_map(|b| ExpectedValue::Scalar(Scalar::Bool(b))),
        Just(ExpectedValue::Scalar(Scalar::Null)),
    ]
}

fn expected_config() -> impl Strategy<Value = ExpectedConfig> {
    prop::collection::btree_map("[a-zA-Z][a-zA-Z0-9 _]{0,11}", expected_value(), 0..8).prop_map(
        |entries| ExpectedConfig::from_entries(entries).expect("unique keys"),
    )
}

fn self_referencing_snapshot(label: &str) -> Snapshot {
    let mut builder = SnapshotBuilder::new();
    let root = builder.map();
    let inner = builder.map();
    let list = builder.seq();
    let text = builder.string(label);
    builder.insert(root, "name", text).expect("insert");
    builder.insert(root, "inner", inner).expect("insert");
    builder.insert(inner, "loop", root).expect("insert");
    builder.insert(inner, "items", list).expect("insert");
    builder.push(list, inner).expect("push");
    builder.push(list, list).expect("push");
    builder.finish(root).expect("finish")
}

proptest! {
    #[test]
    fn every_entry_yields_exactly_one_check(snapshot in json_tree(), config in expected_config()) {
        let report = validate(&Snapshot::from_json(&snapshot), &config);
        prop_assert_eq!(report.total_checks, config.len());
        prop_assert_eq!(
            report.details.iter().map(|d| d.key.as_str()).collect::<Vec<_>>(),
            config.keys().collect::<Vec<_>>()
        );
        prop_assert_eq!(
            report.matched_count + report.partial_count + report.mismatched_count,
            report.total_checks
        );
        prop_assert!(report.match_percentage <= 100);
        prop_assert_eq!(
            report.recommendations.len(),
            report.total_checks - report.matched_count
        );
    }

    #[test]
    fn direct_path_beats_alias_candidates(value in "[a-z]{1,10}", decoy in "[A-Z]{1,10}") {
        let snapshot = Snapshot::from_json(&json!({
            "osmuilanguages": decoy,
            "nested": {"applanguage": "nested"},
            "applanguage": value.clone()
        }));
        let config =
            ExpectedConfig::from_entries([("applanguage", ExpectedValue::text(value.clone()))])
                .expect("config");
        let report = validate(&snapshot, &config);
        let check = report.check("applanguage").expect("check");
        prop_assert_eq!(check.resolved_via, ResolvedVia::Path);
        prop_assert_eq!(check.actual.clone(), Some(Value::String(value)));
        prop_assert_eq!(check.status, Status::Matched);
    }

    #[test]
    fn cyclic_snapshots_terminate(label in "[a-z]{0,8}", config in expected_config()) {
        let snapshot = self_referencing_snapshot(&label);
        let report = validate(&snapshot, &config);
        prop_assert_eq!(report.total_checks, config.len());
    }

    #[test]
    fn mapping_takes_the_worst_sub_severity(states in prop::collection::vec(0u8..3, 1..6)) {
        // 0 = present and equal, 1 = present but different, 2 = absent
        let mut ui = Map::new();
        let mut entries = Vec::new();
        for (i, state) in states.iter().enumerate() {
            let name = format!("flag{i}");
            match state {
                0 => {
                    ui.insert(name.clone(), Value::Bool(true));
                }
                1 => {
                    ui.insert(name.clone(), Value::Bool(false));
                }
                _ => {}
            }
            entries.push((name, ExpectedValue::Scalar(Scalar::Bool(true))));
        }
        let snapshot = Snapshot::from_json(&json!({"ui": Value::Object(ui)}));
        let config = ExpectedConfig::from_entries([("ui", ExpectedValue::Mapping(entries))])
            .expect("config");
        let check = validate(&snapshot, &config).check("ui").expect("check").clone();

        let worst = states
            .iter()
            .map(|s| match s {
                0 => Severity::Low,
                1 => Severity::Medium,
                _ => Severity::High,
            })
            .max()
            .unwrap_or(Severity::Low);
        prop_assert_eq!(check.severity, worst);
        let all_equal = states.iter().all(|s| *s == 0);
        prop_assert_eq!(check.status == Status::Matched, all_equal);
        let reported: BTreeSet<_> = check
            .explanation
            .trim_start_matches("Nested checks: ")
            .split(", ")
            .map(|part| part.split('=').next().unwrap_or_default().to_string())
            .collect();
        prop_assert_eq!(reported.len(), states.len());
    }
}
