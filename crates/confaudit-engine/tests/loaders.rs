// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::PathBuf;

use confaudit_engine::{
    load_expected_config, load_key_map, load_snapshot, validate, Engine, EngineOptions, LoadError,
};
use confaudit_model::{ExpectedValue, ResolvedVia, Status};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn choices(items: &[&str]) -> ExpectedValue {
    ExpectedValue::Choices(items.iter().map(|s| (*s).to_string()).collect())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("confaudit_engine=debug")
        .try_init();
}

#[test]
fn directory_configs_merge_in_file_name_order() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("10-base.yml"), "resolution: FHD\nnetwork: Online\n").expect("write");
    fs::write(dir.path().join("20-site.yaml"), "- network: Offline\n- OS Theme: Dark\n")
        .expect("write");
    fs::write(dir.path().join("notes.txt"), "ignored: true\n").expect("write");
    fs::create_dir(dir.path().join("nested.yml")).expect("mkdir");

    let config = load_expected_config(dir.path()).expect("merged config");
    assert_eq!(
        config.keys().collect::<Vec<_>>(),
        vec!["resolution", "network", "OS Theme"]
    );
    assert_eq!(config.get("network"), Some(&ExpectedValue::text("Offline")));
}

#[test]
fn empty_directory_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("readme.md"), "# nothing\n").expect("write");
    let err = load_expected_config(dir.path()).expect_err("empty");
    assert!(matches!(err, LoadError::Empty { .. }));
    assert_eq!(err.to_string(), "expected config directory is empty");
}

#[test]
fn empty_files_in_a_directory_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("00-placeholder.yaml"), "").expect("write");
    fs::write(dir.path().join("10-base.yml"), "resolution: FHD\n").expect("write");
    fs::write(dir.path().join("20-comments.yml"), "# nothing yet\n").expect("write");
    fs::write(dir.path().join("30-empty-map.yml"), "{}\n").expect("write");

    let config = load_expected_config(dir.path()).expect("merged config");
    assert_eq!(config.keys().collect::<Vec<_>>(), vec!["resolution"]);
}

#[test]
fn categories_document_declares_choices_per_category() {
    let config = load_expected_config(&fixture("categories_expected.yml")).expect("config");
    assert_eq!(
        config.keys().collect::<Vec<_>>(),
        vec!["OS Theme", "resolution", "Network"]
    );
    assert_eq!(config.get("OS Theme"), Some(&choices(&["Light", "Dark"])));
    assert_eq!(config.get("resolution"), Some(&choices(&["FHD", "2560x1440"])));

    let snapshot = load_snapshot(&fixture("workstation_snapshot.json")).expect("snapshot");
    let report = validate(&snapshot, &config);
    assert_eq!(report.check("OS Theme").expect("check").status, Status::Matched);
    assert_eq!(report.check("resolution").expect("check").status, Status::Matched);
    assert_ne!(report.check("Network").expect("check").status, Status::Matched);
}

#[test]
fn names_document_lists_acceptable_devices() {
    let config = load_expected_config(&fixture("names_expected.yml")).expect("config");
    assert_eq!(config.len(), 1);
    assert_eq!(
        config.get("deviceandmodel"),
        Some(&choices(&["Lenovo, ThinkPad X1 Carbon", "Dell, Latitude 7440"]))
    );

    let snapshot = load_snapshot(&fixture("workstation_snapshot.json")).expect("snapshot");
    let report = validate(&snapshot, &config);
    let check = report.check("deviceandmodel").expect("check");
    assert_eq!(check.resolved_via, ResolvedVia::Synthesized);
    assert_eq!(check.status, Status::Matched);
}

#[test]
fn choices_mapping_value_accepts_any_listed_value() {
    let config = load_expected_config(&fixture("choices_expected.yml")).expect("config");
    assert_eq!(config.get("dpiScaling"), Some(&choices(&["150%", "125%"])));
    assert_eq!(config.get("OS Language"), Some(&ExpectedValue::text("English")));

    let snapshot = load_snapshot(&fixture("workstation_snapshot.json")).expect("snapshot");
    let report = validate(&snapshot, &config);
    let dpi = report.check("dpiScaling").expect("check");
    assert_eq!(dpi.status, Status::Matched);
    assert!(dpi.explanation.starts_with("Choice '125%'"));
    assert_eq!(report.match_percentage, 100);
}

#[test]
fn malformed_categories_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cases = [
        ("not-mapping.yml", "categories:\n  - Theme\n"),
        ("unnamed.yml", "categories:\n  - choices: [a]\n"),
        ("bad-choice.yml", "categories:\n  - name: Theme\n    choices: [{a: 1}]\n"),
    ];
    let mut errors = Vec::new();
    for (name, text) in cases {
        let path = dir.path().join(name);
        fs::write(&path, text).expect("write");
        errors.push(load_expected_config(&path).expect_err(name));
    }
    assert!(matches!(errors[0], LoadError::UnsupportedCategory { index: 0, found: "string" }));
    assert!(matches!(errors[1], LoadError::UnnamedCategory { index: 0 }));
    assert!(matches!(errors[2], LoadError::InvalidChoice { found: "mapping" }));
}

#[test]
fn broken_file_in_directory_fails_the_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.yml"), "resolution: FHD\n").expect("write");
    fs::write(dir.path().join("b.yml"), "resolution: [FHD\n").expect("write");
    assert!(matches!(
        load_expected_config(dir.path()),
        Err(LoadError::Parse { .. })
    ));
}

#[test]
fn missing_files_report_their_path() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent.json");
    let err = load_snapshot(&missing).expect_err("missing snapshot");
    assert!(matches!(err, LoadError::Read { .. }));
    assert!(err.to_string().contains("absent.json"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn key_map_file_redirects_resolution() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let snapshot_path = dir.path().join("snapshot.json");
    let map_path = dir.path().join("key_map.yml");
    let config_path = dir.path().join("expected.yml");
    fs::write(
        &snapshot_path,
        r#"{"Theme": "wrong", "Registry": {"Personalize": {"AccentName": "Cobalt"}}}"#,
    )
    .expect("write");
    fs::write(&map_path, "Accent Colour: Registry.Personalize.AccentName\n").expect("write");
    fs::write(&config_path, "Accent Colour: cobalt\n").expect("write");

    let snapshot = load_snapshot(&snapshot_path).expect("snapshot");
    let config = load_expected_config(&config_path).expect("config");
    let key_map = load_key_map(&map_path).expect("key map");
    assert_eq!(key_map.len(), 1);

    let report = Engine::new(EngineOptions::default())
        .with_key_map(key_map)
        .validate(&snapshot, &config);
    let check = report.check("Accent Colour").expect("check");
    assert_eq!(check.resolved_via, ResolvedVia::KeyMap);
    assert_eq!(check.status, Status::Matched);

    let unmapped = validate(&snapshot, &config);
    assert_eq!(
        unmapped.check("Accent Colour").expect("check").status,
        Status::Mismatched
    );
}
