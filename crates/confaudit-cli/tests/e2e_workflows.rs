// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;

const SNAPSHOT: &str = r#"{
  "CsName": "HOST01",
  "CsManufacturer": "Dell Inc.",
  "CsModel": "Latitude 7440",
  "OsName": "Microsoft Windows 11 Pro",
  "OsRegisteredUser": "alice",
  "OsLocale": "en-US",
  "net_if_addrs": {"lo": [{"address": "127.0.0.1"}]},
  "ui": {
    "displays": {"Screens": [{"Width": 1920, "Height": 1080}]},
    "dpi": 120,
    "theme": {"Apps": 0}
  }
}"#;

const MATCHING: &str = "resolution: FHD\ndpiScaling: 125%\nnetwork: Offline\n\
    seriesNo: alice@HOST01\nOS Theme: Dark\n";

const WRONG_MACHINE: &str = "resolution: 2560x1440\ndpiScaling: 150%\nseriesNo: bob@WS-99\n\
    OS Theme: Light\nnetwork: Offline\n";

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    fn file(&self, name: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, text).expect("write fixture");
        path
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_confaudit"));
        cmd.current_dir(self.path())
            .env("CONFAUDIT_CONFIG", self.path().join("no-such-config.toml"))
            .env_remove("RUST_LOG")
            .env_remove("CONFAUDIT_LOG_LEVEL")
            .env_remove("CONFAUDIT_LOG_JSON")
            .env_remove("CONFAUDIT_FUZZY_THRESHOLD")
            .env_remove("CONFAUDIT_DEEP_SEARCH_DEPTH")
            .env_remove("CONFAUDIT_WRONG_EXPECTATION_RATIO")
            .env_remove("CONFAUDIT_SUGGESTION_THRESHOLD");
        cmd
    }
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

#[test]
fn validate_prints_a_full_report() {
    let ws = Workspace::new();
    let snapshot = ws.file("snapshot.json", SNAPSHOT);
    let config = ws.file("expected.yml", MATCHING);

    let output = ws
        .cmd()
        .args(["--json", "validate", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run validate");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout.iter().filter(|b| **b == b'\n').count(), 1);

    let report = stdout_json(&output);
    assert_eq!(report["matchPercentage"], 100);
    assert_eq!(report["totalChecks"], 5);
    assert_eq!(report["likelyWrongExpectation"], false);
    assert_eq!(report["details"][0]["key"], "resolution");
}

#[test]
fn wrong_machine_warns_and_can_fail() {
    let ws = Workspace::new();
    let snapshot = ws.file("snapshot.json", SNAPSHOT);
    let config = ws.file("expected.yml", WRONG_MACHINE);

    let warned = ws
        .cmd()
        .args(["validate", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run validate");
    assert!(warned.status.success());
    let stderr = String::from_utf8(warned.stderr).expect("utf8 stderr");
    assert!(
        stderr.contains(
            "4 of 5 checks mismatched; the expected config may belong to another machine"
        ),
        "stderr: {stderr}"
    );

    let failed = ws
        .cmd()
        .args(["--json", "validate", "--fail-on-wrong-expectation", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run validate");
    assert_eq!(failed.status.code(), Some(3));
    assert_eq!(stdout_json(&failed)["matchPercentage"], 20);
    let stderr = String::from_utf8(failed.stderr).expect("utf8 stderr");
    let machine: Value = serde_json::from_str(
        stderr
            .lines()
            .find(|line| line.starts_with('{'))
            .expect("machine error line"),
    )
    .expect("machine error json");
    assert_eq!(machine["code"], "likely_wrong_expectation");
}

#[test]
fn validate_writes_report_file_and_uses_key_map() {
    let ws = Workspace::new();
    let snapshot = ws.file(
        "snapshot.json",
        r#"{"Registry": {"Personalize": {"AccentName": "Cobalt"}}}"#,
    );
    let config = ws.file("expected/10-accent.yml", "Accent Colour: cobalt\n");
    let key_map = ws.file("key_map.yml", "Accent Colour: Registry.Personalize.AccentName\n");
    let out = ws.path().join("reports/latest/report.json");

    let output = ws
        .cmd()
        .args(["--json", "validate", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(ws.path().join("expected"))
        .arg("--key-map")
        .arg(&key_map)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run validate");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(config.exists());
    assert_eq!(stdout_json(&output)["matchPercentage"], 100);

    let written: Value =
        serde_json::from_slice(&fs::read(&out).expect("report file")).expect("report json");
    assert_eq!(written["details"][0]["resolvedVia"], "key_map");
}

#[test]
fn unreadable_inputs_exit_with_input_failure() {
    let ws = Workspace::new();
    let config = ws.file("expected.yml", MATCHING);
    let broken = ws.file("broken.json", "{ not json");

    for snapshot in [ws.path().join("missing.json"), broken] {
        let output = ws
            .cmd()
            .args(["--json", "validate", "--snapshot"])
            .arg(&snapshot)
            .arg("--config")
            .arg(&config)
            .output()
            .expect("run validate");
        assert_eq!(output.status.code(), Some(4));
        let machine: Value =
            serde_json::from_slice(&output.stderr).expect("machine error json");
        assert_eq!(machine["code"], "input_error");
        assert!(machine["details"]["path"]
            .as_str()
            .is_some_and(|p| p.ends_with(".json")));
    }

    let empty = ws.file("empty.yml", "");
    let snapshot = ws.file("snapshot.json", SNAPSHOT);
    let output = ws
        .cmd()
        .args(["validate", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&empty)
        .output()
        .expect("run validate");
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn malformed_options_file_is_a_config_error() {
    let ws = Workspace::new();
    let options = ws.file("options.toml", "fuzzy_match_threshold = 3.0\n");
    let output = ws
        .cmd()
        .args(["--json", "config", "--config-file"])
        .arg(&options)
        .output()
        .expect("run config");
    assert_eq!(output.status.code(), Some(4));
    let machine: Value = serde_json::from_slice(&output.stderr).expect("machine error json");
    assert_eq!(machine["code"], "config_error");
}

#[test]
fn config_reports_workspace_options_file() {
    let ws = Workspace::new();
    ws.file(".confaudit/config.toml", "suggestion_threshold = 0.6\n");
    let output = ws
        .cmd()
        .args(["--json", "config"])
        .output()
        .expect("run config");
    assert!(output.status.success());
    let payload = stdout_json(&output);
    assert_eq!(payload["options"]["suggestion_threshold"], 0.6);
    assert!(payload["source"]
        .as_str()
        .is_some_and(|p| p.ends_with("config.toml")));
    assert!(payload.get("user_config").is_some());
}

#[test]
fn suggest_and_search_explore_the_snapshot() {
    let ws = Workspace::new();
    let snapshot = ws.file(
        "snapshot.json",
        r#"{"OsName": "Microsoft Windows 11 Pro", "ui": {"keyboard_layout": "00000409"}}"#,
    );
    let config = ws.file("expected.yml", "Keyboard Layout: US\n");

    let suggested = ws
        .cmd()
        .args(["--json", "suggest", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run suggest");
    assert!(suggested.status.success());
    let payload = stdout_json(&suggested);
    assert_eq!(payload["threshold"], 0.45);
    assert_eq!(payload["suggestions"][0]["path"], "ui.keyboard_layout");

    let searched = ws
        .cmd()
        .args(["--json", "search", "--snapshot"])
        .arg(&snapshot)
        .arg("windows")
        .output()
        .expect("run search");
    assert!(searched.status.success());
    let payload = stdout_json(&searched);
    assert_eq!(payload["matches"][0]["path"], "OsName");
    let similarity = payload["matches"][0]["similarity"].as_f64().expect("score");
    assert!(similarity > 0.4 && similarity < 1.0, "containment keeps its ratio");
}

#[test]
fn match_report_writes_json_and_csv() {
    let ws = Workspace::new();
    let snapshot = ws.file("snapshot.json", SNAPSHOT);
    let config = ws.file(
        "expected.yml",
        concat!(
            "categories:\n",
            "  - category: Language\n",
            "    choices: [de-DE, en-US]\n",
            "  - category: Device and Model\n",
            "    choices: [\"Dell, Latitude 7440, Windows 11 Pro\"]\n",
        ),
    );
    let out = ws.path().join("reports/match_report.json");
    let csv = ws.path().join("reports/match_table.csv");

    let output = ws
        .cmd()
        .args(["--json", "match-report", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .arg("--out")
        .arg(&out)
        .arg("--csv")
        .arg(&csv)
        .output()
        .expect("run match-report");
    assert!(output.status.success());
    let summary = stdout_json(&output);
    assert_eq!(summary["command"], "match-report");
    assert_eq!(summary["keys"], 2);

    let report: Value =
        serde_json::from_str(&fs::read_to_string(&out).expect("read report")).expect("json");
    let language = &report["Language"];
    assert_eq!(language["allowed"], serde_json::json!(["de-DE", "en-US"]));
    assert_eq!(language["exact_matches"][0]["path"], "OsLocale");
    assert_eq!(language["fuzzy_best"]["similarity"], 1.0);
    let device = &report["Device and Model"]["device_details"];
    assert_eq!(device["summary"], "Dell");
    assert_eq!(device["os"], "Windows 11 Pro");

    let table = fs::read_to_string(&csv).expect("read table");
    let rows: Vec<&str> = table.lines().collect();
    assert_eq!(
        rows[0],
        "config_key,best_allowed,similarity,source_path,source_value,exact_match"
    );
    assert_eq!(rows[1], "Language,en-US,1,OsLocale,en-US,true");
    assert!(rows[2].starts_with("Device and Model,\"Dell, Latitude 7440, Windows 11 Pro\","));
    assert!(rows[2].ends_with(",false"));
}

#[test]
fn match_report_prints_to_stdout_without_out() {
    let ws = Workspace::new();
    let snapshot = ws.file("snapshot.json", SNAPSHOT);
    let config = ws.file("expected.yml", "names: [\"Dell, Latitude 7440\"]\n");
    let output = ws
        .cmd()
        .args(["--json", "match-report", "--min-similarity", "0.9", "--snapshot"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("run match-report");
    assert!(output.status.success());
    let report = stdout_json(&output);
    let entry = &report["deviceandmodel"];
    assert_eq!(entry["device_details"]["summary"], "Dell");
    assert_eq!(entry["device_details"]["misc"], "Latitude 7440");
    assert!(entry["all_matches"]
        .as_array()
        .is_some_and(|hits| hits.iter().all(|h| h["similarity"].as_f64() >= Some(0.9))));
}
