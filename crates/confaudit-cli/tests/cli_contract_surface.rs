// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;

fn parse_commands_from_help(text: &str) -> Vec<String> {
    let mut commands = Vec::new();
    let mut in_commands = false;
    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed == "Commands:" {
            in_commands = true;
            continue;
        }
        if in_commands {
            if trimmed.is_empty() {
                break;
            }
            let entry = trimmed.trim_start();
            let name = entry.split_whitespace().next().unwrap_or("");
            if !name.is_empty() && name != "help" {
                commands.push(name.to_string());
            }
        }
    }
    commands.sort();
    commands
}

#[test]
fn help_command_surface_is_stable() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .arg("--help")
        .output()
        .expect("run help");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 help");
    let observed = parse_commands_from_help(&text);
    let expected = include_str!("snapshots/help.commands.txt")
        .lines()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(observed, expected);
    assert!(text.contains("CONFAUDIT_LOG_LEVEL"));
}

#[test]
fn version_output_contains_crate_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .arg("--version")
        .output()
        .expect("run version");
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).expect("utf8 version output");
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    let payload: serde_json::Value = serde_json::from_str(stderr.trim()).expect("machine error");
    assert_eq!(payload["code"], "usage_error");
}

#[test]
fn missing_command_is_a_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .output()
        .expect("run bare cli");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn out_of_range_threshold_is_rejected_by_the_parser() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .args(["search", "--snapshot", "s.json", "x", "--min-similarity", "2"])
        .output()
        .expect("run search");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bash_completion_mentions_every_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_confaudit"))
        .args(["completion", "bash"])
        .output()
        .expect("run completion");
    assert!(output.status.success());
    let script = String::from_utf8(output.stdout).expect("utf8 completion");
    for command in ["validate", "suggest", "search", "config"] {
        assert!(script.contains(command), "completion lacks {command}");
    }
}
