// CLI integration tests for inspect/check/tokens flows and exit codes.
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::Value;

const SCENARIO: &str = r#"{"num_angles":2,"num_markers":3,"angles":[0,10],"marker_color":[1,2,3],"marker_start":[[1,2,3,4,5,6],[7,8,9,10,11,12]],"marker_mid":[[0,0,0,0,0,0],[0,0,0,0,0,0]],"marker_end":[[0,0,0,0,0,0],[0,0,0,0,0,0]]}"#;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_markergeom");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn json_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(output)
        .lines()
        .filter(|line| line.starts_with('{'))
        .map(parse_json)
        .collect()
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write");
    path
}

#[test]
fn inspect_prints_transposed_arrays() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(temp.path(), "marker.json", SCENARIO);

    let inspect = cmd()
        .args(["inspect", path.to_str().unwrap()])
        .output()
        .expect("inspect");
    assert!(inspect.status.success());
    let value = parse_json(std::str::from_utf8(&inspect.stdout).expect("utf8").trim());
    assert_eq!(value["num_angles"], 2);
    assert_eq!(value["num_markers"], 3);
    assert_eq!(value["angles"], serde_json::json!([0, 10]));
    assert_eq!(value["marker_color"], serde_json::json!([1, 2, 3]));
    assert_eq!(
        value["marker_start"],
        serde_json::json!([1, 7, 2, 8, 3, 9, 4, 10, 5, 11, 6, 12])
    );
    assert_eq!(value["notices"], 0);
}

#[test]
fn check_reports_notices_on_stderr() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        temp.path(),
        "marker.json",
        r#"{"rig": {"id": 4}, "num_angles": 1, "num_markers": 1, "angles": [0], "marker_mid": "tbd"}"#,
    );

    let check = cmd()
        .args(["check", path.to_str().unwrap()])
        .output()
        .expect("check");
    assert!(check.status.success());
    let stdout = parse_json(std::str::from_utf8(&check.stdout).expect("utf8").trim());
    assert_eq!(stdout["ok"], true);
    assert_eq!(stdout["notices"], 2);

    let notices = json_lines(&check.stderr);
    let kinds: Vec<_> = notices
        .iter()
        .map(|notice| notice["notice"]["kind"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(kinds, vec!["unexpected_key", "non_array_field"]);
    assert_eq!(notices[1]["notice"]["key"], "marker_mid");
}

#[test]
fn tokens_emits_one_line_per_token() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(temp.path(), "doc.json", r#"{"a": [1, 2]}"#);

    let tokens = cmd()
        .args(["tokens", path.to_str().unwrap()])
        .output()
        .expect("tokens");
    assert!(tokens.status.success());
    let lines = json_lines(&tokens.stdout);
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0]["kind"], "object");
    assert_eq!(lines[0]["extent"], 5);
    assert_eq!(lines[2]["kind"], "array");
    assert_eq!(lines[2]["size"], 2);
}

#[test]
fn dimension_mismatch_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(
        temp.path(),
        "marker.json",
        r#"{"num_angles": 2, "num_markers": 1, "angles": [0, 1, 2]}"#,
    );

    let check = cmd()
        .args(["check", path.to_str().unwrap()])
        .output()
        .expect("check");
    assert_eq!(check.status.code().unwrap(), 9);
    let errors = json_lines(&check.stderr);
    let error = errors.last().expect("error line");
    assert_eq!(error["error"]["kind"], "Dimension");
    assert_eq!(error["error"]["key"], "angles");
    assert!(error["error"]["path"].as_str().unwrap().ends_with("marker.json"));
}

#[test]
fn malformed_json_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(temp.path(), "marker.json", r#"{"num_angles": [2"#);

    let check = cmd()
        .args(["check", path.to_str().unwrap()])
        .output()
        .expect("check");
    assert_eq!(check.status.code().unwrap(), 6);
}

#[test]
fn token_limit_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(temp.path(), "marker.json", SCENARIO);

    let check = cmd()
        .args(["--max-tokens", "8", "check", path.to_str().unwrap()])
        .output()
        .expect("check");
    assert_eq!(check.status.code().unwrap(), 7);
}

#[test]
fn not_found_exit_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    let missing = temp.path().join("missing.json");

    let inspect = cmd()
        .args(["inspect", missing.to_str().unwrap()])
        .output()
        .expect("inspect");
    assert_eq!(inspect.status.code().unwrap(), 3);
}

#[test]
fn usage_exit_code() {
    let unknown = cmd().args(["frobnicate"]).output().expect("run");
    assert_eq!(unknown.status.code().unwrap(), 2);

    let zero = cmd()
        .args(["--max-tokens", "0", "check", "marker.json"])
        .output()
        .expect("run");
    assert_eq!(zero.status.code().unwrap(), 2);
}

#[test]
fn pretty_inspect_prints_one_storage_row_per_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_file(temp.path(), "marker.json", SCENARIO);

    let inspect = cmd()
        .args(["inspect", path.to_str().unwrap(), "--pretty", "--color", "never"])
        .output()
        .expect("inspect");
    assert!(inspect.status.success());
    let stdout = String::from_utf8(inspect.stdout).expect("utf8");
    assert!(stdout.contains("  \"marker_start\": [\n    1, 7,\n    2, 8,\n"));
    let value = parse_json(&stdout);
    assert_eq!(value["coords_per_angle"], 6);
}
