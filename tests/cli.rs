//! Exit codes and output of the `json-tyck` binary.

use std::process::{Command, Output};

const SCHEMA: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/review.json");

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_json-tyck"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("binary should run")
}

#[test]
fn valid_document_exits_zero() {
    let out = run(&[r#"{"status":"Draft"}"#, SCHEMA]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("valid"));
}

#[test]
fn diagnostics_exit_one() {
    let out = run(&[r#"{"status":"Draft","reason":"because"}"#, SCHEMA]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("$.reason"), "stdout: {stdout}");
    assert!(stdout.contains("FieldMustBeAbsent"), "stdout: {stdout}");
}

#[test]
fn explicit_unknown_type_exits_two() {
    let out = run(&["--type", "Nope", "{}", SCHEMA]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("failed to resolve root type"), "stderr: {stderr}");
    assert!(stderr.contains("Nope"), "stderr: {stderr}");
}

#[test]
fn schema_without_default_root_exits_two() {
    let dir = std::env::temp_dir().join(format!("json-tyck-noroot-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let schema = dir.join("schema.json");
    std::fs::write(
        &schema,
        r#"{"types":{"A":{"kind":"named","name":"Int"},"B":{"kind":"named","name":"String"}}}"#,
    )
    .unwrap();
    let out = run(&["{}", schema.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to resolve root type"));

    let out = run(&["--type", "A", "3", schema.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn json_format_lists_diagnostics() {
    let out = run(&["--format", "json", r#"{"status":"Pending"}"#, SCHEMA]);
    assert_eq!(out.status.code(), Some(1));
    let errors: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(errors[0]["path"], "$.status");
    assert_eq!(errors[0]["code"], "TypeMismatch");
    assert_eq!(errors[0]["category"], "TypeError");
}

#[test]
fn json_input_may_be_a_file() {
    let dir = std::env::temp_dir().join(format!("json-tyck-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let input = dir.join("doc.json");
    std::fs::write(&input, r#"{"status":"Rejected","reason":"spam"}"#).unwrap();
    let out = run(&[input.to_str().unwrap(), SCHEMA]);
    assert_eq!(out.status.code(), Some(0));
    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_schema_exits_two() {
    let out = run(&["{}", "/definitely/not/here.json"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to load schema"));
}

#[test]
fn usage_error_exits_two() {
    let out = run(&["{}"]);
    assert_eq!(out.status.code(), Some(2));
}
