use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn popeye() -> Command {
    Command::cargo_bin("popeye").unwrap()
}

#[test]
fn test_help() {
    popeye()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sanitizer"))
        .stdout(predicate::str::contains("--namespace"));
}

#[test]
fn test_missing_config_file_exits_with_error() {
    popeye()
        .args(["--config", "/definitely/not/here.yaml", "-q"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("I/O error reading"));
}

#[test]
fn test_invalid_exclude_pattern_exits_before_connecting() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "excludes:\n  pod:\n    - \"rx:([\"").unwrap();

    popeye()
        .arg("--config")
        .arg(file.path())
        .arg("-q")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid exclude pattern"));
}

#[test]
fn test_unknown_sanitizer_flag() {
    popeye()
        .args(["-s", "deployment", "-q"])
        .env("HOME", std::env::temp_dir())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown sanitizer: deployment"));
}
