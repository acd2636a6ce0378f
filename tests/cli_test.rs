//! Process-level tests for the `textfold` filter binary.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = cargo_bin_cmd!("textfold");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--decode"))
        .stdout(predicate::str::contains("--proto1"))
        .stdout(predicate::str::contains("--verbose"));
}

#[test]
fn test_cli_encode_decode_pipe() {
    let text = common::sample_text();

    let encoded = cargo_bin_cmd!("textfold")
        .write_stdin(text.as_bytes())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(encoded.starts_with(b"~2"));
    assert_eq!(encoded, textfold::encode(text.as_bytes()).unwrap());

    cargo_bin_cmd!("textfold")
        .arg("-d")
        .write_stdin(encoded)
        .assert()
        .success()
        .stdout(text);
}

#[test]
fn test_cli_word_references() {
    let slot = textfold::model::word_slot(b"the");
    cargo_bin_cmd!("textfold")
        .write_stdin("the the the")
        .assert()
        .success()
        .stdout(vec![b'~', b'2', b't', b'h', b'e', b' ', 0x1A, slot, b' ', 0x1A, slot]);
}

#[test]
fn test_cli_proto1_format() {
    cargo_bin_cmd!("textfold")
        .arg("--proto1")
        .write_stdin("the the the")
        .assert()
        .success()
        .stdout("~1the the the");
}

#[test]
fn test_cli_empty_input() {
    cargo_bin_cmd!("textfold")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_cli_truncated_code_fails() {
    cargo_bin_cmd!("textfold")
        .arg("-d")
        .write_stdin(&b"~2\x17\x4E"[..])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Malformed stream at byte offset 2"));
}

#[test]
fn test_cli_truncated_binary_run_fails() {
    cargo_bin_cmd!("textfold")
        .arg("-d")
        .write_stdin(&b"~1\x1F\xFFab"[..])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Incomplete token"));
}

#[test]
fn test_cli_rejects_foreign_input() {
    cargo_bin_cmd!("textfold")
        .arg("-d")
        .write_stdin("plain text")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Malformed stream at byte offset 0"));
}

#[test]
fn test_cli_proto1_conflicts_with_decode() {
    cargo_bin_cmd!("textfold")
        .args(["--proto1", "-d"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
