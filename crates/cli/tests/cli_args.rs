use predicates::prelude::*;

/// `--help` should document the flags and exit successfully.
#[test]
fn help_lists_the_enrichment_flags() {
    assert_cmd::cargo::cargo_bin_cmd!("docnote")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--binary"))
        .stdout(predicate::str::contains("--type"));
}

/// The binary path is required; clap should reject a bare invocation.
#[test]
fn missing_binary_flag_is_an_error() {
    assert_cmd::cargo::cargo_bin_cmd!("docnote")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--binary"));
}

/// A nonexistent binary path fails before any session is opened.
#[test]
fn nonexistent_binary_path_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.exe");

    assert_cmd::cargo::cargo_bin_cmd!("docnote")
        .arg("--binary")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Binary file does not exist"));
}

/// Directories are not analyzable binaries.
#[test]
fn directory_as_binary_path_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    assert_cmd::cargo::cargo_bin_cmd!("docnote")
        .arg("--binary")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Binary file does not exist"));
}

/// Only `imports` and `urls` are valid enrichment types.
#[test]
fn unknown_enrichment_type_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bin = dir.path().join("bin.exe");
    std::fs::write(&bin, b"MZ").expect("write");

    assert_cmd::cargo::cargo_bin_cmd!("docnote")
        .arg("--binary")
        .arg(&bin)
        .arg("--type")
        .arg("everything")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
