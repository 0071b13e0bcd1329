//! CLI integration tests - workspace setup, catalogs and conversions

mod common;

use common::{qcm, run_ok, setup_workspace, write_catalog};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_help_lists_commands() {
    qcm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("commit"))
        .stdout(predicate::str::contains("reopen"))
        .stdout(predicate::str::contains("summary"));
}

#[test]
fn test_init_creates_workspace() {
    let tmp = setup_workspace();
    assert!(tmp.path().join(".qcm/session.yaml").is_file());

    let session = fs::read_to_string(tmp.path().join(".qcm/session.yaml")).unwrap();
    assert!(session.contains("PO-1001"));
    assert!(session.contains("Navy"));
}

#[test]
fn test_init_reports_loaded_catalog() {
    let tmp = TempDir::new().unwrap();
    let catalog = write_catalog(&tmp);
    qcm()
        .current_dir(tmp.path())
        .args(["init", "--order", "PO-7", "--color", "Red", "--before", catalog])
        .assert()
        .success()
        .stdout(predicate::str::contains("Started inspection PO-7 / Red"))
        .stdout(predicate::str::contains("Before Wash catalog: 4 points, 2 key(s)"));
}

#[test]
fn test_init_twice_requires_force() {
    let tmp = setup_workspace();
    qcm()
        .current_dir(tmp.path())
        .args(["init", "--order", "PO-2", "--color", "Black"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    qcm()
        .current_dir(tmp.path())
        .args(["init", "--order", "PO-2", "--color", "Black", "--force"])
        .assert()
        .success();
}

#[test]
fn test_init_rejects_zero_samples() {
    let tmp = TempDir::new().unwrap();
    qcm()
        .current_dir(tmp.path())
        .args(["init", "--order", "PO-1", "--color", "Navy", "-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 1"));
}

#[test]
fn test_commands_outside_workspace_fail() {
    let tmp = TempDir::new().unwrap();
    qcm()
        .current_dir(tmp.path())
        .args(["status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not inside a qcm workspace"));
}

#[test]
fn test_catalog_keys_in_catalog_order() {
    let tmp = setup_workspace();
    let out = run_ok(&tmp, &["catalog", "keys", "-o", "tsv"]);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "KEY\tLABEL\tPOINTS");
    assert_eq!(lines[1], "1\tK-1\t3");
    assert_eq!(lines[2], "2\tK-2\t2");
}

#[test]
fn test_catalog_points_with_size_spec() {
    let tmp = setup_workspace();
    let out = run_ok(&tmp, &["catalog", "points", "-k", "2", "-s", "M", "-o", "csv"]);
    assert!(out.contains("1,P03,Sleeve,,K-2,24 1/2,-3/8,+3/8"));
    assert!(out.contains("2,P04,Hip,,General,22,-1/2,+1/2"));
}

#[test]
fn test_catalog_points_unknown_key() {
    let tmp = setup_workspace();
    qcm()
        .current_dir(tmp.path())
        .args(["catalog", "points", "-k", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in the catalog"));
}

#[test]
fn test_catalog_json_output() {
    let tmp = setup_workspace();
    let out = run_ok(&tmp, &["catalog", "keys", "-o", "json"]);
    let keys: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(keys[0]["label"], "K-1");
    assert_eq!(keys[1]["points"], 2);
}

#[test]
fn test_catalog_check_flags_malformed_values() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("bad.yaml"),
        r#"points:
  - name_eng: Chest
    tolerance_key: 1
    sizes:
      - { size: M, nominal: "20", tol_minus: "abc", tol_plus: "1/4" }
"#,
    )
    .unwrap();

    qcm()
        .current_dir(tmp.path())
        .args(["catalog", "check", "bad.yaml"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Chest"))
        .stderr(predicate::str::contains("malformed"));
}

#[test]
fn test_catalog_check_rejects_schema_violation() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("bad.yaml"), "points:\n  - point_id: P1\n    colour: red\n").unwrap();

    qcm()
        .current_dir(tmp.path())
        .args(["catalog", "check", "bad.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("catalog schema"));
}

#[test]
fn test_catalog_load_csv_into_after_wash() {
    let tmp = setup_workspace();
    fs::write(
        tmp.path().join("after.csv"),
        "point_id,name_eng,name_local,tolerance_key,size,nominal,tol_minus,tol_plus\n\
         A1,Length,,NA,S,27,1/2,1/2\n\
         A1,Length,,NA,M,28,1/2,1/2\n",
    )
    .unwrap();

    run_ok(&tmp, &["--phase", "after", "catalog", "load", "after.csv"]);
    let out = run_ok(&tmp, &["-p", "after", "catalog", "keys", "-o", "tsv"]);
    assert!(out.contains("NA\tGeneral\t1"));
}

#[test]
fn test_catalog_sizes_marks_order_sizes() {
    let tmp = setup_workspace();
    let out = run_ok(&tmp, &["catalog", "sizes", "-o", "tsv"]);
    assert!(out.contains("S\tyes"));
    assert!(out.contains("L\tno"));
}

#[test]
fn test_unloaded_phase_is_an_error() {
    let tmp = setup_workspace();
    qcm()
        .current_dir(tmp.path())
        .args(["-p", "after-wash", "catalog", "keys"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog loaded"));
}

#[test]
fn test_frac_converts_values() {
    let out = qcm()
        .args(["frac", "-o", "tsv", "0.375", "1 1/2", "-1/4"])
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&out.get_output().stdout).to_string();
    assert!(stdout.contains("0.375\t0.375\t3/8"));
    assert!(stdout.contains("1 1/2\t1.5\t1 1/2"));
    assert!(stdout.contains("-1/4\t-0.25\t-1/4"));
}

#[test]
fn test_frac_rejects_garbage() {
    qcm()
        .args(["frac", "1/2", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not be parsed"));
}

#[test]
fn test_completions_bash() {
    qcm()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qcm"));
}
