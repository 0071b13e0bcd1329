//! Shared test helpers for integration tests

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// Before-wash catalog: K-1 has Chest, Waist and the general Hip point,
/// K-2 has Sleeve and Hip
pub const CATALOG_YAML: &str = r#"sizes: [S, M, L]
points:
  - point_id: P01
    name_eng: Chest
    tolerance_key: 1
    sizes:
      - { size: S, nominal: "19", tol_minus: "1/4", tol_plus: "1/4" }
      - { size: M, nominal: "20", tol_minus: "1/4", tol_plus: "1/4" }
      - { size: L, nominal: "21", tol_minus: "1/4", tol_plus: "1/4" }
  - point_id: P02
    name_eng: Waist
    tolerance_key: 1
    sizes:
      - { size: S, nominal: "17", tol_minus: "1/4", tol_plus: "1/4" }
      - { size: M, nominal: "18", tol_minus: "1/4", tol_plus: "1/4" }
      - { size: L, nominal: "19", tol_minus: "1/4", tol_plus: "1/4" }
  - point_id: P03
    name_eng: Sleeve
    tolerance_key: 2
    tol_minus: "3/8"
    tol_plus: "3/8"
    sizes:
      - { size: S, nominal: "24" }
      - { size: M, nominal: "24 1/2" }
      - { size: L, nominal: "25" }
  - point_id: P04
    name_eng: Hip
    tolerance_key: NA
    sizes:
      - { size: S, nominal: "21", tol_minus: "1/2", tol_plus: "1/2" }
      - { size: M, nominal: "22", tol_minus: "1/2", tol_plus: "1/2" }
      - { size: L, nominal: "23", tol_minus: "1/2", tol_plus: "1/2" }
"#;

/// Helper to get a qcm command with the ambient configuration cleared
pub fn qcm() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("qcm"));
    for var in ["QCM_PHASE", "QCM_SAMPLE_COUNT", "QCM_STORE", "QCM_INSPECTOR", "QCM_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

/// Write the test catalog into `tmp` and return its file name
pub fn write_catalog(tmp: &TempDir) -> &'static str {
    fs::write(tmp.path().join("catalog.yaml"), CATALOG_YAML).unwrap();
    "catalog.yaml"
}

/// Helper to start an inspection with two pieces per size
pub fn setup_workspace() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let catalog = write_catalog(&tmp);
    qcm()
        .current_dir(tmp.path())
        .args([
            "init", "--order", "PO-1001", "--color", "Navy", "--sizes", "S,M", "-n", "2",
            "--before", catalog,
        ])
        .assert()
        .success();
    tmp
}

/// Run qcm in the workspace and assert success
pub fn run_ok(tmp: &TempDir, args: &[&str]) -> String {
    let output = qcm().current_dir(tmp.path()).args(args).assert().success();
    String::from_utf8_lossy(&output.get_output().stdout).to_string()
}

/// Add size M, select Chest and record both pieces
pub fn measure_chest(tmp: &TempDir, first: &str, second: &str) {
    run_ok(tmp, &["size", "add", "M"]);
    run_ok(tmp, &["row", "M", "1"]);
    run_ok(tmp, &["set", "M", "1", "1", first, second]);
}
