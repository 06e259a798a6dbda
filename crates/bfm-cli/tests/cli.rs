use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

// 0.01 + j0.02 p.u. on 100 kVA / 13.8 kV
const FEASIBLE_BRANCHES: &str = "from,to,r,x\n1,2,0.000019044,0.000038088\n";
const SPEC_BRANCHES: &str = "from,to,r,x\n1,2,0.00038088,0.0019044\n";
const BUSES: &str = "bus,p,q,pgen_max,qgen_max\n1,0,0,10000000,10000000\n2,-40000,0,,\n";

fn write_case(dir: &Path, branches: &str) -> (PathBuf, PathBuf) {
    let branch_path = dir.join("branches.csv");
    let bus_path = dir.join("buses.csv");
    fs::write(&branch_path, branches).unwrap();
    fs::write(&bus_path, BUSES).unwrap();
    (branch_path, bus_path)
}

fn bfm() -> Command {
    Command::cargo_bin("bfm").unwrap()
}

#[test]
fn bfm_run_writes_artifacts() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), FEASIBLE_BRANCHES);
    let out = tmp.path().join("outputs");

    bfm()
        .args([
            "run",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--print-output",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("converged!"))
        .stdout(predicate::str::contains("period 0"));

    let resolution = fs::read_to_string(out.join("resolution.txt")).unwrap();
    assert!(resolution.starts_with("*** Branch Flow SOCP ***"));

    let output: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("output.json")).unwrap()).unwrap();
    assert_eq!(output["converged"], serde_json::Value::Bool(true));
    let pgen = output["periods"][0]["p_gen"]["1"].as_f64().unwrap();
    assert!(pgen > 40e3 && pgen < 41e3);
}

#[test]
fn bfm_run_reads_config_file() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), FEASIBLE_BRANCHES);
    let out = tmp.path().join("from-config");
    let config = tmp.path().join("run.toml");
    fs::write(
        &config,
        format!(
            "periods = 2\noutput_dir = {:?}\n\n[solver_settings]\nmax_iter = 100\n",
            out.to_str().unwrap()
        ),
    )
    .unwrap();

    bfm()
        .args([
            "run",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();

    let output: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("output.json")).unwrap()).unwrap();
    assert_eq!(output["periods"].as_array().unwrap().len(), 2);
}

#[test]
fn bfm_validate_reports_defaults() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), SPEC_BRANCHES);

    bfm()
        .args([
            "validate",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid radial feeder: 2 buses, 1 branches"))
        .stdout(predicate::str::contains("2 defaulted cell(s)"));
}

#[test]
fn bfm_validate_prints_matrices() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), SPEC_BRANCHES);

    bfm()
        .args([
            "validate",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--matrices",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cx:\n  0 1\n  1 0"))
        .stdout(predicate::str::contains("R [pu], 2 stored entries:"))
        .stdout(predicate::str::contains("X [pu], 2 stored entries:"));
}

#[test]
fn bfm_validate_rejects_profile_for_unknown_bus() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), SPEC_BRANCHES);
    let profile = tmp.path().join("profile.csv");
    fs::write(&profile, "period,bus,p,q\n0,2,-40000,0\n0,99,-10000,0\n").unwrap();

    bfm()
        .args([
            "validate",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--profile",
            profile.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown bus 99"));
}

#[test]
fn bfm_validate_rejects_cycle() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(
        tmp.path(),
        "from,to,r,x\n1,2,0.1,0.1\n2,3,0.1,0.1\n1,3,0.1,0.1\n",
    );

    bfm()
        .args([
            "validate",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Data error"));
}

#[test]
fn bfm_dump_writes_model_only() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), SPEC_BRANCHES);
    let out = tmp.path().join("dump");

    bfm()
        .args([
            "dump",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--conic-form",
            "loss-ratio",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("variables"));

    let dump = fs::read_to_string(out.join("resolution.txt")).unwrap();
    assert!(dump.contains("loss_ratio : Size=1"));
    assert!(!out.join("output.json").exists());
}

#[test]
fn bfm_rejects_unknown_solver() {
    let tmp = tempdir().unwrap();
    let (branches, buses) = write_case(tmp.path(), FEASIBLE_BRANCHES);

    bfm()
        .args([
            "run",
            "--branches",
            branches.to_str().unwrap(),
            "--buses",
            buses.to_str().unwrap(),
            "--solver",
            "ipopt",
            "--out",
            tmp.path().join("never").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("supported values: clarabel"));
}
