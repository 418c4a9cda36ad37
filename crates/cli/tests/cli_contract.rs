use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::ffi::OsStr;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../tests/fixtures").join(name)
}

fn stdout_json(args: &[&OsStr]) -> Value {
    let output = cargo_bin_cmd!("takeoff")
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    serde_json::from_slice(&output).expect("stdout should contain valid json")
}

#[test]
fn inspect_reports_measurements_and_totals() {
    let file = fixture("patio.takeoff.json");
    let value = stdout_json(&[OsStr::new("inspect"), file.as_os_str()]);

    assert_eq!(value["scale"]["pixels_per_unit"], 10.0);
    assert_eq!(value["scale"]["calibrated"], true);

    let measurements = value["measurements"].as_array().expect("measurements array");
    assert_eq!(measurements.len(), 2);
    assert_eq!(measurements[0]["kind"], "Area");
    assert_eq!(measurements[0]["display"], "6.00 ft²");
    assert_eq!(measurements[1]["label"], "Fence, north");
    assert_eq!(measurements[1]["value"], 12.5);

    assert_eq!(value["summary"]["count"], 2);
    assert_eq!(value["summary"]["linear_total"], 12.5);
    assert_eq!(value["summary"]["area_total"], 6.0);
}

#[test]
fn inspect_rejects_stale_values() {
    cargo_bin_cmd!("takeoff")
        .arg("inspect")
        .arg(fixture("stale.takeoff.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("inconsistent snapshot"));
}

#[test]
fn inspect_fails_for_missing_file() {
    cargo_bin_cmd!("takeoff")
        .arg("inspect")
        .arg(fixture("missing.takeoff.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("file does not exist"));
}

#[test]
fn replay_runs_calibration_and_measurements() {
    let script = fixture("triangle.script.json");
    let value = stdout_json(&[OsStr::new("replay"), script.as_os_str()]);
    let session = &value["session"];

    assert_eq!(value["version"], 1);
    assert_eq!(session["scale"]["pixels_per_unit"], 10.0);

    let measurements = session["measurements"].as_array().expect("measurements array");
    assert_eq!(measurements.len(), 2, "stray tap must be discarded");
    assert_eq!(measurements[0]["kind"], "Area");
    assert_eq!(measurements[0]["value_real_units"], 6.0);
    assert_eq!(measurements[1]["label"], "Fence, north");
    assert_eq!(measurements[1]["value_real_units"], 12.5);
}

#[test]
fn replay_service_unit_flag_overrides_script() {
    let script = fixture("triangle.script.json");
    let value = stdout_json(&[
        OsStr::new("replay"),
        script.as_os_str(),
        OsStr::new("--service-unit"),
        OsStr::new("ft"),
    ]);

    let measurements = value["session"]["measurements"].as_array().expect("measurements array");
    assert_eq!(measurements[0]["kind"], "Linear");
    assert_eq!(measurements[0]["value_real_units"], 9.0);
}

#[test]
fn replay_honours_config_file() {
    let script = fixture("triangle.script.json");
    let config = fixture("slow-double-click.config.json");
    let value = stdout_json(&[
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("replay"),
        script.as_os_str(),
    ]);

    // With a 50 ms window the 150 ms double-click no longer finishes the chain
    let measurements = value["session"]["measurements"].as_array().expect("measurements array");
    assert_eq!(measurements.len(), 2);
    assert_eq!(measurements[0]["label"], "stray tap");
}

#[test]
fn replay_writes_session_that_inspect_accepts() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let output_path = temp.path().join("site.takeoff.json");

    cargo_bin_cmd!("takeoff")
        .arg("replay")
        .arg(fixture("triangle.script.json"))
        .arg("--output")
        .arg(&output_path)
        .assert()
        .success();

    assert!(output_path.exists(), "session file should exist");

    let value = stdout_json(&[OsStr::new("inspect"), output_path.as_os_str()]);
    assert_eq!(value["summary"]["count"], 2);
}

#[test]
fn replay_saves_session_beside_image() {
    let temp = tempfile::tempdir().expect("temp dir should be created");
    let image = temp.path().join("backyard.png");
    let expected = temp.path().join("backyard.png.takeoff.json");

    cargo_bin_cmd!("takeoff")
        .arg("replay")
        .arg(fixture("triangle.script.json"))
        .arg("--image")
        .arg(&image)
        .assert()
        .success()
        .stdout(predicate::str::contains("backyard.png.takeoff.json"));

    assert!(expected.exists(), "sidecar session file should exist");
    let value = stdout_json(&[OsStr::new("inspect"), expected.as_os_str()]);
    assert_eq!(value["summary"]["count"], 2);
}

#[test]
fn replay_rejects_output_with_image() {
    cargo_bin_cmd!("takeoff")
        .arg("replay")
        .arg(fixture("triangle.script.json"))
        .args(["--output", "a.json", "--image", "b.png"])
        .assert()
        .failure();
}

#[test]
fn export_csv_prints_rows() {
    cargo_bin_cmd!("takeoff")
        .arg("export-csv")
        .arg(fixture("patio.takeoff.json"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ID,Label,Kind,Points,Pixel Value,Value,Unit,Calibrated",
        ))
        .stdout(predicate::str::contains(",Patio,Area,3,600,6.00,ft²,true"))
        .stdout(predicate::str::contains(",\"Fence, north\",Linear,2,125,12.50,ft,true"));
}

#[test]
fn version_prints_package_version() {
    cargo_bin_cmd!("takeoff")
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
