use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const HEADER: [&str; 7] = ["op", "party", "entry", "exit", "secret", "vehicle_type", "value"];

fn setup_rows() -> Vec<[&'static str; 7]> {
    vec![
        ["add_booth", "b1", "", "", "", "", ""],
        ["add_booth", "b2", "", "", "", "", ""],
        ["set_vehicle_type", "v1", "", "", "", "1", ""],
        ["set_multiplier", "", "", "", "", "1", "1"],
        ["set_route_price", "", "b1", "b2", "", "", "30"],
    ]
}

#[test]
fn test_malformed_csv_handling() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(HEADER).unwrap();
    for row in setup_rows() {
        wtr.write_record(row).unwrap();
    }

    // Unknown op
    wtr.write_record(["teleport", "v1", "b1", "b2", "", "", ""])
        .unwrap();
    // Missing secret for enter (required)
    wtr.write_record(["enter", "v1", "b1", "", "", "", "100"])
        .unwrap();
    // Valid trip
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "100"])
        .unwrap();
    wtr.write_record(["exit", "", "", "b2", "s1", "", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("command unreadable"))
        .stdout(predicate::str::contains("operator,30"))
        .stdout(predicate::str::contains("v1,70"));
}

#[test]
fn test_rejected_commands_are_skipped() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(HEADER).unwrap();
    for row in setup_rows() {
        wtr.write_record(row).unwrap();
    }

    // Below the required deposit
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "99"])
        .unwrap();
    // Unknown secret
    wtr.write_record(["exit", "", "", "b2", "s1", "", ""]).unwrap();
    // Accepted on retry with enough funds
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "100"])
        .unwrap();
    // Secret reuse
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "100"])
        .unwrap();
    wtr.write_record(["exit", "", "", "b2", "s1", "", ""]).unwrap();
    // Reported twice
    wtr.write_record(["exit", "", "", "b2", "s1", "", ""]).unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg(file.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("command rejected"))
        .stdout(predicate::str::contains("operator,30"))
        .stdout(predicate::str::contains("v1,70"));
}

#[test]
fn test_invalid_data_types() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let mut wtr = csv::Writer::from_path(file.path()).unwrap();
    wtr.write_record(HEADER).unwrap();
    for row in setup_rows() {
        wtr.write_record(row).unwrap();
    }

    // Text in value field
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "lots"])
        .unwrap();
    // Negative vehicle type
    wtr.write_record(["set_vehicle_type", "v1", "", "", "", "-1", ""])
        .unwrap();
    wtr.write_record(["enter", "v1", "b1", "", "s1", "", "100"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg(file.path());

    // The deposit is escrowed, so nothing is withdrawable yet.
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("command unreadable"))
        .stdout(predicate::str::diff("party,balance\n"));
}
