use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg("tests/fixtures/journey.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("party,balance\n"))
        // 20 from the priced trip plus 120 once b1->b2 is priced
        .stdout(predicate::str::contains("operator,140"))
        // Queued exit, refunded after the late price
        .stdout(predicate::str::contains("v1,80"))
        // Immediate settlement
        .stdout(predicate::str::contains("v2,280"));

    Ok(())
}

#[test]
fn test_cli_flat_deposit_policy() -> Result<(), Box<dyn std::error::Error>> {
    let mut csv = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(
        &mut csv,
        b"op, party, entry, exit, secret, vehicle_type, value\n\
          add_booth, b1\n\
          add_booth, b2\n\
          set_vehicle_type, v1,,,, 1\n\
          set_multiplier,,,,, 1, 5\n\
          set_route_price,, b1, b2,,, 10\n\
          enter, v1, b1,, s,, 100\n\
          exit,,, b2, s\n",
    )?;

    // Multiplied policy would require 500 and reject the entry.
    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg(csv.path()).arg("--deposit-policy").arg("flat");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("operator,50"))
        .stdout(predicate::str::contains("v1,50"));

    Ok(())
}

#[test]
fn test_cli_writes_event_journal() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let events_path = dir.path().join("events.jsonl");

    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg("tests/fixtures/journey.csv")
        .arg("--events-out")
        .arg(&events_path);
    cmd.assert().success();

    let text = std::fs::read_to_string(&events_path)?;
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    for (index, event) in events.iter().enumerate() {
        assert_eq!(event["sequence"], index as u64);
    }
    let kinds: Vec<&str> = events
        .iter()
        .filter_map(|event| event["event"].as_str())
        .collect();
    assert_eq!(kinds.iter().filter(|kind| **kind == "road_entered").count(), 2);
    assert_eq!(kinds.iter().filter(|kind| **kind == "road_exited").count(), 2);
    assert_eq!(kinds.iter().filter(|kind| **kind == "pending_payment").count(), 1);
    assert_eq!(kinds.last(), Some(&"road_exited"));

    Ok(())
}

#[test]
fn test_cli_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = tempfile::NamedTempFile::new()?;
    std::io::Write::write_all(
        &mut config,
        br#"{"engine_id": "north", "beneficiary": "treasury", "base_deposit": 50}"#,
    )?;

    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg("tests/fixtures/journey.csv")
        .arg("--config")
        .arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("treasury,140"))
        .stdout(predicate::str::contains("operator").not());

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_config() {
    let mut cmd = Command::new(cargo_bin!("tollway"));
    cmd.arg("tests/fixtures/journey.csv")
        .arg("--base-deposit")
        .arg("0");

    cmd.assert().failure();
}
