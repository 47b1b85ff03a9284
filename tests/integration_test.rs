// End-to-end checks of the wirelessctl binary

use assert_cmd::cargo::cargo_bin_cmd;
use chrono::{Duration, Local};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::{TempDir, tempdir};

fn command(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wirelessctl");
    cmd.current_dir(dir.path())
        .env("WIRELESSCTL_CONFIG_DIR", dir.path().join("config"))
        .env_remove("MK_CSM_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn report_help_lists_selection_flags() {
    let dir = tempdir().unwrap();
    command(&dir)
        .args(["report", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--split-by-ssid"))
        .stdout(predicates::str::contains("--all"))
        .stdout(predicates::str::contains("--watch"));
}

#[test]
fn config_show_reports_missing_key_without_failing() {
    let dir = tempdir().unwrap();
    command(&dir)
        .arg("config-show")
        .assert()
        .success()
        .stdout(predicates::str::contains("API Key (MK_CSM_KEY): Missing"))
        .stdout(predicates::str::contains("short: 300"))
        .stdout(predicates::str::contains("medium: 3600"));
}

#[test]
fn api_commands_fail_without_credential() {
    let dir = tempdir().unwrap();
    command(&dir)
        .arg("orgs")
        .assert()
        .failure()
        .stderr(predicates::str::contains("MK_CSM_KEY"));
}

#[test]
fn old_start_date_blocks_the_report() {
    let dir = tempdir().unwrap();
    let start = (Local::now().date_naive() - Duration::days(31)).to_string();
    command(&dir)
        .env("MK_CSM_KEY", "unused")
        .args(["report", "--all", "--start", &start])
        .assert()
        .failure()
        .stderr(predicates::str::contains("older than 30 days"));

    let log = std::fs::read_to_string(dir.path().join("wirelessctl.log")).unwrap();
    assert!(log.contains(" - WARN - Validation Error: Start date"));
    assert!(!log.contains("Critical application error"));
}

#[test]
fn watch_mode_rejects_an_invalid_window_up_front() {
    let dir = tempdir().unwrap();
    let today = Local::now().date_naive();
    let start = (today - Duration::days(5)).to_string();
    let end = (today + Duration::days(40)).to_string();
    command(&dir)
        .env("MK_CSM_KEY", "unused")
        .args(["report", "--all", "--watch", "1", "--start", &start, "--end", &end])
        .timeout(std::time::Duration::from_secs(10))
        .assert()
        .failure()
        .stderr(predicates::str::contains("exceeds 30-day limit"));

    let log = std::fs::read_to_string(dir.path().join("wirelessctl.log")).unwrap();
    assert_eq!(log.matches("Validation Error: Window size").count(), 1);
}

#[test]
fn watch_interval_must_be_positive() {
    let dir = tempdir().unwrap();
    command(&dir)
        .args(["report", "--all", "--watch", "0"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("--watch"));
}

#[test]
fn report_aggregates_networks_with_total() {
    let dir = tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/organizations");
        then.status(200)
            .json_body(json!([{"id": "1", "name": "Acme"}]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/organizations/1/networks");
        then.status(200).json_body(json!([
            {"id": "N_1", "name": "HQ", "productTypes": ["wireless"]},
            {"id": "N_2", "name": "Branch", "productTypes": ["wireless", "switch"]},
            {"id": "N_3", "name": "Lab", "productTypes": ["switch"]}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/networks/N_1/wireless/clientCountHistory")
            .query_param("resolution", "86400");
        then.status(200).json_body(json!([
            {"startTs": "2024-01-01T00:00:00Z", "clientCount": 5},
            {"startTs": "2024-01-02T00:00:00Z", "clientCount": 4}
        ]));
    });
    let branch = server.mock(|when, then| {
        when.method(GET)
            .path("/networks/N_2/wireless/clientCountHistory");
        then.status(200).json_body(json!([
            {"startTs": "2024-01-01T00:00:00Z", "clientCount": 3}
        ]));
    });

    command(&dir)
        .env("MK_CSM_KEY", "secret")
        .args([
            "--base-url",
            &server.base_url(),
            "--output",
            "json",
            "report",
            "--all",
            "--resolution",
            "day",
        ])
        .assert()
        .success()
        .stdout(predicates::str::contains(r#""labels":["HQ","Branch"]"#))
        .stdout(predicates::str::contains(
            r#"{"startTs":"2024-01-01T00:00:00Z","clientCount":8.0}"#,
        ));

    branch.assert();
    let log = std::fs::read_to_string(dir.path().join("wirelessctl.log")).unwrap();
    assert!(log.contains("[API CALL #1] Fetching: organizations.getOrganizations"));
}

#[test]
fn report_with_only_failing_networks_reports_no_data() {
    let dir = tempdir().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/organizations");
        then.status(200)
            .json_body(json!([{"id": "1", "name": "Acme"}]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/organizations/1/networks");
        then.status(200).json_body(json!([
            {"id": "N_1", "name": "HQ", "productTypes": ["wireless"]}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/networks/N_1/wireless/clientCountHistory");
        then.status(500);
    });

    command(&dir)
        .env("MK_CSM_KEY", "secret")
        .args(["--base-url", &server.base_url(), "report", "--network", "HQ"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("No data found"));

    let log = std::fs::read_to_string(dir.path().join("wirelessctl.log")).unwrap();
    assert!(log.contains("API Error on N_1"));
    assert!(!log.contains("Critical application error"));
}
