// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Smoke tests: the binary runs end to end on a small scenario table.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn co2cpd() -> Command {
    Command::cargo_bin("co2cpd").expect("co2cpd binary should build")
}

// Three decaying scenarios with a level drop at row 200.
fn write_table(dir: &Path) -> PathBuf {
    let mut csv = String::from("time,p1,p2,3000PgC\n");
    for row in 0..400 {
        let t = 1.0 + row as f64;
        let ripple = [0.4, -0.2, 0.1, -0.3, 0.0][row % 5];
        let cells: Vec<f64> = [100.0, 200.0, 300.0]
            .iter()
            .map(|level| {
                let drop = if row < 200 { 0.0 } else { level * 0.25 };
                level - drop + ripple
            })
            .collect();
        writeln!(csv, "{t},{},{},{}", cells[0], cells[1], cells[2]).expect("format row");
    }
    let path = dir.join("scenarios.csv");
    std::fs::write(&path, csv).expect("write table");
    path
}

#[test]
fn cli_help() {
    co2cpd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Changepoint detection"));
}

#[test]
fn cli_version() {
    co2cpd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("co2cpd"));
}

#[test]
fn subcommands_exist() {
    for sub in ["analyze", "segment"] {
        co2cpd().args([sub, "--help"]).assert().success();
    }
}

#[test]
fn analyze_writes_result_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());
    let out = dir.path().join("results");

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .args(["--window-size", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3,000 PgC: 1 changepoint(s), 1 significant"))
        .stdout(predicate::str::contains("ALL"));

    for file in [
        "changepoint_results.csv",
        "changepoint_summary.csv",
        "changepoint_report.json",
        "all_series_plot.svg",
        "changepoint_detection_results.svg",
    ] {
        assert!(out.join(file).is_file(), "{file} missing");
    }

    let results = std::fs::read_to_string(out.join("changepoint_results.csv")).expect("results");
    assert_eq!(results.lines().count(), 4);
    assert!(results.lines().skip(1).all(|line| line.contains(",200,201,")));
}

#[test]
fn analyze_json_and_no_plots() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());
    let out = dir.path().join("json-run");

    let assert = co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .args(["--window-size", "20", "--test", "student", "--no-plots", "--json"])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("stdout is JSON");
    assert_eq!(report["summary"]["overall"]["scenarios"], 3);
    assert_eq!(report["config"]["test_variant"], "Student");
    assert!(!out.join("all_series_plot.svg").exists());
}

#[test]
fn degraded_scenarios_do_not_fail_the_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());
    let out = dir.path().join("degraded");

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .args(["--window-size", "250", "--no-plots"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DEGRADED"))
        .stdout(predicate::str::contains("3 of 3 scenario(s) degraded"));

    let summary = std::fs::read_to_string(out.join("changepoint_summary.csv")).expect("summary");
    assert!(summary.contains("degraded: insufficient data"));
}

#[test]
fn segment_prints_indices() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());

    co2cpd()
        .arg("segment")
        .arg("--input")
        .arg(&input)
        .args(["--scenario", "p2", "--window-size", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"change_points\": [\n    200\n  ]"));
}

#[test]
fn config_file_is_layered_under_flags() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());
    let config = dir.path().join("analysis.toml");
    std::fs::write(&config, "window_size = 20\nn_changepoints = 0\n").expect("write config");

    co2cpd()
        .arg("segment")
        .arg("--input")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .args(["--scenario", "p1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"change_points\": []"));

    co2cpd()
        .arg("segment")
        .arg("--input")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .args(["--scenario", "p1", "--n-changepoints", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("200"));
}

#[test]
fn invalid_parameters_exit_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(dir.path().join("never"))
        .args(["--window-size", "-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("window_size must be > 0"));
    assert!(!dir.path().join("never").exists());

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--significance-level", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("significance_level"));

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--test-gap", "-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("test_gap must be >= 0"));

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .args(["--n-changepoints", "2", "--penalty", "bic"])
        .assert()
        .failure();
}

#[test]
fn malformed_input_exits_non_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("bad.csv");
    std::fs::write(&input, "time,p1\n1,400\n2,oops\n").expect("write table");

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid number"));

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(dir.path().join("missing.csv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let input = write_table(dir.path());
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "windw_size = 20\n").expect("write config");

    co2cpd()
        .arg("analyze")
        .arg("--input")
        .arg(&input)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}
