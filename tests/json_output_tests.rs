//! Integration tests for --output json
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

mod utils;

use predicates::prelude::*;
use utils::{sample_build, write_binary_log, write_log};

fn json_report(args: &[&str], path: &std::path::Path) -> serde_json::Value {
    let output = assert_cmd::cargo::cargo_bin_cmd!("execlog")
        .args(args)
        .arg("--output")
        .arg("json")
        .arg(path)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("report should be valid JSON")
}

#[test]
fn test_json_output_valid_format() {
    let (_dir, path) = write_binary_log("execution_log.bin", &sample_build());

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execlog");
    cmd.arg("--output").arg("json").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"version\":"))
        .stdout(predicate::str::contains("\"format\": \"execlog-json-v1\""))
        .stdout(predicate::str::contains("\"summary\":"))
        .stdout(predicate::str::contains("\"slowest_actions\":"))
        .stdout(predicate::str::contains("\"mnemonics\":"));
}

#[test]
fn test_json_summary_and_cache() {
    let (_dir, path) = write_binary_log("execution_log.bin", &sample_build());
    let report = json_report(&[], &path);

    assert_eq!(report["summary"]["total_actions"], 5);
    assert_eq!(report["summary"]["cache_hits"], 2);
    assert_eq!(report["summary"]["cache_hit_rate"], 40.0);

    let cache = &report["cache_performance"];
    assert_eq!(cache["remote_cache_hit_count"], 2);
    assert_eq!(cache["total_bytes_downloaded"], 4_000_000);
    assert_eq!(cache["download_rate_mbps"], 8.0);
}

#[test]
fn test_json_rankings() {
    let (_dir, path) = write_binary_log("execution_log.bin", &sample_build());
    let report = json_report(&["-n", "2"], &path);

    let slowest = report["slowest_actions"].as_array().unwrap();
    assert_eq!(slowest.len(), 2);
    assert_eq!(slowest[0]["target_label"], "//app:main");
    assert_eq!(slowest[1]["target_label"], "//core:base");

    let mnemonics: Vec<&str> = report["mnemonics"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["mnemonic"].as_str().unwrap())
        .collect();
    assert_eq!(mnemonics, vec!["CppLink", "CppCompile", "Javac"]);
}

#[test]
fn test_json_optional_sections_omitted() {
    let (_dir, path) = write_binary_log("execution_log.bin", &sample_build());
    let report = json_report(&["--no-cache-metrics"], &path);

    assert!(report.get("cache_performance").is_none());
    assert!(report.get("phase_timings").is_none());
    assert!(report.get("execution_comparison").is_none());
}

#[test]
fn test_json_optional_sections_present() {
    let (_dir, path) = write_binary_log("execution_log.bin", &sample_build());
    let report = json_report(&["--aggregate-phases", "--output-analysis"], &path);

    assert_eq!(report["aggregate_phases"]["executed_actions"], 3);
    assert_eq!(report["aggregate_phases"]["phases"].as_array().unwrap().len(), 6);

    let outputs = report["largest_outputs"].as_array().unwrap();
    assert_eq!(outputs[0]["target_label"], "//core:util");
    assert_eq!(outputs[0]["bytes"], 3_000_000);
}

#[test]
fn test_json_output_for_empty_log() {
    let (_dir, path) = write_log("execution_log.bin", &[]);

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("execlog");
    cmd.arg("--output").arg("json").arg(&path);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No metrics to report."));
}
