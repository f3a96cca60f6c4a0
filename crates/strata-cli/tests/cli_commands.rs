//! Integration tests for the strata commands.

mod common;

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use common::{json_output, strata_cmd};

// ============================================================================
// algorithms
// ============================================================================

#[test]
fn test_algorithms_table() {
    strata_cmd()
        .arg("algorithms")
        .assert()
        .success()
        .stdout(predicate::str::contains("ALGORITHM"))
        .stdout(predicate::str::contains("hnsw"))
        .stdout(predicate::str::contains("tiered"));
}

#[test]
fn test_algorithms_json() {
    let value = json_output(strata_cmd().args(["algorithms", "--json"]));
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();

    assert!(names.contains(&"flat"));
    assert!(names.contains(&"hnsw"));
    assert!(names.contains(&"ivf_flat"));
    assert!(names.contains(&"ivf_pq"));
    assert_eq!(names.last(), Some(&"tiered"));
}

// ============================================================================
// estimate
// ============================================================================

#[test]
fn test_estimate_from_flags() {
    let value = json_output(strata_cmd().args([
        "estimate",
        "--algorithm",
        "flat",
        "--dimension",
        "16",
        "--vectors",
        "100",
        "--json",
    ]));

    assert_eq!(value["algorithm"], "flat");
    assert_eq!(value["dimension"], 16);
    let initial = value["initialBytes"].as_u64().unwrap();
    let element = value["elementBytes"].as_u64().unwrap();
    assert!(element >= 16 * 4);
    assert_eq!(value["projectedBytes"].as_u64().unwrap(), initial + 100 * element);
}

#[test]
fn test_estimate_ivf_pq_stores_codes() {
    let estimate = |algorithm: &str| {
        json_output(strata_cmd().args([
            "estimate",
            "--algorithm",
            algorithm,
            "--dimension",
            "64",
            "--pq-subspaces",
            "8",
            "--json",
        ]))
    };
    let pq = estimate("ivf_pq");
    let flat = estimate("ivf_flat");

    assert_eq!(pq["algorithm"], "ivf_pq");
    assert!(pq["elementBytes"].as_u64().unwrap() < flat["elementBytes"].as_u64().unwrap());
}

#[test]
fn test_estimate_ivf_pq_rejects_uneven_subspaces() {
    strata_cmd()
        .args(["estimate", "--algorithm", "ivf_pq", "--dimension", "10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pqSubspaces"));
}

#[test]
fn test_estimate_from_config_file() {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().join("index.yaml");
    fs::write(
        &path,
        "algorithm: tiered\nswapThreshold: 256\nprimary:\n  algorithm: hnsw\n  dimension: 64\n  metric: l2\n  m: 8\n",
    )
    .expect("write params");

    let value = json_output(
        strata_cmd()
            .arg("--config")
            .arg(&path)
            .args(["estimate", "--json"]),
    );
    assert_eq!(value["algorithm"], "tiered");
    assert_eq!(value["dimension"], 64);
    assert_eq!(value["metric"], "l2");
}

#[test]
fn test_estimate_human_output() {
    strata_cmd()
        .args(["estimate", "--dimension", "128", "--vectors", "1000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ESTIMATE"))
        .stdout(predicate::str::contains("Per vector"))
        .stdout(predicate::str::contains("1,000 vectors"));
}

#[test]
fn test_zero_dimension_fails() {
    strata_cmd()
        .args(["estimate", "--dimension", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("[err]"))
        .stderr(predicate::str::contains("Hint:"));
}

#[test]
fn test_missing_config_fails() {
    let temp = TempDir::new().expect("create temp dir");
    strata_cmd()
        .arg("--config")
        .arg(temp.path().join("missing.yaml"))
        .arg("estimate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load parameters"))
        .stderr(predicate::str::contains("--config"));
}

// ============================================================================
// bench
// ============================================================================

#[test]
fn test_bench_tiered_flat_is_exact() {
    let value = json_output(strata_cmd().args([
        "bench",
        "--primary",
        "flat",
        "--dimension",
        "8",
        "--vectors",
        "300",
        "--queries",
        "10",
        "-k",
        "5",
        "--swap-threshold",
        "64",
        "--json",
    ]));

    assert_eq!(value["algorithm"], "tiered");
    assert_eq!(value["deleted"], 30);
    assert_eq!(value["live"], 270);
    assert_eq!(value["recall"].as_f64(), Some(1.0));
    assert_eq!(value["tiered"]["pendingLabels"], 0);
    assert_eq!(value["tiered"]["tombstones"], 0);
    assert_eq!(value["tiered"]["backend"]["size"], 270);
}

#[test]
fn test_bench_hnsw_text_report() {
    strata_cmd()
        .args([
            "bench",
            "--algorithm",
            "hnsw",
            "--dimension",
            "8",
            "--vectors",
            "300",
            "--queries",
            "10",
            "--index-seed",
            "3",
            "--quiet",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("BENCHMARK"))
        .stdout(predicate::str::contains("Recall@10"))
        .stdout(predicate::str::contains("270 live"));
}

#[test]
fn test_bench_rejects_bad_delete_ratio() {
    strata_cmd()
        .args(["bench", "--vectors", "10", "--delete-ratio", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--delete-ratio"));
}
