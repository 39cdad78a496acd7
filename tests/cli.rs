// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end CLI tests: build a table from a fixture CSV, then query,
//! explain, and inspect it through the `catalogdb` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::tempdir;

fn write_fixture_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("restaurants.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(
        file,
        "Restaurant ID,Restaurant Name,City,Country Code,Address,Cuisines,Average Cost for two,Currency,Has Table booking,Has Online delivery,Is delivering now,Price range,Aggregate rating,Rating text,Votes,Longitude,Latitude"
    )
    .unwrap();
    writeln!(
        file,
        "6317637,Le Petit Souffle,Makati City,162,Some Address,French,1100,Botswana Pula(P),Yes,No,No,3,4.8,Excellent,314,121.027535,14.565443"
    )
    .unwrap();
    writeln!(
        file,
        "6304287,Betterliving,Makati City,162,Some Address,Filipino,1200,Botswana Pula(P),Yes,No,No,3,4.5,Excellent,591,121.0287,14.5735"
    )
    .unwrap();
    path
}

#[test]
fn build_then_query_round_trip() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("catalog");
    let csv_path = write_fixture_csv(dir.path());

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "build", "r", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows"));

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args([
            "--base",
            base.to_str().unwrap(),
            "query",
            r#"SELECT * FROM r WHERE restaurant_id = 6317637"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Le Petit Souffle"));
}

#[test]
fn query_nonexistent_table_fails() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("catalog");

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "query", "SELECT * FROM ghost WHERE restaurant_id = 1"])
        .assert()
        .failure();
}

#[test]
fn explain_reports_a_plan() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("catalog");
    let csv_path = write_fixture_csv(dir.path());

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "build", "r", csv_path.to_str().unwrap()])
        .assert()
        .success();

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args([
            "--base",
            base.to_str().unwrap(),
            "query",
            r#"EXPLAIN SELECT * FROM r WHERE restaurant_id = 6317637"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("plan:"));
}

#[test]
fn indices_reports_per_engine_counts() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("catalog");
    let csv_path = write_fixture_csv(dir.path());

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "build", "r", csv_path.to_str().unwrap()])
        .assert()
        .success();

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "indices", "r"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ISAM"))
        .stdout(predicate::str::contains("RTREE"));
}

#[test]
fn exec_insert_then_delete() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("catalog");
    let csv_path = write_fixture_csv(dir.path());

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "build", "r", csv_path.to_str().unwrap()])
        .assert()
        .success();

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args([
            "--base",
            base.to_str().unwrap(),
            "exec",
            r#"INSERT INTO r VALUES (9999999, "New Spot", "Quezon City", 162, "Addr", "Pizza", 500, "Philippine Peso(P)", "No", "No", "No", 2, 3.9, "Good", 10, 121.05, 14.6)"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 row"));

    Command::cargo_bin("catalogdb")
        .unwrap()
        .args(["--base", base.to_str().unwrap(), "exec", "DELETE FROM r WHERE restaurant_id = 9999999"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 row"));
}
