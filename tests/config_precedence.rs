// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end precedence check: a CLI flag wins over `CATALOGDB_BASE_DIR`,
//! which wins over `catalogdb.toml`, which wins over the built-in default.
//! Unit-level file/env/default layering lives in `src/config.rs`'s own
//! tests; this exercises the one layer only the binary can apply (flags).

use assert_cmd::Command;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn cli_flag_overrides_env_var_base_dir() {
    let project_dir = tempdir().unwrap();
    let mut toml = std::fs::File::create(project_dir.path().join("catalogdb.toml")).unwrap();
    writeln!(toml, "base_dir = \"{}\"", project_dir.path().join("from_file").display()).unwrap();
    drop(toml);

    let csv_dir = tempdir().unwrap();
    let csv_path = csv_dir.path().join("r.csv");
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(
        file,
        "Restaurant ID,Restaurant Name,City,Country Code,Address,Cuisines,Average Cost for two,Currency,Has Table booking,Has Online delivery,Is delivering now,Price range,Aggregate rating,Rating text,Votes,Longitude,Latitude"
    )
    .unwrap();
    writeln!(
        file,
        "1,Only Spot,City,1,Addr,Cuisine,100,Currency,No,No,No,1,3.0,Average,1,0.0,0.0"
    )
    .unwrap();
    drop(file);

    let from_flag = project_dir.path().join("from_flag");

    Command::cargo_bin("catalogdb")
        .unwrap()
        .current_dir(project_dir.path())
        .env("CATALOGDB_BASE_DIR", project_dir.path().join("from_env"))
        .args(["--base", from_flag.to_str().unwrap(), "build", "r", csv_path.to_str().unwrap()])
        .assert()
        .success();

    assert!(from_flag.join("r").exists(), "flag-selected base dir should hold the built table");
    assert!(
        !project_dir.path().join("from_env").exists(),
        "env-selected base dir should be shadowed by the flag"
    );
    assert!(
        !project_dir.path().join("from_file").exists(),
        "file-selected base dir should be shadowed by the flag"
    );
}
