// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Build command implementation: ingests a CSV file into a fresh table.

use anyhow::{Context, Result};
use catalogdb::query::parser;
use catalogdb::{Engine, ExecuteOutcome};
use std::path::Path;
use std::time::Duration;

pub fn execute(base: &Path, table: &str, file: &Path, using: Option<&str>) -> Result<()> {
    let _lock = catalogdb::concurrent::acquire_lock(base, Duration::from_secs(30))
        .with_context(|| format!("Failed to lock catalog at {}", base.display()))?;

    let mut engine = Engine::open(base)
        .with_context(|| format!("Failed to open catalog at {}", base.display()))?;

    let using_clause = using.map(|u| format!(" USING {u}")).unwrap_or_default();
    let sql = format!(
        r#"CREATE TABLE {table} FROM FILE "{}"{using_clause}"#,
        file.display()
    );
    let stmt = parser::parse(&sql).context("Failed to parse CREATE TABLE statement")?;

    match engine.execute(&stmt).with_context(|| format!("Build failed for table '{table}'"))? {
        ExecuteOutcome::Built { rows } => {
            println!("Built table '{table}' from {} ({rows} rows)", file.display());
        }
        other => println!("Unexpected outcome: {other:?}"),
    }
    Ok(())
}
