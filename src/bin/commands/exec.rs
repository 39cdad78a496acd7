// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Exec command implementation: one-shot INSERT / DELETE.

use anyhow::{Context, Result};
use catalogdb::query::parser;
use catalogdb::{Engine, ExecuteOutcome};
use std::path::Path;
use std::time::Duration;

pub fn execute(base: &Path, sql: &str, quiet: bool) -> Result<()> {
    let _lock = catalogdb::concurrent::acquire_lock(base, Duration::from_secs(30))
        .with_context(|| format!("Failed to lock catalog at {}", base.display()))?;

    let mut engine = Engine::open(base)
        .with_context(|| format!("Failed to open catalog at {}", base.display()))?;
    let stmt = parser::parse(sql).context("Failed to parse command")?;

    let rows = match engine.execute(&stmt).with_context(|| format!("Command failed: {sql}"))? {
        ExecuteOutcome::Mutated { rows } => rows,
        other => {
            println!("Unexpected outcome: {other:?}");
            return Ok(());
        }
    };

    if !quiet {
        println!("{} row{} affected", rows, if rows == 1 { "" } else { "s" });
    }
    Ok(())
}
