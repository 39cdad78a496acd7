// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Indices command implementation: per-engine disk/entry counts for a table.

use anyhow::{Context, Result};
use catalogdb::Engine;
use std::path::Path;

pub fn execute(base: &Path, table: Option<&str>) -> Result<()> {
    let mut engine = Engine::open(base)
        .with_context(|| format!("Failed to open catalog at {}", base.display()))?;

    let tables = match table {
        Some(t) => vec![t.to_string()],
        None => engine.list_tables()?,
    };

    if tables.is_empty() {
        println!("No tables found under {}", base.display());
        return Ok(());
    }

    for table in tables {
        println!("{table}:");
        let stats = engine
            .table_stats(&table)
            .with_context(|| format!("Failed to read index stats for '{table}'"))?;
        for (index, count) in stats {
            println!("  {index:<6} {count} entries");
        }
    }
    Ok(())
}
