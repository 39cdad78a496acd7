// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Query command implementation: one-shot SELECT / EXPLAIN.

use anyhow::{Context, Result};
use catalogdb::query::parser;
use catalogdb::{Engine, ExecuteOutcome};
use std::path::Path;

use crate::formatters;

#[allow(clippy::too_many_arguments)]
pub fn execute(
    base: &Path,
    sql: &str,
    format: &str,
    output: Option<&Path>,
    no_header: bool,
) -> Result<()> {
    let mut engine = Engine::open(base)
        .with_context(|| format!("Failed to open catalog at {}", base.display()))?;
    let stmt = parser::parse(sql).context("Failed to parse query")?;

    match engine.execute(&stmt).with_context(|| format!("Query failed: {sql}"))? {
        ExecuteOutcome::Query(result) => {
            if result.status == "error" {
                anyhow::bail!(result.message.unwrap_or_else(|| "query error".to_string()));
            }
            let output_str = match format {
                "json" => formatters::format_json(&result),
                "csv" => formatters::format_csv(&result, !no_header),
                _ => formatters::format_table(&result),
            };
            if let Some(path) = output {
                std::fs::write(path, &output_str)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                println!("Output written to {}", path.display());
            } else {
                print!("{output_str}");
            }
        }
        ExecuteOutcome::Explain(plan) => print_explain(&plan),
        other => println!("Unexpected outcome: {other:?}"),
    }
    Ok(())
}

fn print_explain(plan: &catalogdb::query::planner::ExplainResult) {
    println!("plan:            {}", plan.plan);
    println!("filter:          {}", plan.filter);
    println!("index used:      {}", plan.index_used);
    println!("estimated cost:  {:.3}", plan.estimated_cost);
    println!("rows:            {}", plan.rows);
    println!("execution time:  {:.3}ms", plan.execution_time_ms);
}
