// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Interactive shell (REPL) implementation.

use anyhow::{Context, Result};
use catalogdb::query::parser;
use catalogdb::{Engine, ExecuteOutcome};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;

use crate::formatters;

pub fn run(base: &Path) -> Result<()> {
    let mut engine = Engine::open(base)
        .with_context(|| format!("Failed to open catalog at {}", base.display()))?;

    println!("catalogdb shell");
    println!("Catalog: {}", base.display());
    println!("Type .help for help, .exit to quit\n");

    let mut rl = DefaultEditor::new()?;
    let mut format = "table".to_string();

    loop {
        let readline = rl.readline("catalogdb> ");
        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if trimmed.starts_with('.') {
                    match handle_dot_command(trimmed, &mut engine, &mut format) {
                        Ok(should_exit) => {
                            if should_exit {
                                break;
                            }
                        }
                        Err(e) => eprintln!("Error: {e}"),
                    }
                    continue;
                }

                run_statement(trimmed, &mut engine, &format);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err:?}");
                break;
            }
        }
    }

    Ok(())
}

fn run_statement(sql: &str, engine: &mut Engine, format: &str) {
    let stmt = match parser::parse(sql) {
        Ok(stmt) => stmt,
        Err(e) => {
            eprintln!("Error: {e}");
            return;
        }
    };

    match engine.execute(&stmt) {
        Ok(ExecuteOutcome::Built { rows }) => println!("Built table ({rows} rows)"),
        Ok(ExecuteOutcome::Mutated { rows }) => {
            println!("{} row{} affected", rows, if rows == 1 { "" } else { "s" });
        }
        Ok(ExecuteOutcome::Query(result)) => {
            if result.status == "error" {
                eprintln!("Error: {}", result.message.unwrap_or_default());
                return;
            }
            let output = match format {
                "json" => formatters::format_json(&result),
                "csv" => formatters::format_csv(&result, true),
                _ => formatters::format_table(&result),
            };
            print!("{output}");
        }
        Ok(ExecuteOutcome::Explain(plan)) => {
            println!("plan: {} (cost {:.3}, {} rows)", plan.plan, plan.estimated_cost, plan.rows);
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn handle_dot_command(cmd: &str, engine: &mut Engine, format: &mut String) -> Result<bool> {
    let parts: Vec<&str> = cmd.split_whitespace().collect();
    let command = parts[0];

    match command {
        ".exit" | ".quit" => {
            println!("Goodbye!");
            return Ok(true);
        }
        ".help" => {
            println!("Special commands:");
            println!("  .tables          List all tables");
            println!("  .indices <table> Show per-engine entry counts");
            println!("  .format <FORMAT> Set output format (table|json|csv)");
            println!("  .clear           Clear screen");
            println!("  .help            Show this help");
            println!("  .exit            Exit shell");
        }
        ".tables" => {
            for table in engine.list_tables()? {
                println!("  - {table}");
            }
        }
        ".indices" => {
            if parts.len() < 2 {
                println!("Usage: .indices <table>");
            } else {
                for (index, count) in engine.table_stats(parts[1])? {
                    println!("  {index:<6} {count} entries");
                }
            }
        }
        ".format" => {
            if parts.len() < 2 {
                println!("Current format: {format}");
                println!("Usage: .format <table|json|csv>");
            } else {
                *format = parts[1].to_string();
                println!("Output format set to: {format}");
            }
        }
        ".clear" => {
            print!("\x1B[2J\x1B[1;1H");
        }
        _ => {
            println!("Unknown command: {command}");
            println!("Type .help for available commands");
        }
    }

    Ok(false)
}
