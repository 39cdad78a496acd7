// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! catalogdb CLI tool.
//!
//! Command-line interface for building, querying, and administering a
//! catalogdb catalog directory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod formatters;

use catalogdb::config::Config;
use commands::{build, exec, indices, query, shell, stats};

#[derive(Parser)]
#[command(name = "catalogdb")]
#[command(author = "Vivian Voss <ask@vvoss.dev>")]
#[command(version = "0.1.0")]
#[command(about = "catalogdb CLI - five-index restaurant catalog", long_about = None)]
struct Cli {
    /// Catalog base directory (holds one subdirectory per table). Overrides
    /// catalogdb.toml and CATALOGDB_BASE_DIR when given.
    #[arg(short, long, global = true)]
    base: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a CSV file into a fresh table.
    Build {
        /// Table name.
        table: String,

        /// Path to the source CSV file.
        file: PathBuf,

        /// Comma-separated index subset (ISAM,HASH,AVL,BTREE,RTREE); default is all five.
        #[arg(short, long)]
        using: Option<String>,
    },

    /// Run a one-shot SELECT or EXPLAIN statement.
    Query {
        /// catalogdb query text (quoted).
        sql: String,

        /// Output format: table|json|csv
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Write output to file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Omit header row (CSV only).
        #[arg(long)]
        no_header: bool,
    },

    /// Run a one-shot INSERT or DELETE statement.
    Exec {
        /// catalogdb command text (quoted).
        sql: String,

        /// Don't print the affected-row count.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Open an interactive shell.
    Shell,

    /// Show process-local metrics counters.
    Stats {
        /// Output format: table|json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show per-engine entry counts (all tables, or one if given).
    Indices {
        /// Restrict to this table.
        table: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Precedence is flags > env > config file > built-in default: `Config::load`
    // already layers env over the config file over its own default, so the
    // only thing left for the CLI to do is let an explicit `--base` win over
    // whatever `Config::load` resolved.
    let config = Config::load(&std::env::current_dir()?)?;
    let base = cli.base.unwrap_or(config.base_dir.clone());

    match cli.command {
        Commands::Build { table, file, using } => {
            let using = using.or(config.default_indices.clone());
            build::execute(&base, &table, &file, using.as_deref())?
        }
        Commands::Query { sql, format, output, no_header } => {
            query::execute(&base, &sql, &format, output.as_deref(), no_header)?
        }
        Commands::Exec { sql, quiet } => exec::execute(&base, &sql, quiet)?,
        Commands::Shell => shell::run(&base)?,
        Commands::Stats { format } => stats::execute(&base, &format)?,
        Commands::Indices { table } => indices::execute(&base, table.as_deref())?,
    }

    Ok(())
}
