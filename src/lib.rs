// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! catalogdb - a single-node file-backed restaurant catalog with five
//! on-disk index structures.
//!
//! ## Architecture
//!
//! - **record**: the `Record` row type, text normalisation, and the ISAM
//!   composite key.
//! - **paged_file**: memory-mapped fixed-page block storage shared by the
//!   paged engines.
//! - **isam / exthash / avl / bplus / rtree**: the five index engines.
//! - **manager**: `IndexManager`, which fans inserts/deletes out across all
//!   five engines and enforces cross-engine `restaurant_id` uniqueness.
//! - **query**: the AST, recursive-descent parser, and planner for the
//!   SQL-like query language.
//! - **engine**: `Engine`, the per-table catalog that executes parsed
//!   statements against an `IndexManager`.
//! - **csv_source**: bulk CSV ingestion feeding `IndexManager::build`.
//! - **concurrent**: the single-writer advisory file lock.
//! - **metrics**: lightweight performance counters.
//! - **log**: append-only structured event log (fan-out steps, plan
//!   selection, page I/O) with CRC32-checked entries.
//! - **config**: `catalogdb.toml` / environment-variable settings layer.
//!
//! ## Quick Start
//!
//! ```rust
//! use catalogdb::query::parser;
//! use catalogdb::Engine;
//! use tempfile::tempdir;
//!
//! let dir = tempdir().unwrap();
//! let mut engine = Engine::open(dir.path()).unwrap();
//! let stmt = parser::parse(r#"SELECT * FROM r WHERE restaurant_id = 1"#).unwrap();
//! // `r` does not exist yet, so this particular statement returns an error;
//! // a real session starts with a CREATE TABLE statement.
//! let _ = engine.execute(&stmt);
//! ```

pub mod avl;
pub mod bplus;
pub mod concurrent;
pub mod config;
pub mod csv_source;
pub mod engine;
pub mod error;
pub mod exthash;
pub mod isam;
pub mod log;
pub mod manager;
pub mod metrics;
pub mod paged_file;
pub mod query;
pub mod record;
pub mod rtree;

pub use engine::{Engine, ExecuteOutcome};
pub use error::{CatalogError, CatalogResult};
pub use manager::IndexManager;
pub use query::{Planner, Statement};
pub use record::Record;
