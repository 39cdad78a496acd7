// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Top-level catalog engine: owns one [`IndexManager`] per table under a
//! single base directory and executes parsed [`Statement`]s against it.
//!
//! REST endpoints, any web UI, and SQL tokenising/grammar are external
//! collaborators (§1); this module is the in-process entry point those
//! collaborators would call into.

use crate::csv_source;
use crate::error::{CatalogError, CatalogResult};
use crate::manager::{engines_for, IndexManager};
use crate::query::ast::{Literal, Statement};
use crate::query::planner::{ExplainResult, Planner, QueryResult};
use crate::record::Record;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct Engine {
    base: PathBuf,
    tables: HashMap<String, IndexManager>,
}

impl Engine {
    pub fn open(base: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(base)?;
        Ok(Engine {
            base: base.to_path_buf(),
            tables: HashMap::new(),
        })
    }

    /// Looks up an already-open table, or reopens it from `<base>/<name>` on
    /// disk if a prior process already ran `CREATE TABLE` there — each CLI
    /// invocation starts with an empty `tables` map, so state otherwise
    /// would not survive between one-shot `build`/`query`/`exec` processes.
    fn table_mut(&mut self, name: &str) -> CatalogResult<&mut IndexManager> {
        if !self.tables.contains_key(name) {
            let path = self.base.join(name);
            if !path.exists() {
                return Err(CatalogError::SchemaError {
                    reason: format!("unknown table {name}"),
                });
            }
            let manager = IndexManager::open(&path)?;
            self.tables.insert(name.to_string(), manager);
        }
        Ok(self.tables.get_mut(name).expect("just inserted"))
    }

    /// Table names with an on-disk directory under this engine's base path,
    /// regardless of whether they've been opened yet this process.
    pub fn list_tables(&self) -> CatalogResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.base)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Per-engine entry counts for `table` (§10.3's `indices` subcommand).
    pub fn table_stats(&mut self, table: &str) -> CatalogResult<Vec<(&'static str, usize)>> {
        self.table_mut(table)?.engine_stats()
    }

    /// Executes one parsed statement, dispatching to the five-engine
    /// coordinator and the planner as the statement kind requires.
    pub fn execute(&mut self, stmt: &Statement) -> CatalogResult<ExecuteOutcome> {
        match stmt {
            Statement::CreateTable { name, file, using } => {
                let records = csv_source::load_records(Path::new(file))?;
                let mut manager = IndexManager::open(&self.base.join(name))?;
                let selected = engines_for(using);
                manager.build(&records, &selected)?;
                let count = records.len();
                self.tables.insert(name.clone(), manager);
                Ok(ExecuteOutcome::Built { rows: count })
            }
            Statement::Insert { table, values } => {
                let raw = positional_to_raw(values)?;
                let manager = self.table_mut(table)?;
                manager.insert_full(&raw)?;
                Ok(ExecuteOutcome::Mutated { rows: 1 })
            }
            Statement::Delete { table, predicate } => {
                let ids = resolve_delete_targets(self.table_mut(table)?, predicate)?;
                let manager = self.table_mut(table)?;
                let mut deleted = 0;
                for (name, city, id) in ids {
                    deleted += manager.delete(&name, &city, Some(id))?;
                }
                Ok(ExecuteOutcome::Mutated { rows: deleted })
            }
            Statement::Select {
                columns,
                table,
                using,
                predicate,
                explain,
            } => {
                let manager = self.table_mut(table)?;
                let mut planner = Planner::new(manager);
                match explain {
                    None => {
                        let result = planner.select(predicate.as_ref(), *using, columns);
                        Ok(ExecuteOutcome::Query(result))
                    }
                    Some(mode) => {
                        let result = planner.explain(predicate.as_ref(), *using, *mode);
                        Ok(ExecuteOutcome::Explain(result))
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExecuteOutcome {
    Built { rows: usize },
    Mutated { rows: usize },
    Query(QueryResult),
    Explain(ExplainResult),
}

/// `DELETE FROM t WHERE <pred>` resolves to concrete `(name, city, id)`
/// triples by first running the predicate as a SELECT, then reading the
/// identifying columns back off each matched row (§4.7's fan-out delete
/// is keyed on name/city/id, not on an opaque row handle).
fn resolve_delete_targets(
    manager: &mut IndexManager,
    predicate: &crate::query::ast::Predicate,
) -> CatalogResult<Vec<(String, String, u32)>> {
    let mut planner = Planner::new(manager);
    let result = planner.select(Some(predicate), None, &crate::query::ast::Columns::All);
    if result.status == "error" {
        return Err(CatalogError::PlanError {
            reason: result.message.unwrap_or_default(),
        });
    }
    Ok(result
        .rows
        .into_iter()
        .filter_map(|row| {
            let name = row.get("name")?.clone();
            let city = row.get("city")?.clone();
            let id: u32 = row.get("restaurant_id")?.parse().ok()?;
            Some((name, city, id))
        })
        .collect())
}

/// `INSERT INTO t VALUES (...)` literals are positional, in the exact
/// field order of §3's Record; re-keyed to the raw-field vocabulary so a
/// single `Record::from_raw_fields` path serves both CSV ingestion and
/// direct INSERT.
fn positional_to_raw(values: &[Literal]) -> CatalogResult<HashMap<String, String>> {
    const FIELDS: &[&str] = &[
        "Restaurant ID",
        "Restaurant Name",
        "City",
        "Country Code",
        "Address",
        "Cuisines",
        "Average Cost for two",
        "Currency",
        "Has Table booking",
        "Has Online delivery",
        "Is delivering now",
        "Price range",
        "Aggregate rating",
        "Rating text",
        "Votes",
        "Longitude",
        "Latitude",
    ];
    if values.len() != FIELDS.len() {
        return Err(CatalogError::SchemaError {
            reason: format!("INSERT expects {} values, got {}", FIELDS.len(), values.len()),
        });
    }
    let mut raw = HashMap::new();
    for (field, lit) in FIELDS.iter().zip(values.iter()) {
        let text = match lit {
            Literal::Text(s) => s.clone(),
            Literal::Number(n) => n.to_string(),
            Literal::Bool(b) => if *b { "Yes".to_string() } else { "No".to_string() },
        };
        raw.insert(field.to_string(), text);
    }
    Ok(raw)
}

/// After `build`, every id and `(name, city)` in the source must be
/// reachable, and a 0.01km search around any of its points must return it
/// (§8 IndexManager invariant). Exposed for integration tests that build a
/// manager directly rather than through the `CREATE TABLE` statement path.
pub fn assert_build_invariants(manager: &mut IndexManager, source: &[Record]) -> CatalogResult<()> {
    let mut seen_names = HashSet::new();
    for record in source {
        if manager.search_by_id(record.restaurant_id)?.is_none() {
            return Err(CatalogError::NotFound {
                what: format!("restaurant_id {} missing after build", record.restaurant_id),
            });
        }
        let key = (record.name.clone(), record.city.clone());
        if seen_names.insert(key) && manager.search_by_name(&record.name, Some(&record.city))?.is_empty() {
            return Err(CatalogError::NotFound {
                what: format!("(name, city) ({}, {}) missing after build", record.name, record.city),
            });
        }
        if manager.search_near(record.longitude, record.latitude, 0.01)?.is_empty() {
            return Err(CatalogError::NotFound {
                what: format!("restaurant_id {} not found by search_near after build", record.restaurant_id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_sample_csv(dir: &Path) -> PathBuf {
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
    fn build_then_point_query_by_id() {
        let dir = tempdir().unwrap();
        let csv_path = write_sample_csv(dir.path());
        let mut engine = Engine::open(&dir.path().join("base")).unwrap();

        let create = parser::parse(&format!(
            r#"CREATE TABLE r FROM FILE "{}""#,
            csv_path.display()
        ))
        .unwrap();
        engine.execute(&create).unwrap();

        let select = parser::parse("SELECT * FROM r WHERE restaurant_id = 6317637").unwrap();
        match engine.execute(&select).unwrap() {
            ExecuteOutcome::Query(result) => {
                assert_eq!(result.rows.len(), 1);
                assert_eq!(result.rows[0].get("name").unwrap(), "Le Petit Souffle");
            }
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn range_query_on_id_is_ascending_and_bounded() {
        let dir = tempdir().unwrap();
        let csv_path = write_sample_csv(dir.path());
        let mut engine = Engine::open(&dir.path().join("base")).unwrap();
        engine
            .execute(&parser::parse(&format!(r#"CREATE TABLE r FROM FILE "{}""#, csv_path.display())).unwrap())
            .unwrap();

        let select = parser::parse("SELECT * FROM r WHERE restaurant_id BETWEEN 6300000 AND 6320000").unwrap();
        match engine.execute(&select).unwrap() {
            ExecuteOutcome::Query(result) => {
                let ids: Vec<u32> = result
                    .rows
                    .iter()
                    .map(|r| r.get("restaurant_id").unwrap().parse().unwrap())
                    .collect();
                assert_eq!(ids, vec![6304287, 6317637]);
            }
            other => panic!("expected Query, got {other:?}"),
        }
    }

    #[test]
    fn forced_hash_on_city_is_a_plan_error() {
        let dir = tempdir().unwrap();
        let csv_path = write_sample_csv(dir.path());
        let mut engine = Engine::open(&dir.path().join("base")).unwrap();
        engine
            .execute(&parser::parse(&format!(r#"CREATE TABLE r FROM FILE "{}""#, csv_path.display())).unwrap())
            .unwrap();

        let select = parser::parse(r#"SELECT * FROM r USING HASH WHERE city = "Makati City""#).unwrap();
        match engine.execute(&select).unwrap() {
            ExecuteOutcome::Query(result) => {
                assert_eq!(result.status, "error");
                assert!(result.rows.is_empty());
            }
            other => panic!("expected Query, got {other:?}"),
        }
    }
}
