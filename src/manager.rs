// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Index coordinator: owns one instance of each of the five engines, drives
//! construction from a source stream, and fans out inserts/deletes
//! consistently across them (§4.7).

use crate::avl::AvlIndex;
use crate::bplus::BPlusIndex;
use crate::error::{CatalogError, CatalogResult};
use crate::exthash::ExtHashIndex;
use crate::isam::IsamIndex;
use crate::log::{self, CatalogEvent};
use crate::query::ast::IndexKind;
use crate::metrics::{Metric, MetricUnit, MetricsCollector};
use crate::record::{normalize, Record};
use crate::rtree::RTreeIndex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// `USING` selector passed to [`IndexManager::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    Isam,
    ExtHash,
    Avl,
    BPlus,
    RTree,
}

const ALL_ENGINES: [Engine; 5] = [Engine::Isam, Engine::ExtHash, Engine::Avl, Engine::BPlus, Engine::RTree];

pub fn engines_for(kinds: &[IndexKind]) -> Vec<Engine> {
    if kinds.is_empty() || kinds.contains(&IndexKind::All) {
        return ALL_ENGINES.to_vec();
    }
    kinds
        .iter()
        .filter_map(|k| match k {
            IndexKind::Isam => Some(Engine::Isam),
            IndexKind::Hash => Some(Engine::ExtHash),
            IndexKind::Avl => Some(Engine::Avl),
            IndexKind::BTree => Some(Engine::BPlus),
            IndexKind::RTree => Some(Engine::RTree),
            IndexKind::All => None,
        })
        .collect()
}

/// Envelope every `force_search` / planner primitive ultimately returns.
#[derive(Debug, Clone)]
pub struct SearchEnvelope {
    pub status: &'static str,
    pub index: Option<&'static str>,
    pub message: Option<String>,
    pub results: Vec<Record>,
}

impl SearchEnvelope {
    fn ok(index: &'static str, results: Vec<Record>) -> Self {
        SearchEnvelope {
            status: "ok",
            index: Some(index),
            message: None,
            results,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        SearchEnvelope {
            status: "error",
            index: None,
            message: Some(message.into()),
            results: Vec::new(),
        }
    }
}

pub struct IndexManager {
    base: PathBuf,
    pub isam: IsamIndex,
    pub exthash: ExtHashIndex,
    pub avl: AvlIndex,
    pub bplus: BPlusIndex,
    pub rtree: RTreeIndex,
}

impl IndexManager {
    pub fn open(base: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(base)?;
        Ok(IndexManager {
            base: base.to_path_buf(),
            isam: IsamIndex::open(&base.join("isam"))?,
            exthash: ExtHashIndex::open(&base.join("exthash"))?,
            avl: AvlIndex::open(&base.join("avl"))?,
            bplus: BPlusIndex::open(&base.join("bplus"))?,
            rtree: RTreeIndex::open(&base.join("rtree"))?,
        })
    }

    /// For each selected engine, resets its files and ingests `records` in
    /// the order given. Engines not selected are left untouched (and so
    /// remain empty on a fresh base directory).
    pub fn build(&mut self, records: &[Record], selected: &[Engine]) -> CatalogResult<()> {
        let wants = |e: Engine| selected.is_empty() || selected.contains(&e);

        if wants(Engine::Isam) {
            self.isam = IsamIndex::build(&self.base.join("isam"), records.to_vec())?;
        }
        if wants(Engine::ExtHash) {
            self.exthash = ExtHashIndex::build(&self.base.join("exthash"), records.to_vec())?;
        }
        if wants(Engine::Avl) {
            self.avl = AvlIndex::build(&self.base.join("avl"), records.to_vec())?;
        }
        if wants(Engine::BPlus) {
            self.bplus = BPlusIndex::build(&self.base.join("bplus"), records.to_vec())?;
        }
        if wants(Engine::RTree) {
            let points = records.iter().map(|r| (r.longitude, r.latitude, r.clone())).collect();
            self.rtree = RTreeIndex::build(&self.base.join("rtree"), points)?;
        }
        Ok(())
    }

    /// Builds a [`Record`] from raw field names in the external CSV
    /// vocabulary (`Restaurant ID`, `Restaurant Name`, `Average Cost for
    /// two`, ...; see §6.3 and `record.rs`'s doc comment), enforces global
    /// uniqueness on `restaurant_id` via the BPlus -> ExtHash -> Avl
    /// fallback chain (§4.7, §9 "Cross-engine uniqueness"), then inserts
    /// into every engine in the fixed fan-out order ISAM -> ExtHash ->
    /// RTree -> Avl -> BPlus (§5 ordering guarantees).
    ///
    /// If any engine's insert fails after the uniqueness check passes, the
    /// first error is surfaced; earlier engines already written are left as
    /// they are (§9 Open Questions — no rollback, rebuild is the recovery
    /// path).
    pub fn insert_full(&mut self, raw: &HashMap<String, String>) -> CatalogResult<()> {
        let record = Record::from_raw_fields(raw)?;

        if self.bplus.search(record.restaurant_id)?.is_some()
            || self.exthash.get(record.restaurant_id)?.is_some()
            || self.avl.search_by_id(record.restaurant_id)?.is_some()
        {
            return Err(CatalogError::DuplicateId {
                restaurant_id: record.restaurant_id,
            });
        }

        self.isam.insert(record.clone())?;
        self.log_event("fanout_step", "ISAM", "insert_full", true);
        self.exthash.insert(record.restaurant_id, record.clone())?;
        self.log_event("fanout_step", "HASH", "insert_full", true);
        self.rtree.add_point(record.longitude, record.latitude, record.clone())?;
        self.log_event("fanout_step", "RTREE", "insert_full", true);
        self.avl.insert(record.clone())?;
        self.log_event("fanout_step", "AVL", "insert_full", true);
        self.bplus.insert(record.restaurant_id, record)?;
        self.log_event("fanout_step", "BTREE", "insert_full", true);
        Ok(())
    }

    /// Deletes by `(name, city, id?)`. If `id` is absent, every id sharing
    /// that (name, city) is resolved via an ISAM scan first. Each resolved
    /// id then fans out to all five engines in the same fixed order as
    /// insert; a per-engine failure is not fatal to the others (§4.7).
    pub fn delete(&mut self, name: &str, city: &str, id: Option<u32>) -> CatalogResult<usize> {
        let ids: Vec<u32> = match id {
            Some(id) => vec![id],
            None => {
                let norm_name = normalize(name);
                let norm_city = normalize(city);
                self.isam
                    .full_scan()?
                    .into_iter()
                    .filter(|r| normalize(&r.name) == norm_name && normalize(&r.city) == norm_city)
                    .map(|r| r.restaurant_id)
                    .collect()
            }
        };

        let mut deleted = 0;
        for id in ids {
            let mut any = false;
            let isam_ok = self.isam.delete(name, city, id).unwrap_or(false);
            self.log_event("fanout_step", "ISAM", "delete", isam_ok);
            if isam_ok {
                any = true;
            }
            let hash_ok = self.exthash.remove(id).is_ok();
            self.log_event("fanout_step", "HASH", "delete", hash_ok);
            if !hash_ok {
                record_fanout_failure("HASH");
            }
            let rtree_ok = self.rtree.remove_point_by_id(id).is_ok();
            self.log_event("fanout_step", "RTREE", "delete", rtree_ok);
            if !rtree_ok {
                record_fanout_failure("RTREE");
            }
            let avl_ok = self.avl.delete(id).unwrap_or(false);
            self.log_event("fanout_step", "AVL", "delete", avl_ok);
            if avl_ok {
                any = true;
            }
            let bplus_ok = self.bplus.delete(id).is_ok();
            self.log_event("fanout_step", "BTREE", "delete", bplus_ok);
            if !bplus_ok {
                record_fanout_failure("BTREE");
            }
            if any {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// `Avl -> BPlus -> ExtHash` fallback chain; first hit wins (§4.7).
    pub fn search_by_id(&mut self, id: u32) -> CatalogResult<Option<Record>> {
        if let Some(r) = self.avl.search_by_id(id)? {
            return Ok(Some(r));
        }
        if let Some(r) = self.bplus.search(id)? {
            return Ok(Some(r));
        }
        self.exthash.get(id)
    }

    pub fn search_range_id(&self, lo: u32, hi: u32) -> CatalogResult<Vec<Record>> {
        self.bplus.range(lo, hi)
    }

    pub fn search_by_name(&self, name: &str, city: Option<&str>) -> CatalogResult<Vec<Record>> {
        match city {
            Some(city) => Ok(self.isam.search(name, city, None)?.into_iter().collect()),
            None => self.isam.search_text("name", name, false),
        }
    }

    pub fn search_comparison(&mut self, attr: &str, op: &str, value: f64) -> CatalogResult<Vec<Record>> {
        self.avl.search_comparison(attr, op, value)
    }

    pub fn search_between(&mut self, attr: &str, lo: f64, hi: f64) -> CatalogResult<Vec<Record>> {
        self.avl.search_between(attr, lo, hi)
    }

    pub fn search_near(&self, x: f64, y: f64, radius_km: f64) -> CatalogResult<Vec<Record>> {
        Ok(self.rtree.range_search_km(x, y, radius_km)?.into_iter().map(|(_, r)| r).collect())
    }

    pub fn search_text(&self, attr: &str, value: &str, like: bool) -> CatalogResult<Vec<Record>> {
        self.isam.search_text(attr, value, like)
    }

    /// Per-engine entry counts for the CLI's `indices` subcommand (§10.3).
    pub fn engine_stats(&mut self) -> CatalogResult<Vec<(&'static str, usize)>> {
        Ok(vec![
            ("ISAM", self.isam.full_scan()?.len()),
            ("HASH", self.exthash.directory_len()),
            ("AVL", self.avl.full_scan()?.len()),
            ("BTREE", self.bplus.range(0, u32::MAX)?.len()),
            ("RTREE", self.rtree.len()),
        ])
    }

    pub fn rebuild_all(&mut self) -> CatalogResult<()> {
        self.isam.rebuild_from_data(&self.base.join("isam"))?;
        self.rtree.rebuild_from_data()?;
        Ok(())
    }

    /// Validates `index` against `attr` per the force-search compatibility
    /// matrix (§4.7) and runs the corresponding primitive; an inadmissible
    /// pair returns an error envelope with an empty result set rather than
    /// aborting (§7 `PlanError`).
    pub fn force_search(&mut self, index: IndexKind, simple: &crate::query::ast::SimplePredicate) -> SearchEnvelope {
        use crate::query::ast::SimplePredicate as SP;
        match (index, simple) {
            (IndexKind::Isam, SP::Cmp { attr, op: crate::query::ast::CmpOp::Eq, value }) if attr == "name" || attr == "city" => {
                let text = match value.as_str() {
                    Some(t) => t,
                    None => return SearchEnvelope::error("ISAM requires a text literal"),
                };
                match self.search_text(attr, text, false) {
                    Ok(rows) => SearchEnvelope::ok("ISAM", rows),
                    Err(e) => SearchEnvelope::error(e.to_string()),
                }
            }
            (IndexKind::Isam, SP::Like { attr, pattern }) if attr == "name" || attr == "city" => {
                match self.search_text(attr, pattern, true) {
                    Ok(rows) => SearchEnvelope::ok("ISAM", rows),
                    Err(e) => SearchEnvelope::error(e.to_string()),
                }
            }
            (IndexKind::Avl, SP::Cmp { attr, op, value }) if is_avl_attr(attr) => {
                let v = match value.as_f64() {
                    Some(v) => v,
                    None => return SearchEnvelope::error("AVL requires a numeric literal"),
                };
                match self.search_comparison(attr, op.symbol(), v) {
                    Ok(rows) => SearchEnvelope::ok("AVL", rows),
                    Err(e) => SearchEnvelope::error(e.to_string()),
                }
            }
            (IndexKind::Avl, SP::Between { attr, lo, hi }) if is_avl_attr(attr) => {
                match (lo.as_f64(), hi.as_f64()) {
                    (Some(lo), Some(hi)) => match self.search_between(attr, lo, hi) {
                        Ok(rows) => SearchEnvelope::ok("AVL", rows),
                        Err(e) => SearchEnvelope::error(e.to_string()),
                    },
                    _ => SearchEnvelope::error("AVL BETWEEN requires numeric bounds"),
                }
            }
            (IndexKind::Hash, SP::Cmp { attr, op: crate::query::ast::CmpOp::Eq, value }) if attr == "restaurant_id" => {
                let id = match value.as_f64() {
                    Some(v) => v as u32,
                    None => return SearchEnvelope::error("HASH requires a numeric restaurant_id"),
                };
                match self.exthash.get(id) {
                    Ok(Some(r)) => SearchEnvelope::ok("HASH", vec![r]),
                    Ok(None) => SearchEnvelope::ok("HASH", Vec::new()),
                    Err(e) => SearchEnvelope::error(e.to_string()),
                }
            }
            (IndexKind::BTree, SP::Cmp { attr, op, value }) if attr == "restaurant_id" => {
                let id = match value.as_f64() {
                    Some(v) => v as u32,
                    None => return SearchEnvelope::error("BTREE requires a numeric restaurant_id"),
                };
                // Non-equality comparisons have no single-key BTree primitive;
                // route through the same range-scan bounds the planner's
                // unforced cascade uses (query/planner.rs's `cascade_cmp`).
                match op {
                    crate::query::ast::CmpOp::Eq => match self.bplus.search(id) {
                        Ok(Some(r)) => SearchEnvelope::ok("BTREE", vec![r]),
                        Ok(None) => SearchEnvelope::ok("BTREE", Vec::new()),
                        Err(e) => SearchEnvelope::error(e.to_string()),
                    },
                    crate::query::ast::CmpOp::Gt => self.btree_range_envelope(id.saturating_add(1), u32::MAX),
                    crate::query::ast::CmpOp::Ge => self.btree_range_envelope(id, u32::MAX),
                    crate::query::ast::CmpOp::Lt => self.btree_range_envelope(0, id.saturating_sub(1)),
                    crate::query::ast::CmpOp::Le => self.btree_range_envelope(0, id),
                }
            }
            (IndexKind::BTree, SP::Between { attr, lo, hi }) if attr == "restaurant_id" => {
                match (lo.as_f64(), hi.as_f64()) {
                    (Some(lo), Some(hi)) => match self.search_range_id(lo as u32, hi as u32) {
                        Ok(rows) => SearchEnvelope::ok("BTREE", rows),
                        Err(e) => SearchEnvelope::error(e.to_string()),
                    },
                    _ => SearchEnvelope::error("BTREE BETWEEN requires numeric bounds"),
                }
            }
            (IndexKind::RTree, SP::SpatialIn { point, radius_km }) => {
                match self.search_near(point.0, point.1, *radius_km) {
                    Ok(rows) => SearchEnvelope::ok("RTREE", rows),
                    Err(e) => SearchEnvelope::error(e.to_string()),
                }
            }
            (index, simple) => SearchEnvelope::error(format!(
                "{} is not admissible for {:?}",
                index.name(),
                simple
            )),
        }
    }

    fn btree_range_envelope(&self, lo: u32, hi: u32) -> SearchEnvelope {
        match self.search_range_id(lo, hi) {
            Ok(rows) => SearchEnvelope::ok("BTREE", rows),
            Err(e) => SearchEnvelope::error(e.to_string()),
        }
    }

    /// Appends one entry to the base directory's `events.log` (§10.4).
    /// Best-effort: a logging failure (e.g. a full disk) never aborts the
    /// operation it's describing, matching the same tolerance the manager
    /// already gives per-engine fan-out failures.
    pub fn log_event(&self, kind: &str, engine: &str, detail: &str, ok: bool) {
        let event = CatalogEvent::new(kind, engine, detail, ok);
        let _ = log::append_event(&self.events_path(), &event);
    }

    fn events_path(&self) -> PathBuf {
        self.base.join("events.log")
    }
}

fn record_fanout_failure(engine: &str) {
    MetricsCollector::global().record(
        Metric::new("fanout_failure", 1.0, MetricUnit::Count).with_tag("engine", engine),
    );
}

fn is_avl_attr(attr: &str) -> bool {
    matches!(
        attr,
        "rating" | "aggregate_rating" | "votes" | "average_cost_for_two" | "avg_cost_for_two"
    )
}

impl Record {
    /// Normalises the external CSV vocabulary's column names (Zomato-style:
    /// `Restaurant ID`, `Restaurant Name`, `Average Cost for two`, ...) into
    /// a [`Record`] (§4.7, §6.3).
    pub fn from_raw_fields(raw: &HashMap<String, String>) -> CatalogResult<Record> {
        let get = |key: &str| raw.get(key).map(|s| s.as_str()).unwrap_or("");
        let parse_u32 = |key: &str| -> CatalogResult<u32> {
            get(key).trim().parse().map_err(|_| CatalogError::SchemaError {
                reason: format!("column {key} is not a valid integer"),
            })
        };
        let parse_i32 = |key: &str| -> CatalogResult<i32> {
            get(key).trim().parse().map_err(|_| CatalogError::SchemaError {
                reason: format!("column {key} is not a valid integer"),
            })
        };
        let parse_f64 = |key: &str| -> CatalogResult<f64> {
            get(key).trim().parse().map_err(|_| CatalogError::SchemaError {
                reason: format!("column {key} is not a valid number"),
            })
        };
        let parse_bool = |key: &str| -> bool {
            matches!(get(key).trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1")
        };

        Ok(Record {
            restaurant_id: parse_u32("Restaurant ID")?,
            name: get("Restaurant Name").to_string(),
            city: get("City").to_string(),
            country_code: parse_i32("Country Code")? as u16,
            address: get("Address").to_string(),
            cuisines: get("Cuisines").to_string(),
            avg_cost_for_two: parse_i32("Average Cost for two")?,
            currency: get("Currency").to_string(),
            has_table_booking: parse_bool("Has Table booking"),
            has_online_delivery: parse_bool("Has Online delivery"),
            is_delivering_now: parse_bool("Is delivering now"),
            price_range: parse_i32("Price range")?,
            aggregate_rating: parse_f64("Aggregate rating")?,
            rating_text: get("Rating text").to_string(),
            votes: parse_i32("Votes")?,
            longitude: parse_f64("Longitude")?,
            latitude: parse_f64("Latitude")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn raw_row(id: &str, name: &str, city: &str) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("Restaurant ID".into(), id.into());
        m.insert("Restaurant Name".into(), name.into());
        m.insert("City".into(), city.into());
        m.insert("Country Code".into(), "1".into());
        m.insert("Address".into(), "addr".into());
        m.insert("Cuisines".into(), "French".into());
        m.insert("Average Cost for two".into(), "1100".into());
        m.insert("Currency".into(), "USD".into());
        m.insert("Has Table booking".into(), "Yes".into());
        m.insert("Has Online delivery".into(), "No".into());
        m.insert("Is delivering now".into(), "No".into());
        m.insert("Price range".into(), "3".into());
        m.insert("Aggregate rating".into(), "4.8".into());
        m.insert("Rating text".into(), "Excellent".into());
        m.insert("Votes".into(), "314".into());
        m.insert("Longitude".into(), "121.02".into());
        m.insert("Latitude".into(), "14.56".into());
        m
    }

    #[test]
    fn build_then_search_by_id_and_name_and_near() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        let records: Vec<Record> = (0..5)
            .map(|i| Record::from_raw_fields(&raw_row(&(6317637 + i).to_string(), "Le Petit Souffle", "Makati City")).unwrap())
            .collect();
        mgr.build(&records, &[]).unwrap();

        for r in &records {
            assert!(mgr.search_by_id(r.restaurant_id).unwrap().is_some());
            assert!(!mgr.search_by_name(&r.name, Some(&r.city)).unwrap().is_empty());
        }
        let near = mgr.search_near(121.02, 14.56, 0.01).unwrap();
        assert!(!near.is_empty());
    }

    #[test]
    fn duplicate_insert_is_rejected_and_does_not_mutate_state() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        let raw = raw_row("9999991", "A", "B");
        mgr.insert_full(&raw).unwrap();
        let before = mgr.search_by_id(9999991).unwrap();
        let err = mgr.insert_full(&raw).unwrap_err();
        assert_eq!(err.kind(), "DuplicateId");
        let after = mgr.search_by_id(9999991).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn delete_then_insert_succeeds_again() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        let raw = raw_row("42", "Cafe", "Town");
        mgr.insert_full(&raw).unwrap();
        mgr.delete("Cafe", "Town", Some(42)).unwrap();
        assert!(mgr.search_by_id(42).unwrap().is_none());
        mgr.insert_full(&raw).unwrap();
        assert!(mgr.search_by_id(42).unwrap().is_some());
    }

    #[test]
    fn force_search_hash_rejects_city_predicate() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        let envelope = mgr.force_search(
            IndexKind::Hash,
            &crate::query::ast::SimplePredicate::Cmp {
                attr: "city".to_string(),
                op: crate::query::ast::CmpOp::Eq,
                value: crate::query::ast::Literal::Text("Makati City".to_string()),
            },
        );
        assert_eq!(envelope.status, "error");
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn force_search_btree_greater_than_is_a_range_scan_not_an_exact_lookup() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw_row("100", "A", "City")).unwrap();
        mgr.insert_full(&raw_row("101", "B", "City")).unwrap();
        mgr.insert_full(&raw_row("102", "C", "City")).unwrap();

        let envelope = mgr.force_search(
            IndexKind::BTree,
            &crate::query::ast::SimplePredicate::Cmp {
                attr: "restaurant_id".to_string(),
                op: crate::query::ast::CmpOp::Gt,
                value: crate::query::ast::Literal::Number(100.0),
            },
        );
        assert_eq!(envelope.status, "ok");
        let ids: std::collections::HashSet<u32> =
            envelope.results.iter().map(|r| r.restaurant_id).collect();
        assert_eq!(ids, [101, 102].into_iter().collect());
    }

    #[test]
    fn insert_full_records_a_fanout_step_per_engine() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw_row("7", "D", "E")).unwrap();

        let events = crate::log::read_events(&dir.path().join("events.log")).unwrap();
        let fanout: Vec<_> = events.iter().filter(|e| e.kind == "fanout_step").collect();
        assert_eq!(fanout.len(), 5);
        assert!(fanout.iter().all(|e| e.ok));
        let engines: std::collections::HashSet<&str> =
            fanout.iter().map(|e| e.engine.as_str()).collect();
        assert_eq!(engines, ["ISAM", "HASH", "RTREE", "AVL", "BTREE"].into_iter().collect());
    }
}
