// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Query planner: picks an index per leaf predicate (or obeys a forced
//! hint), executes, and composes compound `AND`/`OR` results (§4.8).

use super::ast::{Columns, CmpOp, ExplainMode, IndexKind, Predicate, SimplePredicate};
use crate::manager::IndexManager;
use crate::metrics::{Metric, MetricUnit, MetricsCollector};
use crate::record::Record;
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub status: &'static str,
    pub message: Option<String>,
    pub index_used: Vec<&'static str>,
    pub rows: Vec<BTreeMap<String, String>>,
}

/// Analytic cost model used by `EXPLAIN`/`EXPLAIN ANALYZE` (§4.8, §9
/// "EXPLAIN without execution"): a linear `startup + rows*(cpu+io)`
/// approximation with a small per-index table.
#[derive(Debug, Clone)]
pub struct ExplainResult {
    pub plan: String,
    pub filter: String,
    pub index_used: &'static str,
    pub estimated_cost: f64,
    pub rows: usize,
    pub execution_time_ms: f64,
}

struct CostModel {
    startup: f64,
    cpu_per_tuple: f64,
    io_per_tuple: f64,
}

fn cost_model_for(index: &str) -> CostModel {
    match index {
        "ISAM" => CostModel { startup: 0.5, cpu_per_tuple: 0.01, io_per_tuple: 0.05 },
        "AVL" => CostModel { startup: 0.2, cpu_per_tuple: 0.02, io_per_tuple: 0.03 },
        "HASH" => CostModel { startup: 0.1, cpu_per_tuple: 0.005, io_per_tuple: 0.02 },
        "BTREE" => CostModel { startup: 0.3, cpu_per_tuple: 0.01, io_per_tuple: 0.02 },
        "RTREE" => CostModel { startup: 0.4, cpu_per_tuple: 0.03, io_per_tuple: 0.04 },
        _ => CostModel { startup: 1.0, cpu_per_tuple: 0.05, io_per_tuple: 0.05 },
    }
}

pub struct Planner<'a> {
    pub manager: &'a mut IndexManager,
}

impl<'a> Planner<'a> {
    pub fn new(manager: &'a mut IndexManager) -> Self {
        Planner { manager }
    }

    /// Runs `predicate`, honouring `using_index` as a hint on every leaf,
    /// then projects the result to `columns` if it isn't `*` (§4.8).
    pub fn select(
        &mut self,
        predicate: Option<&Predicate>,
        using_index: Option<IndexKind>,
        columns: &Columns,
    ) -> QueryResult {
        let start = Instant::now();
        let result = self.select_inner(predicate, using_index, columns);
        MetricsCollector::global().record(Metric::new(
            "query_duration",
            start.elapsed().as_secs_f64() * 1_000_000.0,
            MetricUnit::Microseconds,
        ));
        result
    }

    fn select_inner(
        &mut self,
        predicate: Option<&Predicate>,
        using_index: Option<IndexKind>,
        columns: &Columns,
    ) -> QueryResult {
        let predicate = match predicate {
            Some(p) => p.clone(),
            None => {
                // No WHERE clause: a full scan via the canonical row store.
                let rows = self.manager.avl.full_scan().unwrap_or_default();
                return self.finish(rows, vec!["AVL"], columns, "ok", None);
            }
        };

        let (rows, indexes, status, message) = self.eval(&predicate, using_index);
        self.finish(rows, indexes, columns, status, message)
    }

    fn finish(
        &self,
        rows: Vec<Record>,
        indexes: Vec<&'static str>,
        columns: &Columns,
        status: &'static str,
        message: Option<String>,
    ) -> QueryResult {
        QueryResult {
            status,
            message,
            index_used: indexes,
            rows: rows.iter().map(|r| project(r, columns)).collect(),
        }
    }

    fn eval(
        &mut self,
        predicate: &Predicate,
        using_index: Option<IndexKind>,
    ) -> (Vec<Record>, Vec<&'static str>, &'static str, Option<String>) {
        match predicate {
            Predicate::Leaf(simple) => self.eval_leaf(simple, using_index),
            Predicate::And(l, r) => {
                let (left, li, ls, lm) = self.eval(l, using_index);
                let (right, ri, rs, rm) = self.eval(r, using_index);
                if ls == "error" {
                    return (Vec::new(), li, "error", lm);
                }
                if rs == "error" {
                    return (Vec::new(), ri, "error", rm);
                }
                let right_ids: std::collections::HashSet<u32> =
                    right.iter().map(|r| r.restaurant_id).collect();
                let merged: BTreeMap<u32, Record> = left
                    .into_iter()
                    .filter(|r| right_ids.contains(&r.restaurant_id))
                    .map(|r| (r.restaurant_id, r))
                    .collect();
                let mut indexes = li;
                indexes.extend(ri);
                (merged.into_values().collect(), indexes, "ok", None)
            }
            Predicate::Or(l, r) => {
                let (left, li, ls, lm) = self.eval(l, using_index);
                let (right, ri, rs, rm) = self.eval(r, using_index);
                if ls == "error" {
                    return (Vec::new(), li, "error", lm);
                }
                if rs == "error" {
                    return (Vec::new(), ri, "error", rm);
                }
                let mut merged: BTreeMap<u32, Record> =
                    left.into_iter().map(|r| (r.restaurant_id, r)).collect();
                for r in right {
                    merged.entry(r.restaurant_id).or_insert(r);
                }
                let mut indexes = li;
                indexes.extend(ri);
                (merged.into_values().collect(), indexes, "ok", None)
            }
        }
    }

    fn eval_leaf(
        &mut self,
        simple: &SimplePredicate,
        using_index: Option<IndexKind>,
    ) -> (Vec<Record>, Vec<&'static str>, &'static str, Option<String>) {
        if let Some(index) = using_index {
            let envelope = self.manager.force_search(index, simple);
            self.manager.log_event(
                "plan_selected",
                envelope.index.unwrap_or("-"),
                "forced",
                envelope.status == "ok",
            );
            return (
                envelope.results,
                envelope.index.into_iter().collect(),
                envelope.status,
                envelope.message,
            );
        }

        let result = match simple {
            SimplePredicate::Cmp { attr, op, value } if attr == "name" || attr == "city" => {
                if *op != CmpOp::Eq {
                    return (Vec::new(), Vec::new(), "error", Some(format!("{attr} only supports =")));
                }
                let text = value.as_str().unwrap_or("");
                let rows = if attr == "city" {
                    self.manager.search_text("city", text, false).unwrap_or_default()
                } else {
                    self.manager.search_by_name(text, None).unwrap_or_default()
                };
                (rows, vec!["ISAM"], "ok", None)
            }
            SimplePredicate::Cmp { attr, op, value } if attr == "restaurant_id" => {
                let id = value.as_f64().unwrap_or(0.0) as u32;
                let rows = match op {
                    CmpOp::Eq => self.manager.search_by_id(id).unwrap_or_default().into_iter().collect(),
                    _ => cascade_cmp(self.manager, id, *op),
                };
                (rows, vec!["AVL", "BTREE", "HASH"], "ok", None)
            }
            SimplePredicate::Cmp { attr, op, value } if is_numeric_attr(attr) => {
                let v = value.as_f64().unwrap_or(0.0);
                let rows = self.manager.search_comparison(attr, op.symbol(), v).unwrap_or_default();
                (rows, vec!["AVL"], "ok", None)
            }
            SimplePredicate::Between { attr, lo, hi } if attr == "restaurant_id" => {
                let rows = self
                    .manager
                    .search_range_id(lo.as_f64().unwrap_or(0.0) as u32, hi.as_f64().unwrap_or(0.0) as u32)
                    .unwrap_or_default();
                (rows, vec!["BTREE"], "ok", None)
            }
            SimplePredicate::Between { attr, lo, hi } if is_numeric_attr(attr) => {
                let rows = self
                    .manager
                    .search_between(attr, lo.as_f64().unwrap_or(0.0), hi.as_f64().unwrap_or(0.0))
                    .unwrap_or_default();
                (rows, vec!["AVL"], "ok", None)
            }
            SimplePredicate::SpatialIn { point, radius_km } => {
                let rows = self.manager.search_near(point.0, point.1, *radius_km).unwrap_or_default();
                (rows, vec!["RTREE"], "ok", None)
            }
            SimplePredicate::Like { attr, pattern } => {
                let rows = self.manager.search_text(attr, pattern, true).unwrap_or_default();
                (rows, vec!["ISAM"], "ok", None)
            }
            other => (
                Vec::new(),
                Vec::new(),
                "error",
                Some(format!("unsupported predicate {other:?}")),
            ),
        };
        self.manager.log_event(
            "plan_selected",
            result.1.first().copied().unwrap_or("-"),
            "unforced",
            result.2 == "ok",
        );
        result
    }

    /// `EXPLAIN` / `EXPLAIN ANALYZE`: the former never executes — `rows`
    /// and `execution_time_ms` stay zero and `estimated_cost` comes from
    /// the analytic model alone; the latter actually runs the query and
    /// fills in the measured row count and timing (§4.8, §7 "EXPLAIN never
    /// executes write paths even under ANALYZE").
    pub fn explain(
        &mut self,
        predicate: Option<&Predicate>,
        using_index: Option<IndexKind>,
        mode: ExplainMode,
    ) -> ExplainResult {
        let (chosen_index, filter) = match predicate {
            Some(p) => (using_index.map(|i| i.name()).unwrap_or_else(|| pick_label(p)), format!("{p:?}")),
            None => ("AVL", "(no filter)".to_string()),
        };
        let model = cost_model_for(chosen_index);

        match mode {
            ExplainMode::Plan => ExplainResult {
                plan: format!("scan via {chosen_index}"),
                filter,
                index_used: leak(chosen_index),
                estimated_cost: model.startup,
                rows: 0,
                execution_time_ms: 0.0,
            },
            ExplainMode::Analyze => {
                let columns = Columns::All;
                let result = self.select(predicate, using_index, &columns);
                let rows = result.rows.len();
                let estimated_cost =
                    model.startup + rows as f64 * (model.cpu_per_tuple + model.io_per_tuple);
                ExplainResult {
                    plan: format!("scan via {chosen_index}"),
                    filter,
                    index_used: result.index_used.first().copied().unwrap_or(chosen_index),
                    estimated_cost,
                    rows,
                    execution_time_ms: estimated_cost / 10.0,
                }
            }
        }
    }
}

fn leak(s: &str) -> &'static str {
    match s {
        "ISAM" => "ISAM",
        "AVL" => "AVL",
        "HASH" => "HASH",
        "BTREE" => "BTREE",
        "RTREE" => "RTREE",
        _ => "AVL",
    }
}

fn pick_label(predicate: &Predicate) -> &'static str {
    match predicate {
        Predicate::Leaf(SimplePredicate::Cmp { attr, .. }) if attr == "name" || attr == "city" => "ISAM",
        Predicate::Leaf(SimplePredicate::Cmp { attr, .. }) if attr == "restaurant_id" => "AVL",
        Predicate::Leaf(SimplePredicate::Between { attr, .. }) if attr == "restaurant_id" => "BTREE",
        Predicate::Leaf(SimplePredicate::SpatialIn { .. }) => "RTREE",
        Predicate::Leaf(_) => "AVL",
        Predicate::And(l, _) | Predicate::Or(l, _) => pick_label(l),
    }
}

fn is_numeric_attr(attr: &str) -> bool {
    matches!(
        attr,
        "rating" | "aggregate_rating" | "votes" | "average_cost_for_two" | "avg_cost_for_two" | "price_range"
    )
}

fn cascade_cmp(manager: &mut IndexManager, id: u32, op: CmpOp) -> Vec<Record> {
    // Non-equality id comparisons have no single-engine primitive; the
    // BPlus-backed range scan is the natural fit, bounded at u32::MAX/0.
    match op {
        CmpOp::Gt => manager.search_range_id(id.saturating_add(1), u32::MAX).unwrap_or_default(),
        CmpOp::Ge => manager.search_range_id(id, u32::MAX).unwrap_or_default(),
        CmpOp::Lt => manager.search_range_id(0, id.saturating_sub(1)).unwrap_or_default(),
        CmpOp::Le => manager.search_range_id(0, id).unwrap_or_default(),
        CmpOp::Eq => manager.search_by_id(id).unwrap_or_default().into_iter().collect(),
    }
}

/// Projects a [`Record`] to the requested column subset; unknown columns
/// are silently omitted (§4.8).
fn project(record: &Record, columns: &Columns) -> BTreeMap<String, String> {
    let all = all_fields(record);
    match columns {
        Columns::All => all,
        Columns::List(names) => names
            .iter()
            .filter_map(|name| all.get(name).map(|v| (name.clone(), v.clone())))
            .collect(),
    }
}

fn all_fields(r: &Record) -> BTreeMap<String, String> {
    let mut m = BTreeMap::new();
    m.insert("restaurant_id".into(), r.restaurant_id.to_string());
    m.insert("name".into(), r.name.clone());
    m.insert("city".into(), r.city.clone());
    m.insert("country_code".into(), r.country_code.to_string());
    m.insert("address".into(), r.address.clone());
    m.insert("cuisines".into(), r.cuisines.clone());
    m.insert("avg_cost_for_two".into(), r.avg_cost_for_two.to_string());
    m.insert("currency".into(), r.currency.clone());
    m.insert("has_table_booking".into(), r.has_table_booking.to_string());
    m.insert("has_online_delivery".into(), r.has_online_delivery.to_string());
    m.insert("is_delivering_now".into(), r.is_delivering_now.to_string());
    m.insert("price_range".into(), r.price_range.to_string());
    m.insert("aggregate_rating".into(), r.aggregate_rating.to_string());
    m.insert("rating_text".into(), r.rating_text.clone());
    m.insert("votes".into(), r.votes.to_string());
    m.insert("longitude".into(), r.longitude.to_string());
    m.insert("latitude".into(), r.latitude.to_string());
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ast::Literal;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn raw(id: u32, name: &str, city: &str, rating: f64) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("Restaurant ID".into(), id.to_string());
        m.insert("Restaurant Name".into(), name.into());
        m.insert("City".into(), city.into());
        m.insert("Country Code".into(), "1".into());
        m.insert("Address".into(), "addr".into());
        m.insert("Cuisines".into(), "French".into());
        m.insert("Average Cost for two".into(), "1000".into());
        m.insert("Currency".into(), "USD".into());
        m.insert("Has Table booking".into(), "No".into());
        m.insert("Has Online delivery".into(), "No".into());
        m.insert("Is delivering now".into(), "No".into());
        m.insert("Price range".into(), "2".into());
        m.insert("Aggregate rating".into(), rating.to_string());
        m.insert("Rating text".into(), "Good".into());
        m.insert("Votes".into(), "10".into());
        m.insert("Longitude".into(), "121.03".into());
        m.insert("Latitude".into(), "14.56".into());
        m
    }

    #[test]
    fn and_is_intersection_and_deduplicated() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw(1, "A", "Makati City", 4.5)).unwrap();
        mgr.insert_full(&raw(2, "B", "Makati City", 3.0)).unwrap();
        mgr.insert_full(&raw(3, "C", "Quezon City", 4.8)).unwrap();

        let mut planner = Planner::new(&mut mgr);
        let predicate = Predicate::And(
            Box::new(Predicate::Leaf(SimplePredicate::Cmp {
                attr: "city".into(),
                op: CmpOp::Eq,
                value: Literal::Text("Makati City".into()),
            })),
            Box::new(Predicate::Leaf(SimplePredicate::Cmp {
                attr: "aggregate_rating".into(),
                op: CmpOp::Gt,
                value: Literal::Number(4.0),
            })),
        );
        let result = planner.select(Some(&predicate), None, &Columns::All);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get("restaurant_id").unwrap(), "1");
    }

    #[test]
    fn forced_mismatch_returns_error_envelope() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw(1, "A", "Makati City", 4.5)).unwrap();
        let mut planner = Planner::new(&mut mgr);
        let predicate = Predicate::Leaf(SimplePredicate::Cmp {
            attr: "city".into(),
            op: CmpOp::Eq,
            value: Literal::Text("Makati City".into()),
        });
        let result = planner.select(Some(&predicate), Some(IndexKind::Hash), &Columns::All);
        assert_eq!(result.status, "error");
        assert!(result.rows.is_empty());
    }

    #[test]
    fn projection_drops_unrequested_columns() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw(1, "A", "Makati City", 4.5)).unwrap();
        let mut planner = Planner::new(&mut mgr);
        let predicate = Predicate::Leaf(SimplePredicate::Cmp {
            attr: "restaurant_id".into(),
            op: CmpOp::Eq,
            value: Literal::Number(1.0),
        });
        let columns = Columns::List(vec!["name".to_string(), "city".to_string()]);
        let result = planner.select(Some(&predicate), None, &columns);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].len(), 2);
        assert!(result.rows[0].contains_key("name"));
        assert!(!result.rows[0].contains_key("restaurant_id"));
    }

    #[test]
    fn explain_without_analyze_does_not_execute() {
        let dir = tempdir().unwrap();
        let mut mgr = IndexManager::open(dir.path()).unwrap();
        mgr.insert_full(&raw(1, "A", "Makati City", 4.5)).unwrap();
        let mut planner = Planner::new(&mut mgr);
        let predicate = Predicate::Leaf(SimplePredicate::Cmp {
            attr: "restaurant_id".into(),
            op: CmpOp::Eq,
            value: Literal::Number(1.0),
        });
        let plan = planner.explain(Some(&predicate), None, ExplainMode::Plan);
        assert_eq!(plan.rows, 0);
        assert_eq!(plan.execution_time_ms, 0.0);

        let analyzed = planner.explain(Some(&predicate), None, ExplainMode::Analyze);
        assert_eq!(analyzed.rows, 1);
        assert!(analyzed.estimated_cost > 0.0);
    }
}
