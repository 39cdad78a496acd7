// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for the five-engine fan-out and the planner's leaf dispatch.

use catalogdb::manager::IndexManager;
use catalogdb::query::ast::{CmpOp, Literal, Predicate, SimplePredicate};
use catalogdb::query::planner::Planner;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashMap;
use tempfile::tempdir;

fn raw_row(id: u32) -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("Restaurant ID".into(), id.to_string());
    m.insert("Restaurant Name".into(), format!("Restaurant {id}"));
    m.insert("City".into(), "Makati City".into());
    m.insert("Country Code".into(), "1".into());
    m.insert("Address".into(), "addr".into());
    m.insert("Cuisines".into(), "French".into());
    m.insert("Average Cost for two".into(), "1000".into());
    m.insert("Currency".into(), "USD".into());
    m.insert("Has Table booking".into(), "No".into());
    m.insert("Has Online delivery".into(), "No".into());
    m.insert("Is delivering now".into(), "No".into());
    m.insert("Price range".into(), "2".into());
    m.insert("Aggregate rating".into(), "4.2".into());
    m.insert("Rating text".into(), "Good".into());
    m.insert("Votes".into(), "10".into());
    m.insert("Longitude".into(), (121.0 + id as f64 / 100000.0).to_string());
    m.insert("Latitude".into(), (14.5 + id as f64 / 100000.0).to_string());
    m
}

fn bench_insert_full(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_full");
    for size in [100usize, 500, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let dir = tempdir().unwrap();
                let mut mgr = IndexManager::open(dir.path()).unwrap();
                for id in 0..size as u32 {
                    mgr.insert_full(&raw_row(id)).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_point_query(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let mut mgr = IndexManager::open(dir.path()).unwrap();
    for id in 0..2000u32 {
        mgr.insert_full(&raw_row(id)).unwrap();
    }

    c.bench_function("search_by_id", |b| {
        b.iter(|| mgr.search_by_id(1000).unwrap());
    });

    c.bench_function("planner_and_predicate", |b| {
        let predicate = Predicate::And(
            Box::new(Predicate::Leaf(SimplePredicate::Cmp {
                attr: "city".into(),
                op: CmpOp::Eq,
                value: Literal::Text("Makati City".into()),
            })),
            Box::new(Predicate::Leaf(SimplePredicate::Cmp {
                attr: "restaurant_id".into(),
                op: CmpOp::Eq,
                value: Literal::Number(1000.0),
            })),
        );
        b.iter(|| {
            let mut planner = Planner::new(&mut mgr);
            planner.select(Some(&predicate), None, &catalogdb::query::ast::Columns::All)
        });
    });
}

criterion_group!(benches, bench_insert_full, bench_point_query);
criterion_main!(benches);
