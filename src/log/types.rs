// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Type definitions for the index-operation event log.

/// A single recorded event: a page read/write, a fan-out step across the
/// five engines, or the planner's choice of index for a leaf predicate
/// (§10.4). Distinct from `metrics`, which aggregates counters for
/// dashboards — this log is a per-event append-only trail.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEvent {
    /// Nanoseconds since `UNIX_EPOCH`.
    pub timestamp_nanos: u128,

    /// Event category: `"fanout_step"`, `"plan_selected"`, `"page_read"`,
    /// or `"page_write"`.
    pub kind: String,

    /// Engine the event concerns (`"ISAM"`, `"HASH"`, `"AVL"`, `"BTREE"`,
    /// `"RTREE"`), or `"-"` when not engine-specific.
    pub engine: String,

    /// Free-form detail (operation name, predicate attribute, page
    /// offset, ...). Pipe characters are stripped on encode since `|` is
    /// the field separator.
    pub detail: String,

    /// Whether the step succeeded.
    pub ok: bool,
}

impl CatalogEvent {
    pub fn new(kind: impl Into<String>, engine: impl Into<String>, detail: impl Into<String>, ok: bool) -> Self {
        CatalogEvent {
            timestamp_nanos: now_nanos(),
            kind: kind.into(),
            engine: engine.into(),
            detail: detail.into(),
            ok,
        }
    }
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}
