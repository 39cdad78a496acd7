// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Stats command implementation: dumps process-local metrics counters.

use anyhow::Result;
use catalogdb::metrics::MetricsCollector;
use std::path::Path;

pub fn execute(_base: &Path, format: &str) -> Result<()> {
    let snapshot = MetricsCollector::global().snapshot();

    if format == "json" {
        println!("{{");
        println!("  \"metric_count\": {}", snapshot.len());
        println!("}}");
        return Ok(());
    }

    println!("catalogdb metrics:");
    if snapshot.is_empty() {
        println!("  (none recorded this session)");
    }
    for metric in snapshot {
        println!("  {} = {} {:?}", metric.name, metric.value, metric.unit);
    }
    Ok(())
}
