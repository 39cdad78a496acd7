// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Output formatters for query results.

use catalogdb::query::planner::QueryResult;

/// Formats result as human-readable table.
pub fn format_table(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "0 rows\n".to_string();
    }

    let mut columns: Vec<String> = result.rows[0].keys().cloned().collect();
    columns.sort();

    let mut widths: std::collections::HashMap<String, usize> =
        columns.iter().map(|c| (c.clone(), c.len())).collect();
    for row in &result.rows {
        for col in &columns {
            if let Some(value) = row.get(col) {
                let current = widths.get(col).copied().unwrap_or(0);
                widths.insert(col.clone(), current.max(value.len()));
            }
        }
    }

    let mut output = String::new();
    let border = || -> String {
        let mut b = String::from("+");
        for col in &columns {
            b.push_str(&"-".repeat(widths.get(col).copied().unwrap_or(0) + 2));
            b.push('+');
        }
        b.push('\n');
        b
    };

    output.push_str(&border());
    output.push('|');
    for col in &columns {
        let width = widths.get(col).copied().unwrap_or(0);
        output.push_str(&format!(" {:<width$} |", col, width = width));
    }
    output.push('\n');
    output.push_str(&border());

    for row in &result.rows {
        output.push('|');
        for col in &columns {
            let width = widths.get(col).copied().unwrap_or(0);
            let value = row.get(col).map(|s| s.as_str()).unwrap_or("");
            output.push_str(&format!(" {:<width$} |", value, width = width));
        }
        output.push('\n');
    }
    output.push_str(&border());
    output.push_str(&format!("{} rows ({})\n", result.rows.len(), result.status));
    output
}

/// Formats result as JSON.
pub fn format_json(result: &QueryResult) -> String {
    if result.rows.is_empty() {
        return "[]\n".to_string();
    }
    let mut output = String::from("[\n");
    for (i, row) in result.rows.iter().enumerate() {
        output.push_str("  {");
        let mut keys: Vec<_> = row.keys().collect();
        keys.sort();
        for (j, key) in keys.iter().enumerate() {
            let value = row.get(*key).map(|s| s.as_str()).unwrap_or("");
            let escaped_value = value.replace('"', "\\\"");
            output.push_str(&format!("\"{}\": \"{}\"", key, escaped_value));
            if j < keys.len() - 1 {
                output.push_str(", ");
            }
        }
        output.push('}');
        if i < result.rows.len() - 1 {
            output.push(',');
        }
        output.push('\n');
    }
    output.push_str("]\n");
    output
}

/// Formats result as CSV.
pub fn format_csv(result: &QueryResult, include_header: bool) -> String {
    if result.rows.is_empty() {
        return String::new();
    }
    let mut columns: Vec<String> = result.rows[0].keys().cloned().collect();
    columns.sort();

    let mut output = String::new();
    if include_header {
        output.push_str(&columns.join(","));
        output.push('\n');
    }
    for row in &result.rows {
        let values: Vec<String> = columns
            .iter()
            .map(|col| {
                let val = row.get(col).map(|s| s.as_str()).unwrap_or("");
                if val.contains(',') || val.contains('"') {
                    format!("\"{}\"", val.replace('"', "\"\""))
                } else {
                    val.to_string()
                }
            })
            .collect();
        output.push_str(&values.join(","));
        output.push('\n');
    }
    output
}
