// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! CSV ingestion: reads the header-named dataset of §6.3 into [`Record`]s.
//!
//! CSV tokenising itself is an external collaborator's concern (§1); this
//! module is the thin seam between a `csv::Reader` and
//! [`Record::from_raw_fields`], in the spirit of `prataprc-rdms`'s use of
//! the `csv` crate for its own bulk-load paths rather than a hand-rolled
//! splitter.

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;
use std::collections::HashMap;
use std::path::Path;

/// Reads every row of `path` into a `Record`, in file order. The first row
/// must be a header naming the exact columns Record expects (§6.3); a
/// malformed row is a `SchemaError`, not a panic.
pub fn load_records(path: &Path) -> CatalogResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| CatalogError::IoError {
            operation: "csv_open".to_string(),
            reason: e.to_string(),
        })?;

    let headers = reader
        .headers()
        .map_err(|e| CatalogError::SchemaError {
            reason: format!("reading CSV header: {e}"),
        })?
        .clone();

    let mut records = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let row = result.map_err(|e| CatalogError::SchemaError {
            reason: format!("row {row_num}: {e}"),
        })?;
        let raw: HashMap<String, String> = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        records.push(Record::from_raw_fields(&raw)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_a_well_formed_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "Restaurant ID,Restaurant Name,City,Country Code,Address,Cuisines,Average Cost for two,Currency,Has Table booking,Has Online delivery,Is delivering now,Price range,Aggregate rating,Rating text,Votes,Longitude,Latitude"
        )
        .unwrap();
        writeln!(
            file,
            "6317637,Le Petit Souffle,Makati City,162,Some Address,\"French, Japanese\",1100,Botswana Pula(P),Yes,No,No,3,4.8,Excellent,314,121.027535,14.565443"
        )
        .unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].restaurant_id, 6317637);
        assert_eq!(records[0].cuisines, "French, Japanese");
    }

    #[test]
    fn malformed_row_is_a_schema_error_not_a_panic() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Restaurant ID,Restaurant Name,City").unwrap();
        writeln!(file, "not-a-number,A,B").unwrap();
        let err = load_records(file.path()).unwrap_err();
        assert_eq!(err.kind(), "SchemaError");
    }
}
