// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Append-only structured event log for index-engine operations (§10.4):
//! page reads/writes, fan-out steps, and the planner's per-predicate index
//! choice. Grounded on the teacher's `log::encoder`/`log::decoder`/
//! `log::validator` trio, repurposed from table version history to index
//! operations and stripped of the teacher's action/user dictionary
//! (`registry`) since this crate has no registry module to generalise from.

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::decode_event;
pub use encoder::encode_event;
pub use types::CatalogEvent;

use crate::error::{CatalogError, CatalogResult};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends one encoded event line to `path`, creating the file if absent.
/// Failures here are never allowed to abort the operation being logged;
/// callers should treat this as best-effort (see `IndexManager::log_event`).
pub fn append_event(path: &Path, event: &CatalogEvent) -> CatalogResult<()> {
    let line = encode_event(event)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CatalogError::IoError {
            operation: "event_log_open".to_string(),
            reason: e.to_string(),
        })?;
    writeln!(file, "{line}").map_err(|e| CatalogError::IoError {
        operation: "event_log_write".to_string(),
        reason: e.to_string(),
    })
}

/// Reads and decodes every event in `path`, skipping blank lines. Returns
/// an empty vector if the file doesn't exist yet (an unused log is valid).
pub fn read_events(path: &Path) -> CatalogResult<Vec<CatalogEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| CatalogError::IoError {
        operation: "event_log_read".to_string(),
        reason: e.to_string(),
    })?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(decode_event)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.log");
        append_event(&path, &CatalogEvent::new("fanout_step", "ISAM", "insert", true)).unwrap();
        append_event(&path, &CatalogEvent::new("fanout_step", "HASH", "insert", true)).unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].engine, "ISAM");
        assert_eq!(events[1].engine, "HASH");
    }

    #[test]
    fn reading_missing_file_is_empty_not_error() {
        let dir = tempdir().unwrap();
        let events = read_events(&dir.path().join("absent.log")).unwrap();
        assert!(events.is_empty());
    }
}
