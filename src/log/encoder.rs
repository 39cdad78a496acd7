// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Event encoding with CRC32 validation, following the magic/length/CRC
//! envelope the teacher's version-history log uses for its entries.

use crate::error::CatalogResult;
use crate::log::types::CatalogEvent;
use crc32fast::Hasher;

const MAGIC: &str = "CTLG";

/// Encodes an event to a single log line:
/// `CTLG|{length:08X}|{timestamp_nanos}|{kind}|{engine}|{detail}|{ok}|{crc32:08X}`
pub fn encode_event(event: &CatalogEvent) -> CatalogResult<String> {
    let detail = event.detail.replace('|', " ");
    let data = format!(
        "{}|{}|{}|{}|{}",
        event.timestamp_nanos, event.kind, event.engine, detail, event.ok
    );

    let mut hasher = Hasher::new();
    hasher.update(data.as_bytes());
    let crc32 = hasher.finalize();

    let length_placeholder = "00000000";
    let probe = format!("{}|{}|{}|{:08X}", MAGIC, length_placeholder, data, crc32);
    let length = probe.len();

    Ok(format!("{}|{:08X}|{}|{:08X}", MAGIC, length, data, crc32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_stable_magic_prefix() {
        let event = CatalogEvent::new("plan_selected", "ISAM", "city=Makati City", true);
        let line = encode_event(&event).unwrap();
        assert!(line.starts_with("CTLG|"));
        assert_eq!(line.len(), line.split('|').nth(1).and_then(|h| u32::from_str_radix(h, 16).ok()).unwrap() as usize);
    }

    #[test]
    fn strips_pipes_from_detail() {
        let event = CatalogEvent::new("fanout_step", "HASH", "a|b|c", false);
        let line = encode_event(&event).unwrap();
        assert!(line.contains("a b c"));
    }
}
