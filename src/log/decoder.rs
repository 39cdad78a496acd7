// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Event decoding with CRC32 validation.

use crate::error::{CatalogError, CatalogResult};
use crate::log::types::CatalogEvent;
use crc32fast::Hasher;

const MAGIC: &str = "CTLG";

/// Decodes one line produced by [`crate::log::encoder::encode_event`],
/// validating magic bytes, recorded length, and CRC32 checksum.
pub fn decode_event(line: &str) -> CatalogResult<CatalogEvent> {
    let parts: Vec<&str> = line.splitn(8, '|').collect();
    if parts.len() != 8 {
        return Err(CatalogError::ParseError {
            reason: format!("expected 8 fields, got {}", parts.len()),
            position: 0,
        });
    }

    if parts[0] != MAGIC {
        return Err(CatalogError::CorruptPage {
            engine: "log".to_string(),
            offset: 0,
        });
    }

    let expected_length =
        u32::from_str_radix(parts[1], 16).map_err(|e| CatalogError::ParseError {
            reason: format!("invalid length field: {e}"),
            position: 0,
        })? as usize;
    if line.len() != expected_length {
        return Err(CatalogError::CorruptPage {
            engine: "log".to_string(),
            offset: expected_length as u64,
        });
    }

    let timestamp_nanos: u128 = parts[2].parse().map_err(|_| CatalogError::ParseError {
        reason: "invalid timestamp field".to_string(),
        position: 0,
    })?;
    let kind = parts[3].to_string();
    let engine = parts[4].to_string();
    let detail = parts[5].to_string();
    let ok: bool = parts[6].parse().map_err(|_| CatalogError::ParseError {
        reason: "invalid ok field".to_string(),
        position: 0,
    })?;
    let recorded_crc =
        u32::from_str_radix(parts[7], 16).map_err(|e| CatalogError::ParseError {
            reason: format!("invalid crc32 field: {e}"),
            position: 0,
        })?;

    let data = format!("{timestamp_nanos}|{kind}|{engine}|{detail}|{ok}");
    let mut hasher = Hasher::new();
    hasher.update(data.as_bytes());
    if hasher.finalize() != recorded_crc {
        return Err(CatalogError::CorruptPage {
            engine: "log".to_string(),
            offset: 0,
        });
    }

    Ok(CatalogEvent {
        timestamp_nanos,
        kind,
        engine,
        detail,
        ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::encoder::encode_event;

    #[test]
    fn round_trips_through_encode_decode() {
        let event = CatalogEvent::new("page_write", "BTREE", "offset=4096", true);
        let line = encode_event(&event).unwrap();
        let decoded = decode_event(&line).unwrap();
        assert_eq!(decoded.kind, "page_write");
        assert_eq!(decoded.engine, "BTREE");
        assert_eq!(decoded.detail, "offset=4096");
        assert!(decoded.ok);
    }

    #[test]
    fn rejects_corrupted_crc() {
        let event = CatalogEvent::new("fanout_step", "ISAM", "insert", true);
        let mut line = encode_event(&event).unwrap();
        line.pop();
        line.push('0');
        let err = decode_event(&line).unwrap_err();
        assert_eq!(err.kind(), "CorruptPage");
    }
}
