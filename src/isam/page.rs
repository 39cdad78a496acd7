// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! ISAM data pages: a header plus up to `BLOCK_FACTOR` packed records.

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;

/// Records per base/overflow page before it is considered full.
pub const BLOCK_FACTOR: usize = 8;

/// One data-record slot's on-disk capacity. A record is length-prefixed
/// bincode, zero-padded to this width; 512 bytes comfortably covers the
/// widest real row (longest strings are ≤96 bytes each).
const SLOT_SIZE: usize = 512;

/// Page header: `{count: i32, next_page: i64}`, little-endian.
const HEADER_SIZE: usize = 4 + 8;

/// Total on-disk page size: header plus eight record slots.
pub const PAGE_SIZE: usize = HEADER_SIZE + BLOCK_FACTOR * SLOT_SIZE;

/// An ISAM data page: a fixed-capacity bucket of records plus a link to the
/// next page in its overflow chain (0 meaning "no successor"; page offsets
/// are 1-based internally to keep 0 free as a sentinel).
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub records: Vec<Record>,
    pub next_page: i64,
}

impl Page {
    pub fn is_full(&self) -> bool {
        self.records.len() >= BLOCK_FACTOR
    }

    pub fn to_bytes(&self) -> CatalogResult<[u8; PAGE_SIZE]> {
        if self.records.len() > BLOCK_FACTOR {
            return Err(CatalogError::SchemaError {
                reason: format!("page holds {} records, max {}", self.records.len(), BLOCK_FACTOR),
            });
        }
        let mut buf = [0u8; PAGE_SIZE];
        buf[0..4].copy_from_slice(&(self.records.len() as i32).to_le_bytes());
        buf[4..12].copy_from_slice(&self.next_page.to_le_bytes());

        for (i, rec) in self.records.iter().enumerate() {
            let encoded = bincode::serialize(rec).map_err(|e| CatalogError::SchemaError {
                reason: format!("encoding record: {e}"),
            })?;
            if encoded.len() + 2 > SLOT_SIZE {
                return Err(CatalogError::SchemaError {
                    reason: "record too large for ISAM slot".to_string(),
                });
            }
            let slot_start = HEADER_SIZE + i * SLOT_SIZE;
            let len = encoded.len() as u16;
            buf[slot_start..slot_start + 2].copy_from_slice(&len.to_le_bytes());
            buf[slot_start + 2..slot_start + 2 + encoded.len()].copy_from_slice(&encoded);
        }
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> CatalogResult<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!("page must be {PAGE_SIZE} bytes, got {}", bytes.len()),
            });
        }
        let count = i32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        let next_page = i64::from_le_bytes(bytes[4..12].try_into().unwrap());

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let slot_start = HEADER_SIZE + i * SLOT_SIZE;
            let len = u16::from_le_bytes(bytes[slot_start..slot_start + 2].try_into().unwrap()) as usize;
            let rec_bytes = &bytes[slot_start + 2..slot_start + 2 + len];
            let rec: Record = bincode::deserialize(rec_bytes).map_err(|e| CatalogError::SchemaError {
                reason: format!("decoding record: {e}"),
            })?;
            records.push(rec);
        }
        Ok(Page { records, next_page })
    }
}
