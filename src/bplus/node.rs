// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B+Tree node encoding: one serialised [`BPlusNode`] per 4 KiB page, tail
//! zero-padded (§4.5).

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};

pub const BLOCK_SIZE: usize = 4096;
pub const NIL: i64 = -1;

/// Default fanout (§4.5 picks a small order for readability over density).
pub const DEFAULT_ORDER: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BPlusNode {
    pub is_leaf: bool,
    pub keys: Vec<u32>,
    /// Leaf rows, one per key. Empty for internal nodes.
    pub values: Vec<Record>,
    /// Child page offsets, `keys.len() + 1` of them. Empty for leaves.
    pub children: Vec<i64>,
    /// Next leaf in ascending chain order, or `NIL`. Unused by internals.
    pub next_leaf: i64,
}

impl BPlusNode {
    pub fn new_leaf() -> Self {
        BPlusNode {
            is_leaf: true,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next_leaf: NIL,
        }
    }

    pub fn new_internal() -> Self {
        BPlusNode {
            is_leaf: false,
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
            next_leaf: NIL,
        }
    }

    pub fn to_bytes(&self) -> CatalogResult<[u8; BLOCK_SIZE]> {
        let encoded = bincode::serialize(self).map_err(|e| CatalogError::SchemaError {
            reason: format!("encoding B+Tree node: {e}"),
        })?;
        if encoded.len() + 4 > BLOCK_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!(
                    "B+Tree node serialised to {} bytes, exceeds page size {BLOCK_SIZE} \
                     (reduce order or split sooner)",
                    encoded.len()
                ),
            });
        }
        let mut buf = [0u8; BLOCK_SIZE];
        buf[0..4].copy_from_slice(&(encoded.len() as u32).to_le_bytes());
        buf[4..4 + encoded.len()].copy_from_slice(&encoded);
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> CatalogResult<Self> {
        if bytes.len() != BLOCK_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!("B+Tree page must be {BLOCK_SIZE} bytes, got {}", bytes.len()),
            });
        }
        let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        bincode::deserialize(&bytes[4..4 + len]).map_err(|e| CatalogError::SchemaError {
            reason: format!("decoding B+Tree node: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_round_trips_through_bytes() {
        let mut node = BPlusNode::new_leaf();
        node.keys.push(42);
        node.values.push(crate::record::Record {
            restaurant_id: 42,
            name: "n".into(),
            city: "c".into(),
            country_code: 1,
            address: "a".into(),
            cuisines: "x".into(),
            avg_cost_for_two: 1,
            currency: "USD".into(),
            has_table_booking: false,
            has_online_delivery: false,
            is_delivering_now: false,
            price_range: 1,
            aggregate_rating: 1.0,
            rating_text: "ok".into(),
            votes: 0,
            longitude: 0.0,
            latitude: 0.0,
        });
        node.next_leaf = 7;
        let bytes = node.to_bytes().unwrap();
        let back = BPlusNode::from_bytes(&bytes).unwrap();
        assert_eq!(back.keys, vec![42]);
        assert_eq!(back.next_leaf, 7);
    }
}
