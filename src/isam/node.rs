// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! ISAM multi-level index nodes: fixed fanout F=64, bit-exact on-disk layout.

use crate::error::{CatalogError, CatalogResult};
use crate::record::{IsamKey, ISAM_KEY_SIZE};

/// Maximum children per node.
pub const FANOUT: usize = 64;

const MAX_KEYS: usize = FANOUT - 1;

/// `1 (is_leaf) + 4 (key_count) + 8 (p0) + 8 (next_sibling) + KEY_SIZE*(F-1) + 8*(F-1)`.
pub const NODE_SIZE: usize = 1 + 4 + 8 + 8 + ISAM_KEY_SIZE * MAX_KEYS + 8 * MAX_KEYS;

/// A node in the static multi-level ISAM index.
///
/// `p0` is the leftmost child pointer (keys-less-than `keys[0]`); `ptrs[i]`
/// is the child for keys in `[keys[i], keys[i+1])`. Leaves point at base
/// data-page offsets; internal nodes point at child-node offsets.
#[derive(Debug, Clone)]
pub struct IndexNode {
    pub is_leaf: bool,
    pub p0: i64,
    pub next_sibling: i64,
    pub keys: Vec<IsamKey>,
    pub ptrs: Vec<i64>,
}

impl IndexNode {
    pub fn new_leaf(p0: i64) -> Self {
        IndexNode {
            is_leaf: true,
            p0,
            next_sibling: -1,
            keys: Vec::new(),
            ptrs: Vec::new(),
        }
    }

    pub fn new_internal(p0: i64) -> Self {
        IndexNode {
            is_leaf: false,
            p0,
            next_sibling: -1,
            keys: Vec::new(),
            ptrs: Vec::new(),
        }
    }

    /// Index of the first key strictly greater than `key` (classic
    /// `upper_bound`). The child to descend into is `p0` when this is 0,
    /// else `ptrs[i-1]`.
    pub fn upper_bound(&self, key: &IsamKey) -> usize {
        self.keys.partition_point(|k| k <= key)
    }

    pub fn child_for(&self, key: &IsamKey) -> i64 {
        let i = self.upper_bound(key);
        if i == 0 {
            self.p0
        } else {
            self.ptrs[i - 1]
        }
    }

    pub fn push(&mut self, key: IsamKey, ptr: i64) -> CatalogResult<()> {
        if self.keys.len() >= MAX_KEYS {
            return Err(CatalogError::SchemaError {
                reason: "ISAM index node overflow".to_string(),
            });
        }
        self.keys.push(key);
        self.ptrs.push(ptr);
        Ok(())
    }

    pub fn to_bytes(&self) -> CatalogResult<[u8; NODE_SIZE]> {
        if self.keys.len() > MAX_KEYS {
            return Err(CatalogError::SchemaError {
                reason: "ISAM index node exceeds fanout".to_string(),
            });
        }
        let mut buf = [0u8; NODE_SIZE];
        let mut off = 0;
        buf[off] = self.is_leaf as u8;
        off += 1;
        buf[off..off + 4].copy_from_slice(&(self.keys.len() as i32).to_le_bytes());
        off += 4;
        buf[off..off + 8].copy_from_slice(&self.p0.to_le_bytes());
        off += 8;
        buf[off..off + 8].copy_from_slice(&self.next_sibling.to_le_bytes());
        off += 8;

        let keys_start = off;
        for (i, k) in self.keys.iter().enumerate() {
            let start = keys_start + i * ISAM_KEY_SIZE;
            buf[start..start + ISAM_KEY_SIZE].copy_from_slice(k.as_bytes());
        }
        let ptrs_start = keys_start + MAX_KEYS * ISAM_KEY_SIZE;
        for (i, p) in self.ptrs.iter().enumerate() {
            let start = ptrs_start + i * 8;
            buf[start..start + 8].copy_from_slice(&p.to_le_bytes());
        }
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> CatalogResult<Self> {
        if bytes.len() != NODE_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!("ISAM node must be {NODE_SIZE} bytes, got {}", bytes.len()),
            });
        }
        let mut off = 0;
        let is_leaf = bytes[off] != 0;
        off += 1;
        let key_count = i32::from_le_bytes(bytes[off..off + 4].try_into().unwrap()) as usize;
        off += 4;
        let p0 = i64::from_le_bytes(bytes[off..off + 8].try_into().unwrap());
        off += 8;
        let next_sibling = i64::from_le_bytes(bytes[off..off + 8].try_into().unwrap());
        off += 8;

        let keys_start = off;
        let mut keys = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let start = keys_start + i * ISAM_KEY_SIZE;
            let mut k = [0u8; ISAM_KEY_SIZE];
            k.copy_from_slice(&bytes[start..start + ISAM_KEY_SIZE]);
            keys.push(IsamKey(k));
        }
        let ptrs_start = keys_start + MAX_KEYS * ISAM_KEY_SIZE;
        let mut ptrs = Vec::with_capacity(key_count);
        for i in 0..key_count {
            let start = ptrs_start + i * 8;
            ptrs.push(i64::from_le_bytes(bytes[start..start + 8].try_into().unwrap()));
        }
        Ok(IndexNode {
            is_leaf,
            p0,
            next_sibling,
            keys,
            ptrs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::IsamKey;

    #[test]
    fn upper_bound_picks_correct_child() {
        let mut node = IndexNode::new_internal(0);
        node.push(IsamKey::new("m", "c", 1), 10).unwrap();
        node.push(IsamKey::new("z", "c", 1), 20).unwrap();
        assert_eq!(node.child_for(&IsamKey::new("a", "c", 1)), 0);
        assert_eq!(node.child_for(&IsamKey::new("n", "c", 1)), 10);
        assert_eq!(node.child_for(&IsamKey::new("zz", "c", 1)), 20);
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut node = IndexNode::new_leaf(5);
        node.push(IsamKey::new("a", "b", 1), 100).unwrap();
        let bytes = node.to_bytes().unwrap();
        let back = IndexNode::from_bytes(&bytes).unwrap();
        assert_eq!(back.is_leaf, true);
        assert_eq!(back.p0, 5);
        assert_eq!(back.keys.len(), 1);
        assert_eq!(back.ptrs[0], 100);
    }

    #[test]
    fn overflow_is_rejected() {
        let mut node = IndexNode::new_leaf(0);
        for i in 0..MAX_KEYS {
            node.push(IsamKey::new(&format!("k{i}"), "c", i as u32), i as i64).unwrap();
        }
        assert!(node.push(IsamKey::new("overflow", "c", 9999), 0).is_err());
    }
}
