// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Extendible-hashing directory: a textual sidecar record (§6.2).

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// `{global_depth, bucket_capacity, next_bucket_id, directory[], bucket_offsets{}}`,
/// persisted as JSON — a small textual record, not a page file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Directory {
    pub global_depth: u32,
    pub bucket_capacity: usize,
    pub next_bucket_id: u32,
    /// `directory[i]` is the bucket id governing hash-prefix `i`.
    pub directory: Vec<u32>,
    /// Most recently written byte offset of each bucket id in the buckets file.
    pub bucket_offsets: HashMap<u32, u64>,
}

impl Directory {
    pub fn new(bucket_capacity: usize) -> Self {
        Directory {
            global_depth: 1,
            bucket_capacity,
            next_bucket_id: 0,
            directory: vec![0, 0],
            bucket_offsets: HashMap::new(),
        }
    }

    pub fn index_for_hash(&self, hash: u64) -> usize {
        (hash & ((1u64 << self.global_depth) - 1)) as usize
    }

    pub fn bucket_id_for(&self, hash: u64) -> u32 {
        self.directory[self.index_for_hash(hash)]
    }

    pub fn double(&mut self) {
        let mut doubled = self.directory.clone();
        doubled.extend(self.directory.clone());
        self.directory = doubled;
        self.global_depth += 1;
    }

    pub fn allocate_bucket_id(&mut self) -> u32 {
        let id = self.next_bucket_id;
        self.next_bucket_id += 1;
        id
    }

    pub fn load(path: &Path) -> CatalogResult<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let dir: Directory = serde_json::from_str(&text).map_err(|e| CatalogError::SchemaError {
                    reason: format!("corrupt directory: {e}"),
                })?;
                Ok(Some(dir))
            }
            Err(_) => Ok(None),
        }
    }

    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| CatalogError::SchemaError {
            reason: format!("encoding directory: {e}"),
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Checks the invariant that every directory slot pointing at `bucket_id`
    /// agrees on the low `local_depth` bits of its own index.
    #[cfg(test)]
    pub fn consistent_with(&self, bucket_id: u32, local_depth: u32) -> bool {
        let mask = (1u64 << local_depth) - 1;
        let mut seen: Option<u64> = None;
        for (i, &id) in self.directory.iter().enumerate() {
            if id == bucket_id {
                let low_bits = i as u64 & mask;
                match seen {
                    None => seen = Some(low_bits),
                    Some(s) if s != low_bits => return false,
                    _ => {}
                }
            }
        }
        true
    }
}
