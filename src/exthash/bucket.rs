// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Extendible-hashing buckets: an append-only `<u32 id, u32 size, bytes>` file.

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Bucket {
    pub local_depth: u32,
    pub items: HashMap<u32, Record>,
}

impl Bucket {
    pub fn new(local_depth: u32) -> Self {
        Bucket {
            local_depth,
            items: HashMap::new(),
        }
    }

    pub fn is_full(&self, capacity: usize) -> bool {
        self.items.len() >= capacity
    }
}

/// Append-only bucket store. `read_at(id, offset)` trusts the caller's
/// directory-supplied offset (the latest write for that id); it never scans.
pub struct BucketFile {
    file: File,
}

impl BucketFile {
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(BucketFile { file })
    }

    /// Appends a new record for `bucket_id` and returns its byte offset.
    pub fn append(&mut self, bucket_id: u32, bucket: &Bucket) -> CatalogResult<u64> {
        let encoded = bincode::serialize(bucket).map_err(|e| CatalogError::SchemaError {
            reason: format!("encoding bucket: {e}"),
        })?;
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&bucket_id.to_le_bytes())?;
        self.file.write_all(&(encoded.len() as u32).to_le_bytes())?;
        self.file.write_all(&encoded)?;
        Ok(offset)
    }

    pub fn read_at(&mut self, offset: u64) -> CatalogResult<Bucket> {
        self.file.seek(SeekFrom::Start(offset))?;
        let mut id_size = [0u8; 8];
        self.file.read_exact(&mut id_size)?;
        let size = u32::from_le_bytes(id_size[4..8].try_into().unwrap()) as usize;
        let mut payload = vec![0u8; size];
        self.file.read_exact(&mut payload)?;
        bincode::deserialize(&payload).map_err(|e| CatalogError::SchemaError {
            reason: format!("decoding bucket: {e}"),
        })
    }
}
