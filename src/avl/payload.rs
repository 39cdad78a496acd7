// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Payload heap backing the AVL tree: an append-only file of packed records.

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub struct PayloadHeap {
    file: File,
}

impl PayloadHeap {
    pub fn open(path: &Path) -> CatalogResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(PayloadHeap { file })
    }

    /// Appends a record to the heap and returns its byte offset.
    pub fn append(&mut self, record: &Record) -> CatalogResult<i64> {
        let encoded = bincode::serialize(record).map_err(|e| CatalogError::SchemaError {
            reason: format!("encoding AVL payload: {e}"),
        })?;
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&(encoded.len() as u32).to_le_bytes())?;
        self.file.write_all(&encoded)?;
        Ok(offset as i64)
    }

    pub fn read_at(&mut self, offset: i64) -> CatalogResult<Record> {
        self.file.seek(SeekFrom::Start(offset as u64))?;
        let mut len_bytes = [0u8; 4];
        self.file.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let mut payload = vec![0u8; len];
        self.file.read_exact(&mut payload)?;
        bincode::deserialize(&payload).map_err(|e| CatalogError::SchemaError {
            reason: format!("decoding AVL payload: {e}"),
        })
    }
}
