// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size AVL node records: `<i32 id, i32 left, i32 right, i32 height, i64 data_off>`.

use crate::error::{CatalogError, CatalogResult};

pub const NODE_SIZE: usize = 4 + 4 + 4 + 4 + 8;

pub const NIL: i32 = -1;

#[derive(Debug, Clone, Copy)]
pub struct AvlNode {
    pub id: i32,
    pub left: i32,
    pub right: i32,
    pub height: i32,
    pub data_off: i64,
}

impl AvlNode {
    pub fn leaf(id: i32, data_off: i64) -> Self {
        AvlNode {
            id,
            left: NIL,
            right: NIL,
            height: 1,
            data_off,
        }
    }

    pub fn to_bytes(&self) -> [u8; NODE_SIZE] {
        let mut buf = [0u8; NODE_SIZE];
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.left.to_le_bytes());
        buf[8..12].copy_from_slice(&self.right.to_le_bytes());
        buf[12..16].copy_from_slice(&self.height.to_le_bytes());
        buf[16..24].copy_from_slice(&self.data_off.to_le_bytes());
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> CatalogResult<Self> {
        if bytes.len() != NODE_SIZE {
            return Err(CatalogError::SchemaError {
                reason: format!("AVL node must be {NODE_SIZE} bytes, got {}", bytes.len()),
            });
        }
        Ok(AvlNode {
            id: i32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            left: i32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            right: i32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            height: i32::from_le_bytes(bytes[12..16].try_into().unwrap()),
            data_off: i64::from_le_bytes(bytes[16..24].try_into().unwrap()),
        })
    }
}

pub fn height_of(h: Option<i32>) -> i32 {
    h.unwrap_or(0)
}
