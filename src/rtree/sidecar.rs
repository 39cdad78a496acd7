// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Sidecar mapping from surrogate point-id to the row it was inserted with,
//! plus the restaurant_id -> surrogate-id reverse index `add_point` needs to
//! detect and replace duplicates (§4.6).

use crate::error::{CatalogError, CatalogResult};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointEntry {
    pub x: f64,
    pub y: f64,
    pub record: Record,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sidecar {
    pub next_id: u64,
    pub points: HashMap<u64, PointEntry>,
    pub by_restaurant_id: HashMap<u32, u64>,
}

impl Sidecar {
    pub fn load(path: &Path) -> CatalogResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| CatalogError::SchemaError {
                reason: format!("corrupt R-Tree sidecar: {e}"),
            }),
            Err(_) => Ok(Sidecar::default()),
        }
    }

    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| CatalogError::SchemaError {
            reason: format!("encoding R-Tree sidecar: {e}"),
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}
