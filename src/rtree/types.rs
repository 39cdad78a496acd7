// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Node and bounding-box types for the on-disk point R-Tree (§4.6).

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: usize = 4096;
pub const MAX_ENTRIES: usize = 8;
pub const MIN_ENTRIES: usize = 3;
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn point(x: f64, y: f64) -> Self {
        BBox {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    pub fn empty() -> Self {
        BBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn area(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0) * (self.max_y - self.min_y).max(0.0)
    }

    pub fn merge(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn expand(&mut self, other: &BBox) {
        *self = self.merge(other);
    }

    pub fn enlargement(&self, other: &BBox) -> f64 {
        self.merge(other).area() - self.area()
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y)
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafEntry {
    pub bbox: BBox,
    pub id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildRef {
    pub bbox: BBox,
    pub page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    Leaf { entries: Vec<LeafEntry> },
    Internal { children: Vec<ChildRef> },
}

impl Node {
    pub fn compute_bbox(&self) -> BBox {
        let mut bbox = BBox::empty();
        match self {
            Node::Leaf { entries } => entries.iter().for_each(|e| bbox.expand(&e.bbox)),
            Node::Internal { children } => children.iter().for_each(|c| bbox.expand(&c.bbox)),
        }
        bbox
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { entries } => entries.len(),
            Node::Internal { children } => children.len(),
        }
    }
}

/// CRC32-checked, length-prefixed, zero-padded page encoding, the same
/// discipline the B+Tree's node file uses (§10.9).
pub fn encode_page(node: &Node) -> CatalogResult<[u8; PAGE_SIZE]> {
    let encoded = bincode::serialize(node).map_err(|e| CatalogError::SchemaError {
        reason: format!("encoding R-Tree node: {e}"),
    })?;
    if encoded.len() + 8 > PAGE_SIZE {
        return Err(CatalogError::SchemaError {
            reason: format!("R-Tree node serialised to {} bytes, exceeds page size {PAGE_SIZE}", encoded.len()),
        });
    }
    let checksum = crc32fast::hash(&encoded);
    let mut buf = [0u8; PAGE_SIZE];
    buf[0..4].copy_from_slice(&(encoded.len() as u32).to_le_bytes());
    buf[4..8].copy_from_slice(&checksum.to_le_bytes());
    buf[8..8 + encoded.len()].copy_from_slice(&encoded);
    Ok(buf)
}

pub fn decode_page(bytes: &[u8], engine: &str, offset: u64) -> CatalogResult<Node> {
    if bytes.len() != PAGE_SIZE {
        return Err(CatalogError::SchemaError {
            reason: format!("R-Tree page must be {PAGE_SIZE} bytes, got {}", bytes.len()),
        });
    }
    let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let checksum = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
    let payload = &bytes[8..8 + len];
    if crc32fast::hash(payload) != checksum {
        return Err(CatalogError::CorruptPage {
            engine: engine.to_string(),
            offset,
        });
    }
    bincode::deserialize(payload).map_err(|e| CatalogError::SchemaError {
        reason: format!("decoding R-Tree node: {e}"),
    })
}

/// Great-circle distance in kilometres between two (lon, lat) points.
pub fn haversine_km(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let (lat1, lat2) = (y1.to_radians(), y2.to_radians());
    let dlat = (y2 - y1).to_radians();
    let dlon = (x2 - x1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Bounding box covering every point within `radius_km` of `(x, y)`, per the
/// `dlat = r/111`, `dlon = r/(111·max(cos(lat), 1e-9))` approximation (§4.6).
pub fn radius_bbox(x: f64, y: f64, radius_km: f64) -> BBox {
    let dlat = radius_km / 111.0;
    let dlon = radius_km / (111.0 * y.to_radians().cos().max(1e-9));
    BBox {
        min_x: x - dlon,
        min_y: y - dlat,
        max_x: x + dlon,
        max_y: y + dlat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_round_trips_and_detects_corruption() {
        let node = Node::Leaf {
            entries: vec![LeafEntry {
                bbox: BBox::point(1.0, 2.0),
                id: 9,
            }],
        };
        let mut bytes = encode_page(&node).unwrap();
        let back = decode_page(&bytes, "rtree", 0).unwrap();
        assert_eq!(back.len(), 1);
        bytes[8] ^= 0xFF;
        assert!(decode_page(&bytes, "rtree", 0).is_err());
    }

    #[test]
    fn haversine_of_identical_points_is_zero() {
        assert_eq!(haversine_km(12.0, 55.0, 12.0, 55.0), 0.0);
    }
}
