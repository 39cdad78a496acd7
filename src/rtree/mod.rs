// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Disk-resident R-Tree of 2-D points, quadratic-split insertion, bbox +
//! haversine range queries and k-NN (§4.6).
//!
//! The on-disk layout is the same paged, CRC32-checked, bincode-encoded
//! discipline [`crate::bplus`] and [`crate::isam`] use for their node
//! files; [`sidecar`] carries the `surrogate_id -> (coords, payload)` map
//! a native spatial-index library would otherwise keep alongside its
//! `.data`/`.index` pair.

pub mod sidecar;
pub mod types;

use crate::error::CatalogResult;
use crate::paged_file::PagedFile;
use crate::record::Record;
use sidecar::Sidecar;
use std::path::{Path, PathBuf};
use types::{decode_page, encode_page, haversine_km, radius_bbox, BBox, ChildRef, LeafEntry, Node, PAGE_SIZE};

const NIL: i64 = -1;

pub struct RTreeIndex {
    pages: PagedFile,
    root: i64,
    sidecar: Sidecar,
    sidecar_path: PathBuf,
    meta_path: PathBuf,
    dir: PathBuf,
}

impl RTreeIndex {
    /// Opens (or creates empty) the `.data`/`.index`-equivalent pair: a
    /// single paged node file plus the sidecar metadata file.
    pub fn open(dir: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(dir)?;
        let pages = PagedFile::open(dir.join("rtree.data"), PAGE_SIZE)?;
        let sidecar_path = dir.join("rtree.meta");
        let sidecar = Sidecar::load(&sidecar_path)?;
        let meta_path = dir.join("rtree.index");
        let root = match std::fs::read(&meta_path) {
            Ok(bytes) if bytes.len() == 8 => i64::from_le_bytes(bytes.try_into().unwrap()),
            _ => NIL,
        };
        Ok(RTreeIndex {
            pages,
            root,
            sidecar,
            sidecar_path,
            meta_path,
            dir: dir.to_path_buf(),
        })
    }

    pub fn build(dir: &Path, records: Vec<(f64, f64, Record)>) -> CatalogResult<Self> {
        let _ = std::fs::remove_file(dir.join("rtree.data"));
        let _ = std::fs::remove_file(dir.join("rtree.index"));
        let _ = std::fs::remove_file(dir.join("rtree.meta"));
        let mut engine = Self::open(dir)?;
        for (x, y, rec) in records {
            engine.add_point(x, y, rec)?;
        }
        Ok(engine)
    }

    fn save_root(&self) -> CatalogResult<()> {
        std::fs::write(&self.meta_path, self.root.to_le_bytes())?;
        Ok(())
    }

    fn read_node(&self, pos: i64) -> CatalogResult<Node> {
        decode_page(&self.pages.read_page(pos as u64)?, "rtree", pos as u64)
    }

    fn write_node(&mut self, pos: i64, node: &Node) -> CatalogResult<()> {
        self.pages.write_page(pos as u64, &encode_page(node)?)
    }

    fn append_node(&mut self, node: &Node) -> CatalogResult<i64> {
        Ok(self.pages.append_page(&encode_page(node)?)? as i64)
    }

    /// Inserts `(x, y)` with `payload`; if `payload`'s `restaurant_id`
    /// already has an entry, that entry is removed first (§4.6).
    pub fn add_point(&mut self, x: f64, y: f64, payload: Record) -> CatalogResult<u64> {
        let restaurant_id = payload.restaurant_id;
        if self.sidecar.by_restaurant_id.contains_key(&restaurant_id) {
            self.remove_point_by_id(restaurant_id)?;
        }

        let id = self.sidecar.allocate_id();
        let bbox = BBox::point(x, y);

        if self.root == NIL {
            let leaf = Node::Leaf {
                entries: vec![LeafEntry { bbox, id }],
            };
            self.root = self.append_node(&leaf)?;
        } else {
            let (split_left, split_right) = self.insert_rec(self.root, bbox, id)?;
            if let Some(right) = split_right {
                let left_bbox = self.read_node(split_left)?.compute_bbox();
                let right_bbox = self.read_node(right)?.compute_bbox();
                let new_root = Node::Internal {
                    children: vec![
                        ChildRef { bbox: left_bbox, page: split_left },
                        ChildRef { bbox: right_bbox, page: right },
                    ],
                };
                self.root = self.append_node(&new_root)?;
            } else {
                self.root = split_left;
            }
        }
        self.save_root()?;

        self.sidecar.points.insert(
            id,
            sidecar::PointEntry {
                x,
                y,
                record: payload,
            },
        );
        self.sidecar.by_restaurant_id.insert(restaurant_id, id);
        self.sidecar.save(&self.sidecar_path)?;
        Ok(id)
    }

    /// Returns `(new_or_same_pos, Some(new_sibling_pos))` when `pos` split.
    fn insert_rec(&mut self, pos: i64, bbox: BBox, id: u64) -> CatalogResult<(i64, Option<i64>)> {
        let mut node = self.read_node(pos)?;
        match &mut node {
            Node::Leaf { entries } => {
                entries.push(LeafEntry { bbox, id });
                if entries.len() <= types::MAX_ENTRIES {
                    self.write_node(pos, &node)?;
                    Ok((pos, None))
                } else {
                    let (left, right) = quadratic_split_leaf(entries.clone());
                    self.write_node(pos, &Node::Leaf { entries: left })?;
                    let right_pos = self.append_node(&Node::Leaf { entries: right })?;
                    Ok((pos, Some(right_pos)))
                }
            }
            Node::Internal { children } => {
                let best = least_enlargement_child(children, &bbox);
                let child_pos = children[best].page;
                let (new_child, split) = self.insert_rec(child_pos, bbox, id)?;
                children[best].bbox = self.read_node(new_child)?.compute_bbox();
                children[best].page = new_child;
                if let Some(new_sibling) = split {
                    let sibling_bbox = self.read_node(new_sibling)?.compute_bbox();
                    children.push(ChildRef { bbox: sibling_bbox, page: new_sibling });
                }
                if children.len() <= types::MAX_ENTRIES {
                    self.write_node(pos, &node)?;
                    Ok((pos, None))
                } else {
                    let (left, right) = quadratic_split_internal(children.clone());
                    self.write_node(pos, &Node::Internal { children: left })?;
                    let right_pos = self.append_node(&Node::Internal { children: right })?;
                    Ok((pos, Some(right_pos)))
                }
            }
        }
    }

    /// Haversine range query: intersects the lat/lon bounding box built
    /// from `dlat = r/111`, `dlon = r/(111*max(cos(lat),1e-9))` against the
    /// tree, then filters by true great-circle distance and sorts
    /// ascending by distance (§4.6).
    pub fn range_search_km(&self, x: f64, y: f64, radius_km: f64) -> CatalogResult<Vec<(f64, Record)>> {
        let bbox = radius_bbox(x, y, radius_km);
        let mut candidates = Vec::new();
        self.collect_intersecting(self.root, &bbox, &mut candidates)?;

        let mut out = Vec::new();
        for id in candidates {
            if let Some(entry) = self.sidecar.points.get(&id) {
                let d = haversine_km(x, y, entry.x, entry.y);
                if d <= radius_km {
                    out.push((d, entry.record.clone()));
                }
            }
        }
        out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        Ok(out)
    }

    fn collect_intersecting(&self, pos: i64, bbox: &BBox, out: &mut Vec<u64>) -> CatalogResult<()> {
        if pos == NIL {
            return Ok(());
        }
        match self.read_node(pos)? {
            Node::Leaf { entries } => {
                for e in entries {
                    if e.bbox.intersects(bbox) {
                        out.push(e.id);
                    }
                }
            }
            Node::Internal { children } => {
                for c in children {
                    if c.bbox.intersects(bbox) {
                        self.collect_intersecting(c.page, bbox, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Nearest-`k` by Euclidean distance in raw coordinates. The tree gives
    /// no pruning benefit over a full scan here since candidate count is
    /// bounded by the catalog size; a full sidecar scan keeps the k-NN path
    /// simple and correct.
    pub fn knn(&self, x: f64, y: f64, k: usize) -> CatalogResult<Vec<(f64, Record)>> {
        let mut all: Vec<(f64, Record)> = self
            .sidecar
            .points
            .values()
            .map(|e| {
                let d = ((e.x - x).powi(2) + (e.y - y).powi(2)).sqrt();
                (d, e.record.clone())
            })
            .collect();
        all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        all.truncate(k);
        Ok(all)
    }

    /// Removes every entry whose payload carries `restaurant_id`. The tree
    /// itself is not compacted (matching B+Tree/ISAM's no-rebalance-on-
    /// delete stance) — only the sidecar and leaf entries are pruned.
    pub fn remove_point_by_id(&mut self, restaurant_id: u32) -> CatalogResult<bool> {
        let id = match self.sidecar.by_restaurant_id.remove(&restaurant_id) {
            Some(id) => id,
            None => return Ok(false),
        };
        self.sidecar.points.remove(&id);
        if self.root != NIL {
            self.remove_from_tree(self.root, id)?;
        }
        self.sidecar.save(&self.sidecar_path)?;
        Ok(true)
    }

    fn remove_from_tree(&mut self, pos: i64, id: u64) -> CatalogResult<()> {
        let mut node = self.read_node(pos)?;
        match &mut node {
            Node::Leaf { entries } => {
                if entries.iter().any(|e| e.id == id) {
                    entries.retain(|e| e.id != id);
                    self.write_node(pos, &node)?;
                }
            }
            Node::Internal { children } => {
                let targets: Vec<i64> = children.iter().map(|c| c.page).collect();
                for child_pos in targets {
                    self.remove_from_tree(child_pos, id)?;
                }
                for c in children.iter_mut() {
                    c.bbox = self.read_node(c.page)?.compute_bbox();
                }
                self.write_node(pos, &node)?;
            }
        }
        Ok(())
    }

    /// Flushes pending writes and releases the handle. Idempotent and safe
    /// to call before deleting files ahead of a rebuild (§9 RTree file
    /// locking note) — this implementation holds no exclusive OS lock, but
    /// callers follow the same close-before-rebuild discipline a native
    /// spatial-index binding would require.
    pub fn close(&self) -> CatalogResult<()> {
        self.pages.flush()
    }

    /// Number of points currently indexed.
    pub fn len(&self) -> usize {
        self.sidecar.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sidecar.points.is_empty()
    }

    pub fn rebuild_from_data(&mut self) -> CatalogResult<()> {
        let records: Vec<(f64, f64, Record)> = self
            .sidecar
            .points
            .values()
            .map(|e| (e.x, e.y, e.record.clone()))
            .collect();
        self.close()?;
        let rebuilt = Self::build(&self.dir, records)?;
        *self = rebuilt;
        Ok(())
    }
}

fn least_enlargement_child(children: &[ChildRef], bbox: &BBox) -> usize {
    children
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.bbox
                .enlargement(bbox)
                .partial_cmp(&b.bbox.enlargement(bbox))
                .unwrap()
        })
        .map(|(i, _)| i)
        .unwrap()
}

/// Classic quadratic-cost split: pick the pair with the largest wasted
/// area as seeds, then assign remaining entries to whichever seed group
/// enlarges least.
fn quadratic_split_leaf(entries: Vec<LeafEntry>) -> (Vec<LeafEntry>, Vec<LeafEntry>) {
    let (seed_a, seed_b) = pick_seeds(entries.iter().map(|e| e.bbox).collect());
    let mut group_a = vec![entries[seed_a].clone()];
    let mut group_b = vec![entries[seed_b].clone()];
    let mut bbox_a = entries[seed_a].bbox;
    let mut bbox_b = entries[seed_b].bbox;

    for (i, e) in entries.into_iter().enumerate() {
        if i == seed_a || i == seed_b {
            continue;
        }
        if group_a.len() + 1 >= types::MIN_ENTRIES && group_b.len() < types::MIN_ENTRIES {
            bbox_b.expand(&e.bbox);
            group_b.push(e);
            continue;
        }
        if bbox_a.enlargement(&e.bbox) <= bbox_b.enlargement(&e.bbox) {
            bbox_a.expand(&e.bbox);
            group_a.push(e);
        } else {
            bbox_b.expand(&e.bbox);
            group_b.push(e);
        }
    }
    (group_a, group_b)
}

fn quadratic_split_internal(children: Vec<ChildRef>) -> (Vec<ChildRef>, Vec<ChildRef>) {
    let (seed_a, seed_b) = pick_seeds(children.iter().map(|c| c.bbox).collect());
    let mut group_a = vec![children[seed_a].clone()];
    let mut group_b = vec![children[seed_b].clone()];
    let mut bbox_a = children[seed_a].bbox;
    let mut bbox_b = children[seed_b].bbox;

    for (i, c) in children.into_iter().enumerate() {
        if i == seed_a || i == seed_b {
            continue;
        }
        if group_a.len() + 1 >= types::MIN_ENTRIES && group_b.len() < types::MIN_ENTRIES {
            bbox_b.expand(&c.bbox);
            group_b.push(c);
            continue;
        }
        if bbox_a.enlargement(&c.bbox) <= bbox_b.enlargement(&c.bbox) {
            bbox_a.expand(&c.bbox);
            group_a.push(c);
        } else {
            bbox_b.expand(&c.bbox);
            group_b.push(c);
        }
    }
    (group_a, group_b)
}

fn pick_seeds(boxes: Vec<BBox>) -> (usize, usize) {
    let mut best = (0usize, 1usize);
    let mut worst_waste = f64::NEG_INFINITY;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let merged = boxes[i].merge(&boxes[j]);
            let waste = merged.area() - boxes[i].area() - boxes[j].area();
            if waste > worst_waste {
                worst_waste = waste;
                best = (i, j);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rec(id: u32, lon: f64, lat: f64) -> Record {
        Record {
            restaurant_id: id,
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
            aggregate_rating: 4.0,
            rating_text: "ok".into(),
            votes: 0,
            longitude: lon,
            latitude: lat,
        }
    }

    #[test]
    fn range_search_finds_nearby_and_excludes_far_points() {
        let dir = tempdir().unwrap();
        let mut idx = RTreeIndex::open(dir.path()).unwrap();
        idx.add_point(121.0275, 14.56, rec(1, 121.0275, 14.56)).unwrap();
        idx.add_point(121.03, 14.565, rec(2, 121.03, 14.565)).unwrap();
        idx.add_point(0.0, 0.0, rec(3, 0.0, 0.0)).unwrap();

        let hits = idx.range_search_km(121.0275, 14.56, 3.0).unwrap();
        let ids: Vec<u32> = hits.iter().map(|(_, r)| r.restaurant_id).collect();
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));
        assert!(!ids.contains(&3));
        assert!(hits.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn duplicate_restaurant_id_replaces_prior_point() {
        let dir = tempdir().unwrap();
        let mut idx = RTreeIndex::open(dir.path()).unwrap();
        idx.add_point(1.0, 1.0, rec(7, 1.0, 1.0)).unwrap();
        idx.add_point(5.0, 5.0, rec(7, 5.0, 5.0)).unwrap();
        assert_eq!(idx.sidecar.by_restaurant_id.len(), 1);
        let hits = idx.range_search_km(5.0, 5.0, 1.0).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn remove_by_id_drops_point_from_both_tree_and_sidecar() {
        let dir = tempdir().unwrap();
        let mut idx = RTreeIndex::open(dir.path()).unwrap();
        idx.add_point(1.0, 1.0, rec(3, 1.0, 1.0)).unwrap();
        assert!(idx.remove_point_by_id(3).unwrap());
        assert!(!idx.remove_point_by_id(3).unwrap());
        let hits = idx.range_search_km(1.0, 1.0, 5.0).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn knn_returns_k_closest_by_euclidean_distance() {
        let dir = tempdir().unwrap();
        let mut idx = RTreeIndex::open(dir.path()).unwrap();
        for i in 0..10u32 {
            idx.add_point(i as f64, 0.0, rec(i, i as f64, 0.0)).unwrap();
        }
        let nearest = idx.knn(0.0, 0.0, 3).unwrap();
        assert_eq!(nearest.len(), 3);
        let ids: Vec<u32> = nearest.iter().map(|(_, r)| r.restaurant_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn build_then_insert_many_keeps_tree_queryable() {
        let dir = tempdir().unwrap();
        let records: Vec<(f64, f64, Record)> = (0..60u32)
            .map(|i| (i as f64 * 0.1, i as f64 * 0.1, rec(i, i as f64 * 0.1, i as f64 * 0.1)))
            .collect();
        let idx = RTreeIndex::build(dir.path(), records).unwrap();
        let hits = idx.range_search_km(0.0, 0.0, 50000.0).unwrap();
        assert_eq!(hits.len(), 60);
    }
}
