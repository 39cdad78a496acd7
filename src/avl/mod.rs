// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Persistent AVL tree keyed on `restaurant_id`, doubling as the scannable
//! row store for numeric non-id predicates (§4.4, §9 "AVL as a heap with a
//! tree").

pub mod node;
pub mod payload;

use crate::error::CatalogResult;
use crate::paged_file::PagedFile;
use crate::record::Record;
use node::{height_of, AvlNode, NODE_SIZE, NIL};
use payload::PayloadHeap;
use std::path::{Path, PathBuf};

pub struct AvlIndex {
    nodes: PagedFile,
    payload: PayloadHeap,
    root: i32,
    meta_path: PathBuf,
}

impl AvlIndex {
    pub fn open(dir: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(dir)?;
        let nodes = PagedFile::open(dir.join("avl_nodes.bin"), NODE_SIZE)?;
        let payload = PayloadHeap::open(&dir.join("avl_payload.bin"))?;
        let meta_path = dir.join("avl.meta");
        let root = match std::fs::read(&meta_path) {
            Ok(bytes) if bytes.len() == 4 => i32::from_le_bytes(bytes.try_into().unwrap()),
            _ => NIL,
        };
        Ok(AvlIndex {
            nodes,
            payload,
            root,
            meta_path,
        })
    }

    pub fn build(dir: &Path, records: Vec<Record>) -> CatalogResult<Self> {
        let _ = std::fs::remove_file(dir.join("avl_nodes.bin"));
        let _ = std::fs::remove_file(dir.join("avl_payload.bin"));
        let _ = std::fs::remove_file(dir.join("avl.meta"));
        let mut engine = Self::open(dir)?;
        for rec in records {
            engine.insert(rec)?;
        }
        Ok(engine)
    }

    fn save_root(&self) -> CatalogResult<()> {
        std::fs::write(&self.meta_path, self.root.to_le_bytes())?;
        Ok(())
    }

    fn read_node(&self, pos: i32) -> CatalogResult<AvlNode> {
        AvlNode::from_bytes(&self.nodes.read_page(pos as u64)?)
    }

    fn write_node(&mut self, pos: i32, node: &AvlNode) -> CatalogResult<()> {
        self.nodes.write_page(pos as u64, &node.to_bytes())
    }

    fn append_node(&mut self, node: &AvlNode) -> CatalogResult<i32> {
        Ok(self.nodes.append_page(&node.to_bytes())? as i32)
    }

    fn height(&self, pos: i32) -> CatalogResult<i32> {
        if pos == NIL {
            return Ok(0);
        }
        Ok(height_of(Some(self.read_node(pos)?.height)))
    }

    fn balance_factor(&self, pos: i32) -> CatalogResult<i32> {
        if pos == NIL {
            return Ok(0);
        }
        let node = self.read_node(pos)?;
        Ok(self.height(node.left)? - self.height(node.right)?)
    }

    fn recompute_height(&mut self, pos: i32) -> CatalogResult<()> {
        let mut node = self.read_node(pos)?;
        node.height = 1 + self.height(node.left)?.max(self.height(node.right)?);
        self.write_node(pos, &node)
    }

    fn rotate_right(&mut self, pos: i32) -> CatalogResult<i32> {
        let mut node = self.read_node(pos)?;
        let new_root_pos = node.left;
        let mut new_root = self.read_node(new_root_pos)?;
        node.left = new_root.right;
        new_root.right = pos;
        self.write_node(pos, &node)?;
        self.write_node(new_root_pos, &new_root)?;
        self.recompute_height(pos)?;
        self.recompute_height(new_root_pos)?;
        Ok(new_root_pos)
    }

    fn rotate_left(&mut self, pos: i32) -> CatalogResult<i32> {
        let mut node = self.read_node(pos)?;
        let new_root_pos = node.right;
        let mut new_root = self.read_node(new_root_pos)?;
        node.right = new_root.left;
        new_root.left = pos;
        self.write_node(pos, &node)?;
        self.write_node(new_root_pos, &new_root)?;
        self.recompute_height(pos)?;
        self.recompute_height(new_root_pos)?;
        Ok(new_root_pos)
    }

    fn rebalance(&mut self, pos: i32) -> CatalogResult<i32> {
        self.recompute_height(pos)?;
        let balance = self.balance_factor(pos)?;
        if balance > 1 {
            let node = self.read_node(pos)?;
            if self.balance_factor(node.left)? < 0 {
                let new_left = self.rotate_left(node.left)?;
                let mut node = self.read_node(pos)?;
                node.left = new_left;
                self.write_node(pos, &node)?;
            }
            return self.rotate_right(pos);
        }
        if balance < -1 {
            let node = self.read_node(pos)?;
            if self.balance_factor(node.right)? > 0 {
                let new_right = self.rotate_right(node.right)?;
                let mut node = self.read_node(pos)?;
                node.right = new_right;
                self.write_node(pos, &node)?;
            }
            return self.rotate_left(pos);
        }
        Ok(pos)
    }

    /// Inserts (or, on a duplicate id, overwrites the payload of) `record`.
    pub fn insert(&mut self, record: Record) -> CatalogResult<()> {
        let id = record.restaurant_id as i32;
        let data_off = self.payload.append(&record)?;
        self.root = self.insert_rec(self.root, id, data_off)?;
        self.save_root()
    }

    fn insert_rec(&mut self, pos: i32, id: i32, data_off: i64) -> CatalogResult<i32> {
        if pos == NIL {
            let node = AvlNode::leaf(id, data_off);
            return self.append_node(&node);
        }
        let mut node = self.read_node(pos)?;
        if id < node.id {
            node.left = self.insert_rec(node.left, id, data_off)?;
            self.write_node(pos, &node)?;
        } else if id > node.id {
            node.right = self.insert_rec(node.right, id, data_off)?;
            self.write_node(pos, &node)?;
        } else {
            node.data_off = data_off;
            self.write_node(pos, &node)?;
            return Ok(pos);
        }
        self.rebalance(pos)
    }

    pub fn search_by_id(&mut self, id: u32) -> CatalogResult<Option<Record>> {
        let mut pos = self.root;
        let target = id as i32;
        while pos != NIL {
            let node = self.read_node(pos)?;
            if target == node.id {
                return Ok(Some(self.payload.read_at(node.data_off)?));
            }
            pos = if target < node.id { node.left } else { node.right };
        }
        Ok(None)
    }

    /// Standard BST delete by successor substitution, rebalancing on the
    /// way back up (§4.4). Returns whether a node was removed.
    pub fn delete(&mut self, id: u32) -> CatalogResult<bool> {
        let target = id as i32;
        let (new_root, removed) = self.delete_rec(self.root, target)?;
        self.root = new_root;
        self.save_root()?;
        Ok(removed)
    }

    fn delete_rec(&mut self, pos: i32, id: i32) -> CatalogResult<(i32, bool)> {
        if pos == NIL {
            return Ok((NIL, false));
        }
        let mut node = self.read_node(pos)?;
        let removed;
        if id < node.id {
            let (new_left, r) = self.delete_rec(node.left, id)?;
            node.left = new_left;
            removed = r;
            self.write_node(pos, &node)?;
        } else if id > node.id {
            let (new_right, r) = self.delete_rec(node.right, id)?;
            node.right = new_right;
            removed = r;
            self.write_node(pos, &node)?;
        } else {
            removed = true;
            if node.left == NIL {
                return Ok((node.right, true));
            }
            if node.right == NIL {
                return Ok((node.left, true));
            }
            // Two children: replace with the in-order successor (leftmost
            // of the right subtree), then delete that successor.
            let succ_pos = self.leftmost(node.right)?;
            let succ = self.read_node(succ_pos)?;
            node.id = succ.id;
            node.data_off = succ.data_off;
            let (new_right, _) = self.delete_rec(node.right, succ.id)?;
            node.right = new_right;
            self.write_node(pos, &node)?;
        }
        Ok((self.rebalance(pos)?, removed))
    }

    fn leftmost(&self, mut pos: i32) -> CatalogResult<i32> {
        loop {
            let node = self.read_node(pos)?;
            if node.left == NIL {
                return Ok(pos);
            }
            pos = node.left;
        }
    }

    /// Full in-order traversal filtered by a numeric attribute and
    /// comparison operator (`=`, `>`, `<`, `>=`, `<=`).
    pub fn search_comparison(&mut self, attr: &str, op: &str, value: f64) -> CatalogResult<Vec<Record>> {
        let mut out = Vec::new();
        self.in_order(self.root, &mut |rec| {
            if let Some(v) = rec.numeric_attr(attr) {
                let hit = match op {
                    "=" => (v - value).abs() < f64::EPSILON,
                    ">" => v > value,
                    "<" => v < value,
                    ">=" => v >= value,
                    "<=" => v <= value,
                    _ => false,
                };
                if hit {
                    out.push(rec);
                }
            }
        })?;
        Ok(out)
    }

    /// Full in-order traversal filtered by an inclusive numeric range.
    pub fn search_between(&mut self, attr: &str, lo: f64, hi: f64) -> CatalogResult<Vec<Record>> {
        let mut out = Vec::new();
        self.in_order(self.root, &mut |rec| {
            if let Some(v) = rec.numeric_attr(attr) {
                if v >= lo && v <= hi {
                    out.push(rec);
                }
            }
        })?;
        Ok(out)
    }

    /// Ascending-id in-order traversal, used by the invariant check and by
    /// `full_scan` consumers such as planner result assembly.
    pub fn full_scan(&mut self) -> CatalogResult<Vec<Record>> {
        let mut out = Vec::new();
        self.in_order(self.root, &mut |rec| out.push(rec))?;
        Ok(out)
    }

    fn in_order(&mut self, pos: i32, visit: &mut dyn FnMut(Record)) -> CatalogResult<()> {
        if pos == NIL {
            return Ok(());
        }
        let node = self.read_node(pos)?;
        self.in_order(node.left, visit)?;
        let rec = self.payload.read_at(node.data_off)?;
        visit(rec);
        self.in_order(node.right, visit)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rec(id: u32, rating: f64, votes: i32) -> Record {
        Record {
            restaurant_id: id,
            name: "n".into(),
            city: "c".into(),
            country_code: 1,
            address: "a".into(),
            cuisines: "x".into(),
            avg_cost_for_two: 100,
            currency: "USD".into(),
            has_table_booking: false,
            has_online_delivery: false,
            is_delivering_now: false,
            price_range: 1,
            aggregate_rating: rating,
            rating_text: "ok".into(),
            votes,
            longitude: 0.0,
            latitude: 0.0,
        }
    }

    #[test]
    fn in_order_ids_are_strictly_ascending() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = vec![5, 3, 8, 1, 4, 7, 9, 2, 6]
            .into_iter()
            .map(|i| rec(i, 4.0, 10))
            .collect();
        let mut idx = AvlIndex::build(dir.path(), records).unwrap();
        let scanned = idx.full_scan().unwrap();
        let ids: Vec<u32> = scanned.iter().map(|r| r.restaurant_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn search_by_id_finds_inserted_rows() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..30u32).map(|i| rec(i, 3.5, 5)).collect();
        let mut idx = AvlIndex::build(dir.path(), records).unwrap();
        for i in 0..30u32 {
            assert_eq!(idx.search_by_id(i).unwrap().unwrap().restaurant_id, i);
        }
        assert!(idx.search_by_id(999).unwrap().is_none());
    }

    #[test]
    fn comparison_and_between_filter_correctly() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..20u32).map(|i| rec(i, i as f64 / 4.0, i as i32 * 10)).collect();
        let mut idx = AvlIndex::build(dir.path(), records).unwrap();
        let high_rating = idx.search_comparison("aggregate_rating", ">", 4.0).unwrap();
        assert!(high_rating.iter().all(|r| r.aggregate_rating > 4.0));
        let between = idx.search_between("votes", 50.0, 100.0).unwrap();
        assert!(between.iter().all(|r| r.votes >= 50 && r.votes <= 100));
    }

    #[test]
    fn delete_then_reinsert_preserves_balance() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..50u32).map(|i| rec(i, 4.0, 1)).collect();
        let mut idx = AvlIndex::build(dir.path(), records).unwrap();
        for i in 0..25u32 {
            assert!(idx.delete(i).unwrap());
        }
        for i in 0..25u32 {
            idx.insert(rec(i, 4.0, 1)).unwrap();
        }
        for i in 0..50u32 {
            assert!(idx.search_by_id(i).unwrap().is_some());
        }
    }
}
