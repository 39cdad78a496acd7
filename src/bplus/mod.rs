// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Disk-resident B+Tree keyed on `restaurant_id`, linked leaves, no
//! rebalance on delete (§4.5).

pub mod node;

use crate::error::CatalogResult;
use crate::paged_file::PagedFile;
use crate::record::Record;
use node::{BPlusNode, BLOCK_SIZE, DEFAULT_ORDER, NIL};
use std::path::{Path, PathBuf};

pub struct BPlusIndex {
    pages: PagedFile,
    root: i64,
    order: usize,
    meta_path: PathBuf,
}

impl BPlusIndex {
    pub fn open(dir: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(dir)?;
        let pages = PagedFile::open(dir.join("bplus.bin"), BLOCK_SIZE)?;
        let meta_path = dir.join("bplus.meta");
        let root = match std::fs::read(&meta_path) {
            Ok(bytes) if bytes.len() == 8 => i64::from_le_bytes(bytes.try_into().unwrap()),
            _ => NIL,
        };
        Ok(BPlusIndex {
            pages,
            root,
            order: DEFAULT_ORDER,
            meta_path,
        })
    }

    pub fn build(dir: &Path, records: Vec<Record>) -> CatalogResult<Self> {
        let _ = std::fs::remove_file(dir.join("bplus.bin"));
        let _ = std::fs::remove_file(dir.join("bplus.meta"));
        let mut engine = Self::open(dir)?;
        for rec in records {
            engine.insert(rec.restaurant_id, rec)?;
        }
        Ok(engine)
    }

    fn save_root(&self) -> CatalogResult<()> {
        std::fs::write(&self.meta_path, self.root.to_le_bytes())?;
        Ok(())
    }

    fn read_node(&self, pos: i64) -> CatalogResult<BPlusNode> {
        BPlusNode::from_bytes(&self.pages.read_page(pos as u64)?)
    }

    fn write_node(&mut self, pos: i64, node: &BPlusNode) -> CatalogResult<()> {
        self.pages.write_page(pos as u64, &node.to_bytes()?)
    }

    fn append_node(&mut self, node: &BPlusNode) -> CatalogResult<i64> {
        Ok(self.pages.append_page(&node.to_bytes()?)? as i64)
    }

    fn child_index(keys: &[u32], key: u32) -> usize {
        keys.partition_point(|&k| k <= key)
    }

    /// Inserts or, on a duplicate key, overwrites the row for `key`.
    pub fn insert(&mut self, key: u32, record: Record) -> CatalogResult<()> {
        if self.root == NIL {
            let mut leaf = BPlusNode::new_leaf();
            leaf.keys.push(key);
            leaf.values.push(record);
            self.root = self.append_node(&leaf)?;
            return self.save_root();
        }
        if let Some((promoted, right_pos)) = self.insert_rec(self.root, key, record)? {
            let mut new_root = BPlusNode::new_internal();
            new_root.keys.push(promoted);
            new_root.children.push(self.root);
            new_root.children.push(right_pos);
            self.root = self.append_node(&new_root)?;
        }
        self.save_root()
    }

    fn insert_rec(&mut self, pos: i64, key: u32, record: Record) -> CatalogResult<Option<(u32, i64)>> {
        let mut node = self.read_node(pos)?;
        if node.is_leaf {
            let idx = node.keys.partition_point(|&k| k < key);
            if idx < node.keys.len() && node.keys[idx] == key {
                node.values[idx] = record;
                self.write_node(pos, &node)?;
                return Ok(None);
            }
            node.keys.insert(idx, key);
            node.values.insert(idx, record);
            if node.keys.len() <= self.order {
                self.write_node(pos, &node)?;
                return Ok(None);
            }
            let split_at = node.keys.len() / 2;
            let mut right = BPlusNode::new_leaf();
            right.keys = node.keys.split_off(split_at);
            right.values = node.values.split_off(split_at);
            right.next_leaf = node.next_leaf;
            let right_pos = self.append_node(&right)?;
            node.next_leaf = right_pos;
            self.write_node(pos, &node)?;
            let promoted = right.keys[0];
            return Ok(Some((promoted, right_pos)));
        }

        let child_idx = Self::child_index(&node.keys, key);
        let child_pos = node.children[child_idx];
        match self.insert_rec(child_pos, key, record)? {
            None => Ok(None),
            Some((promoted, right_pos)) => {
                node.keys.insert(child_idx, promoted);
                node.children.insert(child_idx + 1, right_pos);
                if node.keys.len() <= self.order {
                    self.write_node(pos, &node)?;
                    return Ok(None);
                }
                let mid = node.keys.len() / 2;
                let up = node.keys[mid];
                let right_keys = node.keys.split_off(mid + 1);
                node.keys.pop();
                let right_children = node.children.split_off(mid + 1);
                let mut right = BPlusNode::new_internal();
                right.keys = right_keys;
                right.children = right_children;
                let right_pos = self.append_node(&right)?;
                self.write_node(pos, &node)?;
                Ok(Some((up, right_pos)))
            }
        }
    }

    fn descend_to_leaf(&self, key: u32) -> CatalogResult<Option<i64>> {
        if self.root == NIL {
            return Ok(None);
        }
        let mut pos = self.root;
        loop {
            let node = self.read_node(pos)?;
            if node.is_leaf {
                return Ok(Some(pos));
            }
            let idx = Self::child_index(&node.keys, key);
            pos = node.children[idx];
        }
    }

    pub fn search(&self, key: u32) -> CatalogResult<Option<Record>> {
        let leaf_pos = match self.descend_to_leaf(key)? {
            Some(p) => p,
            None => return Ok(None),
        };
        let node = self.read_node(leaf_pos)?;
        match node.keys.iter().position(|&k| k == key) {
            Some(i) => Ok(Some(node.values[i].clone())),
            None => Ok(None),
        }
    }

    /// Ascending-key range scan via the leaf chain, inclusive of both ends.
    pub fn range(&self, lo: u32, hi: u32) -> CatalogResult<Vec<Record>> {
        let mut out = Vec::new();
        let mut pos = match self.descend_to_leaf(lo)? {
            Some(p) => p,
            None => return Ok(out),
        };
        'chain: loop {
            let node = self.read_node(pos)?;
            for (k, v) in node.keys.iter().zip(node.values.iter()) {
                if *k > hi {
                    break 'chain;
                }
                if *k >= lo {
                    out.push(v.clone());
                }
            }
            if node.next_leaf == NIL {
                break;
            }
            pos = node.next_leaf;
        }
        Ok(out)
    }

    /// Removes `key`'s entry. No rebalance: under-occupied leaves are
    /// tolerated and compacted only by a full rebuild (§4.5, §9).
    pub fn delete(&mut self, key: u32) -> CatalogResult<bool> {
        let leaf_pos = match self.descend_to_leaf(key)? {
            Some(p) => p,
            None => return Ok(false),
        };
        let mut node = self.read_node(leaf_pos)?;
        match node.keys.iter().position(|&k| k == key) {
            Some(i) => {
                node.keys.remove(i);
                node.values.remove(i);
                self.write_node(leaf_pos, &node)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rec(id: u32) -> Record {
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
            aggregate_rating: 1.0,
            rating_text: "ok".into(),
            votes: 0,
            longitude: 0.0,
            latitude: 0.0,
        }
    }

    #[test]
    fn search_finds_every_inserted_key_after_many_splits() {
        let dir = tempdir().unwrap();
        let mut idx = BPlusIndex::open(dir.path()).unwrap();
        for i in 0..200u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        for i in 0..200u32 {
            assert_eq!(idx.search(i).unwrap().unwrap().restaurant_id, i);
        }
        assert!(idx.search(999).unwrap().is_none());
    }

    #[test]
    fn range_scan_is_ascending_and_bounded() {
        let dir = tempdir().unwrap();
        let mut idx = BPlusIndex::open(dir.path()).unwrap();
        for i in 0..100u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        let found = idx.range(40, 60).unwrap();
        let ids: Vec<u32> = found.iter().map(|r| r.restaurant_id).collect();
        assert_eq!(ids, (40..=60).collect::<Vec<u32>>());
    }

    #[test]
    fn delete_removes_without_breaking_remaining_lookups() {
        let dir = tempdir().unwrap();
        let mut idx = BPlusIndex::open(dir.path()).unwrap();
        for i in 0..50u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        assert!(idx.delete(25).unwrap());
        assert!(idx.search(25).unwrap().is_none());
        assert!(!idx.delete(25).unwrap());
        for i in (0..50u32).filter(|&i| i != 25) {
            assert!(idx.search(i).unwrap().is_some());
        }
    }

    #[test]
    fn reopen_preserves_root_and_data() {
        let dir = tempdir().unwrap();
        {
            let mut idx = BPlusIndex::open(dir.path()).unwrap();
            for i in 0..30u32 {
                idx.insert(i, rec(i)).unwrap();
            }
        }
        let idx2 = BPlusIndex::open(dir.path()).unwrap();
        assert_eq!(idx2.search(15).unwrap().unwrap().restaurant_id, 15);
    }
}
