// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Static multi-level ISAM index with overflow-chain growth.
//!
//! See [`node`] for the index-node layout and [`page`] for the data-page
//! layout. [`IsamIndex`] ties the two paged files together and implements
//! build/search/range/insert/delete/rebuild per the static-ISAM contract:
//! inserts never restructure the index, only `rebuild_from_data` does.

pub mod node;
pub mod page;

use crate::error::{CatalogError, CatalogResult};
use crate::record::{normalize, IsamKey, Record};
use node::{IndexNode, FANOUT, NODE_SIZE};
use page::{Page, BLOCK_FACTOR, PAGE_SIZE};
use crate::paged_file::PagedFile;
use std::path::{Path, PathBuf};

enum Slot {
    P0,
    Ptr(usize),
}

/// One step of a root-to-leaf descent: the node we read and which slot of
/// it we followed. Kept so inserts can patch a leaf's first-key entry
/// in place without a second descent.
struct DescentStep {
    node_offset: i64,
    slot: Slot,
}

pub struct IsamIndex {
    data: PagedFile,
    index: PagedFile,
    root: i64,
    base_page_count: u64,
    meta_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
struct Meta {
    root: i64,
    base_page_count: u64,
}

impl IsamIndex {
    /// Opens (or creates empty) the two files backing this engine under
    /// `dir`: `isam_data.bin` and `isam_index.bin`, plus an `isam.meta`
    /// sidecar holding the root node offset and base-page count.
    pub fn open(dir: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(dir)?;
        let data = PagedFile::open(dir.join("isam_data.bin"), PAGE_SIZE)?;
        let index = PagedFile::open(dir.join("isam_index.bin"), NODE_SIZE)?;
        let meta_path = dir.join("isam.meta");
        let meta = Self::load_meta(&meta_path)?;
        Ok(IsamIndex {
            data,
            index,
            root: meta.root,
            base_page_count: meta.base_page_count,
            meta_path,
        })
    }

    fn load_meta(path: &Path) -> CatalogResult<Meta> {
        match std::fs::read(path) {
            Ok(bytes) if bytes.len() == 16 => Ok(Meta {
                root: i64::from_le_bytes(bytes[0..8].try_into().unwrap()),
                base_page_count: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
            }),
            _ => Ok(Meta {
                root: -1,
                base_page_count: 0,
            }),
        }
    }

    fn save_meta(&self) -> CatalogResult<()> {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&self.root.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.base_page_count.to_le_bytes());
        std::fs::write(&self.meta_path, bytes)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root == -1
    }

    // ---- build -----------------------------------------------------

    /// Bulk-builds the index from a full, already-collected record set.
    /// Resets both files: any prior content is discarded.
    pub fn build(dir: &Path, mut records: Vec<Record>) -> CatalogResult<Self> {
        let _ = std::fs::remove_file(dir.join("isam_data.bin"));
        let _ = std::fs::remove_file(dir.join("isam_index.bin"));
        let _ = std::fs::remove_file(dir.join("isam.meta"));
        let mut engine = Self::open(dir)?;

        records.sort_by_key(|r| r.isam_key());

        if records.is_empty() {
            engine.root = -1;
            engine.base_page_count = 0;
            engine.save_meta()?;
            return Ok(engine);
        }

        // Step 2+3: pack base pages, collect (first_key, page_offset).
        let mut entries: Vec<(IsamKey, i64)> = Vec::new();
        for chunk in records.chunks(BLOCK_FACTOR) {
            let first_key = chunk[0].isam_key();
            let page = Page {
                records: chunk.to_vec(),
                next_page: -1,
            };
            let offset = engine.data.append_page(&page.to_bytes()?)? as i64;
            entries.push((first_key, offset));
        }
        engine.base_page_count = entries.len() as u64;

        // Step 4: leaf level.
        let mut level: Vec<(IsamKey, i64)> = Vec::new();
        for chunk in entries.chunks(FANOUT) {
            let mut node = IndexNode::new_leaf(chunk[0].1);
            for (key, ptr) in &chunk[1..] {
                node.push(*key, *ptr)?;
            }
            let offset = engine.index.append_page(&node.to_bytes()?)? as i64;
            level.push((chunk[0].0, offset));
        }

        // Step 5: repeatedly build parent levels until one node remains.
        while level.len() > 1 {
            let mut next_level = Vec::new();
            for chunk in level.chunks(FANOUT) {
                let mut node = IndexNode::new_internal(chunk[0].1);
                for (key, ptr) in &chunk[1..] {
                    node.push(*key, *ptr)?;
                }
                let offset = engine.index.append_page(&node.to_bytes()?)? as i64;
                next_level.push((chunk[0].0, offset));
            }
            level = next_level;
        }

        engine.root = level[0].1;
        engine.save_meta()?;
        Ok(engine)
    }

    /// Rebuilds the multi-level index from the live records currently
    /// reachable through base pages and their overflow chains, compacting
    /// overflow and restoring tight occupancy. The correctness-recovery
    /// path after long insert/delete streams (§9 static-index limitation).
    pub fn rebuild_from_data(&mut self, dir: &Path) -> CatalogResult<()> {
        let records = self.full_scan()?;
        let rebuilt = Self::build(dir, records)?;
        *self = rebuilt;
        Ok(())
    }

    /// Walks every base page and its overflow chain, collecting all live
    /// records in ascending base-page order (not globally sorted across
    /// chains, since chain insert order isn't key order — callers that need
    /// strict ordering should sort the result).
    pub fn full_scan(&self) -> CatalogResult<Vec<Record>> {
        let mut out = Vec::new();
        for base in 0..self.base_page_count {
            let mut page_offset = base as i64;
            loop {
                let page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;
                out.extend(page.records);
                if page.next_page < 0 {
                    break;
                }
                page_offset = page.next_page;
            }
        }
        Ok(out)
    }

    // ---- descent -----------------------------------------------------

    fn descend(&self, key: &IsamKey) -> CatalogResult<(i64, Vec<DescentStep>)> {
        if self.root == -1 {
            return Err(CatalogError::NotFound {
                what: "isam index is empty".to_string(),
            });
        }
        let mut path = Vec::new();
        let mut offset = self.root;
        loop {
            let node = IndexNode::from_bytes(&self.index.read_page(offset as u64)?)?;
            let i = node.upper_bound(key);
            let slot = if i == 0 { Slot::P0 } else { Slot::Ptr(i - 1) };
            let child = node.child_for(key);
            path.push(DescentStep {
                node_offset: offset,
                slot,
            });
            if node.is_leaf {
                return Ok((child, path));
            }
            offset = child;
        }
    }

    // ---- search --------------------------------------------------------

    /// Exact `(name, city, id?)` lookup. When `id` is absent the page
    /// containing the (name,city) prefix is located with a sentinel key,
    /// then scanned for the first matching row; failing that, a tolerant
    /// full scan by normalised prefix runs as a last resort (§4.2).
    pub fn search(&self, name: &str, city: &str, id: Option<u32>) -> CatalogResult<Option<Record>> {
        if self.root == -1 {
            return Ok(None);
        }
        let key = match id {
            Some(id) => IsamKey::new(name, city, id),
            None => IsamKey::with_sentinel_id(name, city),
        };
        let (page_offset, _) = self.descend(&key)?;
        if let Some(found) = self.scan_chain_for(page_offset, name, city, id)? {
            return Ok(Some(found));
        }
        if id.is_none() {
            return self.tolerant_scan(name, city);
        }
        Ok(None)
    }

    fn scan_chain_for(
        &self,
        mut page_offset: i64,
        name: &str,
        city: &str,
        id: Option<u32>,
    ) -> CatalogResult<Option<Record>> {
        let norm_name = normalize(name);
        let norm_city = normalize(city);
        loop {
            let page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;
            for rec in &page.records {
                let matches_id = id.map(|i| i == rec.restaurant_id).unwrap_or(true);
                if matches_id && normalize(&rec.name) == norm_name && normalize(&rec.city) == norm_city {
                    return Ok(Some(rec.clone()));
                }
            }
            if page.next_page < 0 {
                return Ok(None);
            }
            page_offset = page.next_page;
        }
    }

    fn tolerant_scan(&self, name: &str, city: &str) -> CatalogResult<Option<Record>> {
        let norm_name = normalize(name);
        let norm_city = normalize(city);
        for base in 0..self.base_page_count {
            let mut page_offset = base as i64;
            loop {
                let page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;
                for rec in &page.records {
                    if normalize(&rec.name) == norm_name && normalize(&rec.city) == norm_city {
                        return Ok(Some(rec.clone()));
                    }
                }
                if page.next_page < 0 {
                    break;
                }
                page_offset = page.next_page;
            }
        }
        Ok(None)
    }

    /// Sequential scan filtered by a normalised textual attribute, used for
    /// `search_text` (`=` exact or `LIKE` with `%` wildcards).
    pub fn search_text(&self, attr: &str, value: &str, like: bool) -> CatalogResult<Vec<Record>> {
        let needle = normalize(value);
        let mut out = Vec::new();
        for base in 0..self.base_page_count {
            let mut page_offset = base as i64;
            loop {
                let page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;
                for rec in &page.records {
                    if let Some(v) = rec.text_attr(attr) {
                        let hay = normalize(v);
                        let hit = if like { like_match(&hay, &needle) } else { hay == needle };
                        if hit {
                            out.push(rec.clone());
                        }
                    }
                }
                if page.next_page < 0 {
                    break;
                }
                page_offset = page.next_page;
            }
        }
        Ok(out)
    }

    /// Range scan `[begin_key, end_key]` walking base pages in file order
    /// (by page index, which coincides with build order — overflow pages
    /// appended later are only reachable through a chain, never by
    /// incrementing the page index), stopping once a key exceeds `end_key`.
    pub fn range(&self, begin_key: &IsamKey, end_key: &IsamKey) -> CatalogResult<Vec<Record>> {
        if self.root == -1 {
            return Ok(Vec::new());
        }
        let (start_page, _) = self.descend(begin_key)?;
        let mut out = Vec::new();
        let mut base = start_page as u64;
        'outer: while base < self.base_page_count {
            let mut page_offset = base as i64;
            loop {
                let page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;
                for rec in &page.records {
                    let k = rec.isam_key();
                    if k < *begin_key {
                        continue;
                    }
                    if k > *end_key {
                        break 'outer;
                    }
                    out.push(rec.clone());
                }
                if page.next_page < 0 {
                    break;
                }
                page_offset = page.next_page;
            }
            base += 1;
        }
        out.sort_by_key(|r| r.isam_key());
        Ok(out)
    }

    // ---- insert / delete ------------------------------------------------

    /// Inserts a record. A duplicate `(name, city, id)` overwrites in place
    /// (§4.2 failure note); otherwise the record lands in the target base
    /// page if there's room, else the tail of its overflow chain, else a
    /// freshly allocated overflow page is linked on. The static index
    /// itself is never restructured.
    pub fn insert(&mut self, record: Record) -> CatalogResult<()> {
        let key = record.isam_key();
        if self.root == -1 {
            // First record ever: build a minimal one-page, one-leaf index.
            let page = Page {
                records: vec![record],
                next_page: -1,
            };
            let offset = self.data.append_page(&page.to_bytes()?)?;
            let leaf = IndexNode::new_leaf(offset as i64);
            let node_offset = self.index.append_page(&leaf.to_bytes()?)?;
            self.root = node_offset as i64;
            self.base_page_count = 1;
            self.save_meta()?;
            return Ok(());
        }

        let (mut page_offset, path) = self.descend(&key)?;
        let mut page = Page::from_bytes(&self.data.read_page(page_offset as u64)?)?;

        // Overwrite-in-place on exact (name,city,id) duplicate anywhere in
        // the chain starting here.
        let mut chain_offset = page_offset;
        loop {
            let mut chain_page = Page::from_bytes(&self.data.read_page(chain_offset as u64)?)?;
            if let Some(slot) = chain_page
                .records
                .iter()
                .position(|r| r.restaurant_id == record.restaurant_id && r.isam_key() == key)
            {
                chain_page.records[slot] = record;
                self.data.write_page(chain_offset as u64, &chain_page.to_bytes()?)?;
                return Ok(());
            }
            if chain_page.next_page < 0 {
                break;
            }
            chain_offset = chain_page.next_page;
        }

        if !page.is_full() {
            let old_first = page.records.first().map(|r| r.isam_key());
            page.records.push(record);
            page.records.sort_by_key(|r| r.isam_key());
            self.data.write_page(page_offset as u64, &page.to_bytes()?)?;
            let new_first = page.records.first().map(|r| r.isam_key());
            if old_first != new_first {
                self.patch_leaf_key(&path, new_first.unwrap())?;
            }
            return Ok(());
        }

        // Walk the overflow chain for room, else append a new overflow page.
        loop {
            if page.next_page < 0 {
                let mut new_page = Page {
                    records: vec![record],
                    next_page: -1,
                };
                let new_offset = self.data.append_page(&new_page.to_bytes()?)?;
                new_page.next_page = -1;
                page.next_page = new_offset as i64;
                self.data.write_page(page_offset as u64, &page.to_bytes()?)?;
                return Ok(());
            }
            let next_offset = page.next_page;
            let mut next_page = Page::from_bytes(&self.data.read_page(next_offset as u64)?)?;
            if !next_page.is_full() {
                next_page.records.push(record);
                next_page.records.sort_by_key(|r| r.isam_key());
                self.data.write_page(next_offset as u64, &next_page.to_bytes()?)?;
                return Ok(());
            }
            page_offset = next_offset;
            page = next_page;
        }
    }

    fn patch_leaf_key(&mut self, path: &[DescentStep], new_key: IsamKey) -> CatalogResult<()> {
        if let Some(leaf_step) = path.last() {
            if let Slot::Ptr(i) = leaf_step.slot {
                let mut node = IndexNode::from_bytes(&self.index.read_page(leaf_step.node_offset as u64)?)?;
                node.keys[i] = new_key;
                self.index.write_page(leaf_step.node_offset as u64, &node.to_bytes()?)?;
            }
            // Slot::P0 carries no explicit key in this node (p0 is the
            // implicit "everything below keys[0]" child); a first-key
            // change there only affects an ancestor's key entry, which
            // static ISAM deliberately does not patch (growth here is
            // absorbed, correctness restored by rebuild_from_data).
        }
        Ok(())
    }

    /// Deletes the record matching `(name, city, id)`. Returns whether a
    /// record was removed.
    pub fn delete(&mut self, name: &str, city: &str, id: u32) -> CatalogResult<bool> {
        let key = IsamKey::new(name, city, id);
        if self.root == -1 {
            return Ok(false);
        }
        let (base_offset, _) = self.descend(&key)?;
        self.delete_from_chain(base_offset, id)
    }

    fn delete_from_chain(&mut self, base_offset: i64, id: u32) -> CatalogResult<bool> {
        let mut prev_offset: Option<i64> = None;
        let mut offset = base_offset;
        loop {
            let mut page = Page::from_bytes(&self.data.read_page(offset as u64)?)?;
            if let Some(pos) = page.records.iter().position(|r| r.restaurant_id == id) {
                page.records.remove(pos);
                if page.records.is_empty() && offset != base_offset {
                    // Empty overflow page: unlink from predecessor.
                    if let Some(prev) = prev_offset {
                        let mut prev_page = Page::from_bytes(&self.data.read_page(prev as u64)?)?;
                        prev_page.next_page = page.next_page;
                        self.data.write_page(prev as u64, &prev_page.to_bytes()?)?;
                    }
                    return Ok(true);
                }
                if page.records.is_empty() && offset == base_offset && page.next_page >= 0 {
                    // Promote successor's first record set into base.
                    let succ_offset = page.next_page;
                    let succ_page = Page::from_bytes(&self.data.read_page(succ_offset as u64)?)?;
                    self.data.write_page(base_offset as u64, &succ_page.to_bytes()?)?;
                    return Ok(true);
                }
                self.data.write_page(offset as u64, &page.to_bytes()?)?;
                return Ok(true);
            }
            if page.next_page < 0 {
                return Ok(false);
            }
            prev_offset = Some(offset);
            offset = page.next_page;
        }
    }
}

fn like_match(haystack: &str, pattern: &str) -> bool {
    if let Some(rest) = pattern.strip_prefix('%') {
        if let Some(rest) = rest.strip_suffix('%') {
            return haystack.contains(rest);
        }
        return haystack.ends_with(rest);
    }
    if let Some(prefix) = pattern.strip_suffix('%') {
        return haystack.starts_with(prefix);
    }
    haystack == pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn rec(id: u32, name: &str, city: &str) -> Record {
        Record {
            restaurant_id: id,
            name: name.to_string(),
            city: city.to_string(),
            country_code: 1,
            address: "addr".into(),
            cuisines: "cuisine".into(),
            avg_cost_for_two: 100,
            currency: "USD".into(),
            has_table_booking: false,
            has_online_delivery: false,
            is_delivering_now: false,
            price_range: 2,
            aggregate_rating: 4.0,
            rating_text: "Good".into(),
            votes: 10,
            longitude: 1.0,
            latitude: 1.0,
        }
    }

    #[test]
    fn build_then_search_finds_every_record() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..40u32)
            .map(|i| rec(i, &format!("Restaurant {i}"), "City"))
            .collect();
        let idx = IsamIndex::build(dir.path(), records.clone()).unwrap();
        for r in &records {
            let found = idx.search(&r.name, &r.city, Some(r.restaurant_id)).unwrap();
            assert_eq!(found.unwrap().restaurant_id, r.restaurant_id);
        }
    }

    #[test]
    fn insert_into_full_base_extends_overflow_by_one_page() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..BLOCK_FACTOR as u32)
            .map(|i| rec(i, "Same Name", "Same City"))
            .collect();
        let mut idx = IsamIndex::build(dir.path(), records).unwrap();
        let pages_before = idx.data.page_count();
        idx.insert(rec(999, "Same Name", "Same City")).unwrap();
        assert_eq!(idx.data.page_count(), pages_before + 1);
    }

    #[test]
    fn delete_then_reinsert_is_findable_again() {
        let dir = tempdir().unwrap();
        let records = vec![rec(1, "A", "B"), rec(2, "C", "D")];
        let mut idx = IsamIndex::build(dir.path(), records).unwrap();
        assert!(idx.delete("A", "B", 1).unwrap());
        assert!(idx.search("A", "B", Some(1)).unwrap().is_none());
        idx.insert(rec(1, "A", "B")).unwrap();
        assert!(idx.search("A", "B", Some(1)).unwrap().is_some());
    }

    #[test]
    fn rebuild_from_data_preserves_reachability() {
        let dir = tempdir().unwrap();
        let records: Vec<Record> = (0..20u32).map(|i| rec(i, &format!("R{i}"), "C")).collect();
        let mut idx = IsamIndex::build(dir.path(), records.clone()).unwrap();
        idx.rebuild_from_data(dir.path()).unwrap();
        for r in &records {
            assert!(idx.search(&r.name, &r.city, Some(r.restaurant_id)).unwrap().is_some());
        }
    }

    #[test]
    fn like_wildcard_matches_substring() {
        assert!(like_match("makati city", "%makati%"));
        assert!(like_match("makati city", "makati%"));
        assert!(!like_match("quezon city", "%makati%"));
    }
}
