// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Extendible hashing over `restaurant_id`: directory + append-only buckets.

pub mod bucket;
pub mod directory;

use crate::error::CatalogResult;
use crate::record::Record;
use bucket::{Bucket, BucketFile};
use directory::Directory;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

const DEFAULT_BUCKET_CAPACITY: usize = 8;

pub struct ExtHashIndex {
    dir: Directory,
    buckets: BucketFile,
    dir_path: PathBuf,
}

fn hash_key(key: u32) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl ExtHashIndex {
    pub fn open(base_dir: &Path) -> CatalogResult<Self> {
        std::fs::create_dir_all(base_dir)?;
        let dir_path = base_dir.join("exthash.dir.json");
        let dir = Directory::load(&dir_path)?.unwrap_or_else(|| Directory::new(DEFAULT_BUCKET_CAPACITY));
        let buckets = BucketFile::open(&base_dir.join("exthash.buckets.bin"))?;
        Ok(ExtHashIndex { dir, buckets, dir_path })
    }

    pub fn build(base_dir: &Path, records: Vec<Record>) -> CatalogResult<Self> {
        let _ = std::fs::remove_file(base_dir.join("exthash.dir.json"));
        let _ = std::fs::remove_file(base_dir.join("exthash.buckets.bin"));
        let mut engine = Self::open(base_dir)?;
        // A fresh directory starts with one bucket shared by both slots.
        let bucket = Bucket::new(1);
        let offset = engine.buckets.append(0, &bucket)?;
        engine.dir.bucket_offsets.insert(0, offset);
        for rec in records {
            engine.insert(rec.restaurant_id, rec)?;
        }
        engine.dir.save(&engine.dir_path)?;
        Ok(engine)
    }

    fn load_bucket(&mut self, bucket_id: u32) -> CatalogResult<Bucket> {
        match self.dir.bucket_offsets.get(&bucket_id) {
            Some(&offset) => self.buckets.read_at(offset),
            None => Ok(Bucket::new(self.dir.global_depth)),
        }
    }

    fn persist_bucket(&mut self, bucket_id: u32, bucket: &Bucket) -> CatalogResult<()> {
        let offset = self.buckets.append(bucket_id, bucket)?;
        self.dir.bucket_offsets.insert(bucket_id, offset);
        self.dir.save(&self.dir_path)
    }

    /// Inserts or updates `(k, v)`, splitting and (if needed) doubling the
    /// directory on overflow per §4.3.
    pub fn insert(&mut self, k: u32, v: Record) -> CatalogResult<()> {
        loop {
            let hash = hash_key(k);
            let idx = self.dir.index_for_hash(hash);
            let bucket_id = self.dir.directory[idx];
            let mut bucket = self.load_bucket(bucket_id)?;

            if bucket.items.contains_key(&k) {
                bucket.items.insert(k, v);
                self.persist_bucket(bucket_id, &bucket)?;
                return Ok(());
            }
            if !bucket.is_full(self.dir.bucket_capacity) {
                bucket.items.insert(k, v);
                self.persist_bucket(bucket_id, &bucket)?;
                return Ok(());
            }

            // Split: grow the directory if this bucket is already maximally
            // discriminating, then redistribute by the new high bit.
            if bucket.local_depth == self.dir.global_depth {
                self.dir.double();
            }
            let new_local_depth = bucket.local_depth + 1;
            let sibling_id = self.dir.allocate_bucket_id();

            let mut low_bucket = Bucket::new(new_local_depth);
            let mut high_bucket = Bucket::new(new_local_depth);
            let high_bit = 1u64 << (new_local_depth - 1);
            for (key, value) in bucket.items.drain() {
                if hash_key(key) & high_bit != 0 {
                    high_bucket.items.insert(key, value);
                } else {
                    low_bucket.items.insert(key, value);
                }
            }

            for (slot, &entry) in self.dir.directory.clone().iter().enumerate() {
                if entry == bucket_id {
                    let goes_high = slot as u64 & high_bit != 0;
                    self.dir.directory[slot] = if goes_high { sibling_id } else { bucket_id };
                }
            }

            self.persist_bucket(bucket_id, &low_bucket)?;
            self.persist_bucket(sibling_id, &high_bucket)?;
            // Retry the insert now that capacity has been made.
        }
    }

    pub fn get(&mut self, k: u32) -> CatalogResult<Option<Record>> {
        let hash = hash_key(k);
        let bucket_id = self.dir.bucket_id_for(hash);
        let bucket = self.load_bucket(bucket_id)?;
        Ok(bucket.items.get(&k).cloned())
    }

    /// Marks `k` absent; the directory never shrinks (§4.3).
    pub fn remove(&mut self, k: u32) -> CatalogResult<bool> {
        let hash = hash_key(k);
        let bucket_id = self.dir.bucket_id_for(hash);
        let mut bucket = self.load_bucket(bucket_id)?;
        let removed = bucket.items.remove(&k).is_some();
        if removed {
            self.persist_bucket(bucket_id, &bucket)?;
        }
        Ok(removed)
    }

    pub fn global_depth(&self) -> u32 {
        self.dir.global_depth
    }

    pub fn directory_len(&self) -> usize {
        self.dir.directory.len()
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
    fn directory_size_is_always_a_power_of_two() {
        let dir = tempdir().unwrap();
        let mut idx = ExtHashIndex::open(dir.path()).unwrap();
        for i in 0..200u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        assert_eq!(idx.directory_len(), 1 << idx.global_depth());
        assert!(idx.global_depth() >= 1);
    }

    #[test]
    fn every_inserted_key_is_retrievable() {
        let dir = tempdir().unwrap();
        let mut idx = ExtHashIndex::open(dir.path()).unwrap();
        for i in 0..100u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        for i in 0..100u32 {
            assert_eq!(idx.get(i).unwrap().unwrap().restaurant_id, i);
        }
    }

    #[test]
    fn remove_then_get_returns_none_without_shrinking_directory() {
        let dir = tempdir().unwrap();
        let mut idx = ExtHashIndex::open(dir.path()).unwrap();
        for i in 0..50u32 {
            idx.insert(i, rec(i)).unwrap();
        }
        let depth_before = idx.global_depth();
        assert!(idx.remove(7).unwrap());
        assert!(idx.get(7).unwrap().is_none());
        assert_eq!(idx.global_depth(), depth_before);
    }
}
