// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The restaurant row and its derived ordering key.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Fixed width of an [`IsamKey`] in bytes: `64 + 48 + 10`.
pub const ISAM_KEY_SIZE: usize = 122;

const NAME_KEY_WIDTH: usize = 64;
const CITY_KEY_WIDTH: usize = 48;
const ID_KEY_WIDTH: usize = 10;

/// A single restaurant row.
///
/// Records are immutable once constructed: an "update" in every index engine
/// is a delete followed by an insert of a new `Record`, never an in-place
/// field mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub restaurant_id: u32,
    pub name: String,
    pub city: String,
    pub country_code: u16,
    pub address: String,
    pub cuisines: String,
    pub avg_cost_for_two: i32,
    pub currency: String,
    pub has_table_booking: bool,
    pub has_online_delivery: bool,
    pub is_delivering_now: bool,
    pub price_range: i32,
    pub aggregate_rating: f64,
    pub rating_text: String,
    pub votes: i32,
    pub longitude: f64,
    pub latitude: f64,
}

impl Record {
    /// Builds the [`IsamKey`] derived from this record's name, city and id.
    pub fn isam_key(&self) -> IsamKey {
        IsamKey::new(&self.name, &self.city, self.restaurant_id)
    }

    /// Reads a named numeric attribute for the comparison/range predicates
    /// that `AvlIndex::search_comparison` and `search_between` evaluate.
    ///
    /// Returns `None` for attributes that are not numeric (the caller treats
    /// that as a `SchemaError`, not a missing value).
    pub fn numeric_attr(&self, attr: &str) -> Option<f64> {
        match attr {
            "restaurant_id" => Some(self.restaurant_id as f64),
            "avg_cost_for_two" | "average_cost_for_two" => Some(self.avg_cost_for_two as f64),
            "price_range" => Some(self.price_range as f64),
            "aggregate_rating" | "rating" => Some(self.aggregate_rating),
            "votes" => Some(self.votes as f64),
            "longitude" => Some(self.longitude),
            "latitude" => Some(self.latitude),
            _ => None,
        }
    }

    /// Reads a named textual attribute for `search_text`/ISAM scans.
    pub fn text_attr(&self, attr: &str) -> Option<&str> {
        match attr {
            "name" => Some(&self.name),
            "city" => Some(&self.city),
            "address" => Some(&self.address),
            "cuisines" => Some(&self.cuisines),
            "currency" => Some(&self.currency),
            "rating_text" => Some(&self.rating_text),
            _ => None,
        }
    }
}

/// Lowercases, applies Unicode NFKD decomposition, and strips combining
/// marks. Load-bearing: every text comparison ISAM performs, on write and on
/// read, must go through this exact function or the index silently stops
/// finding rows it indexed under a different normalisation.
pub fn normalize(input: &str) -> String {
    input
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF | 0xFE20..=0xFE2F)
}

/// The 122-byte bytewise-lexicographic ordering key ISAM sorts and searches
/// on: `normalize(name)[:64] ++ normalize(city)[:48] ++ zero_pad(id, 10)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IsamKey(pub [u8; ISAM_KEY_SIZE]);

impl IsamKey {
    pub fn new(name: &str, city: &str, restaurant_id: u32) -> Self {
        let mut buf = [0u8; ISAM_KEY_SIZE];
        write_padded(&mut buf[0..NAME_KEY_WIDTH], &normalize(name));
        write_padded(
            &mut buf[NAME_KEY_WIDTH..NAME_KEY_WIDTH + CITY_KEY_WIDTH],
            &normalize(city),
        );
        let id_str = format!("{:0width$}", restaurant_id, width = ID_KEY_WIDTH);
        buf[NAME_KEY_WIDTH + CITY_KEY_WIDTH..].copy_from_slice(id_str.as_bytes());
        IsamKey(buf)
    }

    /// Builds a key whose id field is a sentinel high enough to sort after
    /// every real id sharing the same (name, city) prefix. Used when a
    /// search is given a name/city but no id, per §4.2's descent rule.
    pub fn with_sentinel_id(name: &str, city: &str) -> Self {
        Self::new(name, city, 0).with_id_str("9999999999")
    }

    fn with_id_str(mut self, id_str: &str) -> Self {
        self.0[NAME_KEY_WIDTH + CITY_KEY_WIDTH..].copy_from_slice(id_str.as_bytes());
        self
    }

    /// True if this key's name+city prefix (the first 112 bytes) matches
    /// `other`'s — used for the tolerant full-scan fallback in `search`.
    pub fn same_name_city_prefix(&self, other: &IsamKey) -> bool {
        self.0[..NAME_KEY_WIDTH + CITY_KEY_WIDTH] == other.0[..NAME_KEY_WIDTH + CITY_KEY_WIDTH]
    }

    pub fn as_bytes(&self) -> &[u8; ISAM_KEY_SIZE] {
        &self.0
    }
}

fn write_padded(dst: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(dst.len());
    dst[..n].copy_from_slice(&bytes[..n]);
    // remainder stays zero-padded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record {
            restaurant_id: 6317637,
            name: "Le Petit Souffle".to_string(),
            city: "Makati City".to_string(),
            country_code: 162,
            address: "address".to_string(),
            cuisines: "French, Japanese".to_string(),
            avg_cost_for_two: 1100,
            currency: "Botswana Pula(P)".to_string(),
            has_table_booking: true,
            has_online_delivery: false,
            is_delivering_now: false,
            price_range: 3,
            aggregate_rating: 4.8,
            rating_text: "Excellent".to_string(),
            votes: 314,
            longitude: 121.027535,
            latitude: 14.565443,
        }
    }

    #[test]
    fn normalize_lowercases_and_strips_marks() {
        assert_eq!(normalize("Café"), "cafe");
        assert_eq!(normalize("MAKATI City"), "makati city");
    }

    #[test]
    fn isam_key_is_fixed_width() {
        let k = IsamKey::new("abc", "def", 7);
        assert_eq!(k.as_bytes().len(), ISAM_KEY_SIZE);
    }

    #[test]
    fn isam_key_ordering_is_bytewise() {
        let a = IsamKey::new("alpha", "city", 1);
        let b = IsamKey::new("beta", "city", 1);
        assert!(a < b);
    }

    #[test]
    fn sentinel_key_sorts_after_real_ids_with_same_prefix() {
        let r = sample();
        let real = r.isam_key();
        let sentinel = IsamKey::with_sentinel_id(&r.name, &r.city);
        assert!(real < sentinel);
        assert!(real.same_name_city_prefix(&sentinel));
    }
}
