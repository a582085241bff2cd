//! Known-item index and duplicate resolution.
//!
//! The index is a run-scoped, read-only snapshot of every persisted meme's
//! identity hashes: a map for O(1) exact lookups and a materialized list of
//! perceptual hashes for the near-duplicate scan. The scan is linear over
//! known items, which is fine at tens of items per run; a bucketed structure
//! would slot in behind the same two accessors if that ever changes.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::memes;
use crate::error::IngestError;
use crate::models::{DuplicateVerdict, Fingerprint, KnownItem};

/// Max Hamming distance (exclusive) for two perceptual hashes to count as
/// near-duplicates. Tuned, not derived: low enough to suppress false
/// positives, high enough to catch recompressed and resized reposts.
pub const NEAR_DUPLICATE_DISTANCE: u32 = 5;

pub struct KnownIndex {
    exact: std::collections::HashMap<String, Uuid>,
    near: Vec<(String, Uuid)>,
    item_count: usize,
}

impl KnownIndex {
    /// Snapshot all persisted identity hashes. Failure here is fatal to the
    /// run: without the index every candidate would look unique.
    pub async fn load(pool: &PgPool) -> Result<Self, IngestError> {
        let items = memes::all_known_items(pool)
            .await
            .map_err(IngestError::IndexLoad)?;
        Ok(Self::from_items(items))
    }

    /// Build from already-loaded rows. Items without a perceptual hash still
    /// participate in exact matching but not in the near scan.
    pub fn from_items(items: Vec<KnownItem>) -> Self {
        let item_count = items.len();
        let mut exact = std::collections::HashMap::new();
        let mut near = Vec::new();
        for item in items {
            if let Some(hash) = item.content_hash {
                exact.insert(hash, item.id);
            }
            if let Some(phash) = item.phash {
                near.push((phash, item.id));
            }
        }
        Self {
            exact,
            near,
            item_count,
        }
    }

    pub fn exact_lookup(&self, content_hash: &str) -> Option<Uuid> {
        self.exact.get(content_hash).copied()
    }

    pub fn near_candidates(&self) -> &[(String, Uuid)] {
        &self.near
    }

    /// Number of known items snapshotted at load time, including rows that
    /// only participate in exact matching.
    pub fn item_count(&self) -> usize {
        self.item_count
    }
}

/// Classify a fingerprint against the index.
///
/// An exact content-hash match is definitive and short-circuits the
/// perceptual scan. Otherwise the first known item within
/// `NEAR_DUPLICATE_DISTANCE` bits wins, in index order; equidistant ties are
/// not disambiguated further. Stored hashes that fail to decode or differ in
/// length are skipped individually.
pub fn resolve(fingerprint: &Fingerprint, index: &KnownIndex) -> DuplicateVerdict {
    if let Some(id) = index.exact_lookup(&fingerprint.content_hash) {
        return DuplicateVerdict::ExactDuplicate(id);
    }

    let Some(candidate_hex) = fingerprint.phash.as_deref() else {
        return DuplicateVerdict::Unique;
    };
    let Ok(candidate_bits) = hex::decode(candidate_hex) else {
        return DuplicateVerdict::Unique;
    };

    for (known_hex, id) in index.near_candidates() {
        let Ok(known_bits) = hex::decode(known_hex) else {
            continue;
        };
        match hamming_distance(&candidate_bits, &known_bits) {
            Some(dist) if dist < NEAR_DUPLICATE_DISTANCE => {
                return DuplicateVerdict::NearDuplicate(*id);
            }
            _ => {}
        }
    }

    DuplicateVerdict::Unique
}

/// Bit difference count between two hashes; None when the lengths differ.
fn hamming_distance(a: &[u8], b: &[u8]) -> Option<u32> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Uuid, content_hash: Option<&str>, phash: Option<&str>) -> KnownItem {
        KnownItem {
            id,
            content_hash: content_hash.map(String::from),
            phash: phash.map(String::from),
        }
    }

    fn fp(content_hash: &str, phash: Option<&str>) -> Fingerprint {
        Fingerprint {
            content_hash: content_hash.to_string(),
            phash: phash.map(String::from),
            nsfw_score: 0.0,
        }
    }

    #[test]
    fn test_exact_match_supersedes_near() {
        let id = Uuid::new_v4();
        // Same content hash but a wildly different phash: exact still wins
        let index = KnownIndex::from_items(vec![item(id, Some("abc123"), Some("ffffffffffffffff"))]);
        let verdict = resolve(&fp("abc123", Some("0000000000000000")), &index);
        assert_eq!(verdict, DuplicateVerdict::ExactDuplicate(id));
    }

    #[test]
    fn test_near_duplicate_below_threshold() {
        let id = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![item(id, Some("other"), Some("0000000000000000"))]);
        // 0x0f in the last byte = 4 bits apart
        let verdict = resolve(&fp("new", Some("000000000000000f")), &index);
        assert_eq!(verdict, DuplicateVerdict::NearDuplicate(id));
    }

    #[test]
    fn test_distance_exactly_five_is_not_near() {
        let id = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![item(id, Some("other"), Some("0000000000000000"))]);
        // 0x1f = 5 set bits; threshold is strictly less than 5
        let verdict = resolve(&fp("new", Some("000000000000001f")), &index);
        assert_eq!(verdict, DuplicateVerdict::Unique);
    }

    #[test]
    fn test_identical_phash_is_near_duplicate() {
        let id = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![item(id, Some("other"), Some("a1b2c3d4e5f60708"))]);
        let verdict = resolve(&fp("new", Some("a1b2c3d4e5f60708")), &index);
        assert_eq!(verdict, DuplicateVerdict::NearDuplicate(id));
    }

    #[test]
    fn test_absent_phash_degrades_to_unique() {
        let id = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![item(id, Some("other"), Some("0000000000000000"))]);
        assert_eq!(resolve(&fp("new", None), &index), DuplicateVerdict::Unique);
    }

    #[test]
    fn test_malformed_stored_hashes_are_skipped() {
        let bad = Uuid::new_v4();
        let good = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![
            item(bad, None, Some("not hex!")),
            item(bad, None, Some("00ff")), // wrong length
            item(good, None, Some("0000000000000000")),
        ]);
        let verdict = resolve(&fp("new", Some("0000000000000001")), &index);
        assert_eq!(verdict, DuplicateVerdict::NearDuplicate(good));
    }

    #[test]
    fn test_first_match_wins_in_index_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let index = KnownIndex::from_items(vec![
            item(first, None, Some("0000000000000000")),
            item(second, None, Some("0000000000000000")),
        ]);
        let verdict = resolve(&fp("new", Some("0000000000000000")), &index);
        assert_eq!(verdict, DuplicateVerdict::NearDuplicate(first));
    }

    #[test]
    fn test_item_count_includes_rows_without_phash() {
        let index = KnownIndex::from_items(vec![
            item(Uuid::new_v4(), Some("abc"), None),
            item(Uuid::new_v4(), None, Some("0000000000000000")),
        ]);
        assert_eq!(index.item_count(), 2);
    }

    #[test]
    fn test_empty_index_is_unique() {
        let index = KnownIndex::from_items(vec![]);
        let verdict = resolve(&fp("abc", Some("0000000000000000")), &index);
        assert_eq!(verdict, DuplicateVerdict::Unique);
    }

    #[test]
    fn test_hamming_distance_length_mismatch() {
        assert_eq!(hamming_distance(&[0x00], &[0x00, 0x00]), None);
        assert_eq!(hamming_distance(&[0xff], &[0x00]), Some(8));
        assert_eq!(hamming_distance(&[0xf0, 0x0f], &[0xf0, 0x0f]), Some(0));
    }
}
