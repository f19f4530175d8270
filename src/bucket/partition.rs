use super::id::BucketIdGenerator;
use super::types::BucketId;

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Exclusive upper bound of the last range: one past `i32::MAX`.
const HASH_SPACE_END: i64 = i32::MAX as i64 + 1;

/// Root record of one collection: the hash space cut into contiguous ranges.
///
/// Range `i` covers `[boundaries[i], boundaries[i + 1])`, the last range runs up to
/// and including `i32::MAX`. `boundaries[0]` is always `i32::MIN`, so every hash has
/// exactly one owning range. Each range maps to the bucket holding its entries and to
/// the number of entries in that bucket.
///
/// Once written to the store a table is never changed structurally. `split_down` and
/// `merge_up` leave `self` alone and return the replacement table. Count updates are
/// made on the writer's own copy before it is written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionTable {
    boundaries: Vec<i32>,
    counts: Vec<usize>,
    bucket_ids: Vec<BucketId>,
}

impl PartitionTable {
    /// A single empty range spanning the whole hash space.
    pub fn new(ids: &BucketIdGenerator) -> Self {
        Self {
            boundaries: vec![i32::MIN],
            counts: vec![0],
            bucket_ids: vec![ids.next_id()],
        }
    }

    /// Index of the range that owns `hash`.
    pub fn index_of(&self, hash: i32) -> usize {
        // boundaries[0] == i32::MIN, so the partition point is always >= 1
        self.boundaries.partition_point(|&lower| lower <= hash) - 1
    }

    pub fn range_of(&self, index: usize) -> RangeInclusive<i32> {
        let upper = self.upper_exclusive(index) - 1;
        self.boundaries[index]..=upper as i32
    }

    /// Where `split_down(index)` would cut range `index`, or `None` if the range holds
    /// a single hash value.
    pub fn split_point(&self, index: usize) -> Option<i32> {
        let lower = self.boundaries[index] as i64;
        let upper = self.upper_exclusive(index);
        // halves first: the plain sum overflows i32 and the result has to match
        // boundaries computed by other nodes
        let mut point = lower / 2 + upper / 2;
        if (point <= lower || point >= upper) && upper - lower >= 2 {
            // both halves truncated onto a bound of a narrow range
            point = lower + (upper - lower) / 2;
        }

        (lower < point && point < upper).then_some(point as i32)
    }

    /// Returns a table where range `index` is replaced by two adjacent ranges cut at
    /// its midpoint. Both halves get fresh bucket ids and a count of zero; every other
    /// range is carried over unchanged.
    pub fn split_down(&self, index: usize, ids: &BucketIdGenerator) -> Option<Self> {
        let point = self.split_point(index)?;

        let mut split = self.clone();
        split.boundaries.insert(index + 1, point);
        split.counts[index] = 0;
        split.counts.insert(index + 1, 0);
        split.bucket_ids[index] = ids.next_id();
        split.bucket_ids.insert(index + 1, ids.next_id());

        Some(split)
    }

    /// Returns a table where ranges `index` and `index + 1` are joined into one range
    /// starting at `boundaries[index]`, with a fresh bucket id and a count of zero.
    pub fn merge_up(&self, index: usize, ids: &BucketIdGenerator) -> Option<Self> {
        if index + 1 >= self.bucket_count() {
            return None;
        }

        let mut merged = self.clone();
        merged.boundaries.remove(index + 1);
        merged.counts.remove(index + 1);
        merged.counts[index] = 0;
        merged.bucket_ids.remove(index + 1);
        merged.bucket_ids[index] = ids.next_id();

        Some(merged)
    }

    pub fn count(&self, index: usize) -> usize {
        self.counts[index]
    }

    pub fn set_count(&mut self, index: usize, count: usize) {
        self.counts[index] = count;
    }

    pub fn bucket_id(&self, index: usize) -> BucketId {
        self.bucket_ids[index]
    }

    pub fn bucket_ids(&self) -> &[BucketId] {
        &self.bucket_ids
    }

    pub fn boundaries(&self) -> &[i32] {
        &self.boundaries
    }

    pub fn total_size(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn bucket_count(&self) -> usize {
        self.boundaries.len()
    }

    fn upper_exclusive(&self, index: usize) -> i64 {
        self.boundaries
            .get(index + 1)
            .map(|&lower| lower as i64)
            .unwrap_or(HASH_SPACE_END)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_split_cuts_at_zero() {
        let ids = BucketIdGenerator::with_instance(7);
        let table = PartitionTable::new(&ids);

        let split = table.split_down(0, &ids).unwrap();

        assert_eq!(split.boundaries(), &[i32::MIN, 0]);
        assert_eq!(split.range_of(0), i32::MIN..=-1);
        assert_eq!(split.range_of(1), 0..=i32::MAX);
        // the source table is untouched
        assert_eq!(table.bucket_count(), 1);
    }

    #[test]
    fn test_narrow_range_cannot_split() {
        let ids = BucketIdGenerator::with_instance(7);
        let mut table = PartitionTable::new(&ids);
        table.boundaries = vec![i32::MIN, 5, 6];
        table.counts = vec![0, 0, 0];
        table.bucket_ids = vec![ids.next_id(), ids.next_id(), ids.next_id()];

        assert_eq!(table.split_point(1), None);
        assert!(table.split_down(1, &ids).is_none());
    }

    #[test]
    fn test_narrow_range_splits_at_exact_midpoint() {
        let ids = BucketIdGenerator::with_instance(7);
        let mut table = PartitionTable::new(&ids);
        table.boundaries = vec![i32::MIN, 5, 7];
        table.counts = vec![0; 3];
        table.bucket_ids = (0..3).map(|_| ids.next_id()).collect();

        // 5/2 + 7/2 truncates to 5
        assert_eq!(table.split_point(1), Some(6));
        let split = table.split_down(1, &ids).unwrap();
        assert_eq!(split.range_of(1), 5..=5);
        assert_eq!(split.range_of(2), 6..=6);
    }

    #[test]
    fn test_negative_narrow_range_splits_inside() {
        let ids = BucketIdGenerator::with_instance(7);
        let mut table = PartitionTable::new(&ids);
        table.boundaries = vec![i32::MIN, -3, -1];
        table.counts = vec![0; 3];
        table.bucket_ids = (0..3).map(|_| ids.next_id()).collect();

        // -3/2 + -1/2 truncates to -1, the upper bound
        assert_eq!(table.split_point(1), Some(-2));
    }
}
