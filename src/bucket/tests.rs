//! Bucket Module Tests
//!
//! Validates the value types a collection is built from.
//!
//! ## Test Scopes
//! - **Placement Hash**: Pins the hash to known vectors so a change to the mixing would be caught.
//! - **Bucket Ids**: Uniqueness and formatting.
//! - **Partition Table**: Lookup, split and merge, including the copy-on-write guarantee.
//! - **Buckets**: Splitting and absorbing entries.

#[cfg(test)]
mod tests {
    use crate::bucket::hash::{HashCode, mix, placement_hash};
    use crate::bucket::id::BucketIdGenerator;
    use crate::bucket::partition::PartitionTable;
    use crate::bucket::types::{Bucket, BucketId, TransferRecord};
    use std::collections::HashSet;

    // ============================================================
    // PLACEMENT HASH TESTS
    // ============================================================

    #[test]
    fn test_mix_known_vectors() {
        assert_eq!(mix(0), 1805505889);
        assert_eq!(mix(1), -1931162451);
    }

    #[test]
    fn test_string_hash_code_is_polynomial_over_utf16() {
        assert_eq!("".hash_code(), 0);
        assert_eq!("a".hash_code(), 97);
        assert_eq!("hoge".hash_code(), 3208229);
        assert_eq!("hoge".to_string().hash_code(), 3208229);
    }

    #[test]
    fn test_placement_hash_known_vector() {
        assert_eq!(placement_hash("hoge"), 240857867);
        assert_eq!(placement_hash(&"hoge".to_string()), 240857867);
    }

    #[test]
    fn test_mix_sign_extends_high_bytes() {
        // codes with a byte >= 0x80 depend on the sign extension of that byte
        assert_eq!(mix(-1), 171705313);
        assert_eq!(mix(0x80), 2094871050);
        assert_eq!(mix(0xff), 1267635083);
        assert_eq!(mix(i32::MAX), 925940511);
        assert_eq!(mix(i32::MIN), -797218156);
    }

    #[test]
    fn test_placement_hash_is_deterministic() {
        for i in 0..1000 {
            let key = format!("valueKey{}", i);
            assert_eq!(placement_hash(&key), placement_hash(&key));
        }
    }

    #[test]
    fn test_integer_hash_codes() {
        assert_eq!(42i32.hash_code(), 42);
        assert_eq!((-1i8).hash_code(), -1);
        assert_eq!(7u64.hash_code(), 7);
        assert_eq!((1i64 << 32).hash_code(), 1);
        assert_eq!(true.hash_code(), 1231);
        assert_eq!(false.hash_code(), 1237);
    }

    #[test]
    fn test_placement_hash_spreads_over_both_halves() {
        let negatives = (0..10_000)
            .filter(|i| placement_hash(&format!("key_{}", i)) < 0)
            .count();

        // Expect roughly half; a badly broken mix would land everything on one side.
        assert!(
            (4000..6000).contains(&negatives),
            "Expected roughly half negative hashes, got {}",
            negatives
        );
    }

    // ============================================================
    // BUCKET ID TESTS
    // ============================================================

    #[test]
    fn test_bucket_ids_are_unique() {
        let ids = BucketIdGenerator::new();
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            assert!(seen.insert(ids.next_id()), "Bucket id was handed out twice");
        }
        assert_eq!(ids.issued(), 10_000);
    }

    #[test]
    fn test_bucket_ids_carry_generator_instance() {
        let ids = BucketIdGenerator::with_instance(0xabc);

        let first = ids.next_id();
        let second = ids.next_id();

        assert_eq!(first, BucketId::new(0xabc, 1));
        assert_eq!(second, BucketId::new(0xabc, 2));
        assert_eq!(first.to_string(), "abc:1");
    }

    #[test]
    fn test_separate_generators_do_not_share_counters() {
        let a = BucketIdGenerator::with_instance(1);
        let b = BucketIdGenerator::with_instance(2);

        assert_eq!(a.next_id().sequence, 1);
        assert_eq!(b.next_id().sequence, 1);
        assert_ne!(a.next_id(), b.next_id());
    }

    // ============================================================
    // PARTITION TABLE TESTS
    // ============================================================

    #[test]
    fn test_new_table_covers_whole_hash_space() {
        let ids = BucketIdGenerator::with_instance(1);
        let table = PartitionTable::new(&ids);

        assert_eq!(table.bucket_count(), 1);
        assert_eq!(table.total_size(), 0);
        assert_eq!(table.range_of(0), i32::MIN..=i32::MAX);
        assert_eq!(table.index_of(i32::MIN), 0);
        assert_eq!(table.index_of(0), 0);
        assert_eq!(table.index_of(i32::MAX), 0);
    }

    #[test]
    fn test_index_of_after_splits() {
        let ids = BucketIdGenerator::with_instance(1);
        let table = PartitionTable::new(&ids)
            .split_down(0, &ids)
            .unwrap()
            .split_down(1, &ids)
            .unwrap();

        // [MIN, 0, 2^30]
        assert_eq!(table.boundaries(), &[i32::MIN, 0, 1 << 30]);
        assert_eq!(table.index_of(-1), 0);
        assert_eq!(table.index_of(0), 1);
        assert_eq!(table.index_of((1 << 30) - 1), 1);
        assert_eq!(table.index_of(1 << 30), 2);
        assert_eq!(table.index_of(i32::MAX), 2);
        assert_eq!(table.range_of(1), 0..=(1 << 30) - 1);
        assert_eq!(table.range_of(2), (1 << 30)..=i32::MAX);
    }

    #[test]
    fn test_split_keeps_other_ranges() {
        let ids = BucketIdGenerator::with_instance(1);
        let mut table = PartitionTable::new(&ids).split_down(0, &ids).unwrap();
        table.set_count(0, 3);
        table.set_count(1, 4);
        let left_id = table.bucket_id(0);

        let split = table.split_down(1, &ids).unwrap();

        assert_eq!(split.bucket_count(), 3);
        assert_eq!(split.bucket_id(0), left_id);
        assert_eq!(split.count(0), 3);
        assert_eq!(split.count(1), 0);
        assert_eq!(split.count(2), 0);
        assert_ne!(split.bucket_id(1), table.bucket_id(1));
        assert_ne!(split.bucket_id(2), table.bucket_id(1));
        assert_ne!(split.bucket_id(1), split.bucket_id(2));
    }

    #[test]
    fn test_split_of_negative_range_midpoint() {
        let ids = BucketIdGenerator::with_instance(1);
        let table = PartitionTable::new(&ids).split_down(0, &ids).unwrap();

        let split = table.split_down(0, &ids).unwrap();

        assert_eq!(split.boundaries(), &[i32::MIN, -(1 << 30), 0]);
    }

    #[test]
    fn test_merge_is_inverse_of_split() {
        let ids = BucketIdGenerator::with_instance(1);
        let base = PartitionTable::new(&ids).split_down(0, &ids).unwrap();
        let split = base.split_down(1, &ids).unwrap();

        let merged = split.merge_up(1, &ids).unwrap();

        assert_eq!(merged.boundaries(), base.boundaries());
        assert_eq!(merged.bucket_id(0), base.bucket_id(0));
        // merged range gets a brand new id
        assert_ne!(merged.bucket_id(1), base.bucket_id(1));
        assert!(!split.bucket_ids().contains(&merged.bucket_id(1)));
    }

    #[test]
    fn test_merge_down_to_single_range() {
        let ids = BucketIdGenerator::with_instance(1);
        let mut split = PartitionTable::new(&ids).split_down(0, &ids).unwrap();
        split.set_count(0, 2);
        split.set_count(1, 5);

        let merged = split.merge_up(0, &ids).unwrap();

        assert_eq!(merged.bucket_count(), 1);
        assert_eq!(merged.boundaries(), &[i32::MIN]);
        assert_eq!(merged.count(0), 0);
        assert_eq!(merged.range_of(0), i32::MIN..=i32::MAX);
    }

    #[test]
    fn test_merge_past_last_range_is_rejected() {
        let ids = BucketIdGenerator::with_instance(1);
        let table = PartitionTable::new(&ids).split_down(0, &ids).unwrap();

        assert!(table.merge_up(1, &ids).is_none());
        assert!(PartitionTable::new(&ids).merge_up(0, &ids).is_none());
    }

    #[test]
    fn test_total_size_sums_counts() {
        let ids = BucketIdGenerator::with_instance(1);
        let mut table = PartitionTable::new(&ids)
            .split_down(0, &ids)
            .unwrap()
            .split_down(0, &ids)
            .unwrap();

        table.set_count(0, 1);
        table.set_count(1, 2);
        table.set_count(2, 3);

        assert_eq!(table.total_size(), 6);
    }

    #[test]
    fn test_table_bincode_roundtrip() {
        let ids = BucketIdGenerator::with_instance(9);
        let mut table = PartitionTable::new(&ids).split_down(0, &ids).unwrap();
        table.set_count(1, 12);

        let encoded = bincode::serialize(&table).expect("Serialization failed");
        let restored: PartitionTable =
            bincode::deserialize(&encoded).expect("Deserialization failed");

        assert_eq!(restored, table);
    }

    // ============================================================
    // BUCKET TESTS
    // ============================================================

    #[test]
    fn test_bucket_insert_overwrite_remove() {
        let mut bucket: Bucket<String, u32> = Bucket::new();

        assert_eq!(bucket.insert("a".to_string(), 1), None);
        assert_eq!(bucket.insert("a".to_string(), 2), Some(1));
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket.remove(&"a".to_string()), Some(2));
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_bucket_split_by_hash_loses_nothing() {
        let mut bucket: Bucket<String, usize> = Bucket::new();
        for i in 0..200 {
            bucket.insert(format!("valueKey{}", i), i);
        }

        let (left, right) = bucket.clone().split_by(|key| placement_hash(key) < 0);

        assert_eq!(left.len() + right.len(), 200);
        assert!(left.iter().all(|(key, _)| placement_hash(key) < 0));
        assert!(right.iter().all(|(key, _)| placement_hash(key) >= 0));

        let mut rejoined = left;
        rejoined.absorb(right);
        assert_eq!(rejoined.into_entries(), bucket.into_entries());
    }

    #[test]
    fn test_transfer_record_keeps_target_order() {
        let first = BucketId::new(1, 10);
        let second = BucketId::new(1, 11);

        let transfer = TransferRecord::new(vec![first, second]);

        assert_eq!(transfer.targets(), &[first, second]);
    }
}
