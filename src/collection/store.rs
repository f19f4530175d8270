//! Collection Store
//!
//! Implements the operations of a one-to-many collection on top of a `KeyValueStore`.
//!
//! ## Responsibilities
//! - **Placement**: Hashing secondary keys and routing them to the bucket owning their range.
//! - **Splitting**: Cutting an overfull bucket in two when a new key arrives.
//! - **Merging**: Joining a nearly empty bucket with its smaller neighbour after a removal.
//! - **Redirects**: Leaving transfer records at retired bucket ids and following them on reads.
//!
//! ## Write Ordering
//! Every mutation writes children before parents: new buckets first, then the transfer
//! records at the retired ids, then the partition table. A reader holding any table that
//! was ever published can therefore reach every entry that table describes.

use super::config::CollectionConfig;
use crate::bucket::hash::{HashCode, placement_hash};
use crate::bucket::id::BucketIdGenerator;
use crate::bucket::partition::PartitionTable;
use crate::bucket::types::{Bucket, BucketId, TransferRecord};
use crate::storage::protocol::{
    StoredRecord, bucket_key, collection_key, decode_record, encode_record,
};
use crate::storage::store::KeyValueStore;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

/// A family of one-to-many collections stored in `S`.
///
/// Each top key `K` names one collection of `SK -> V` entries.
///
/// `put`, `remove` and `remove_collection` must not run concurrently for the same top
/// key: callers hold a cluster-wide lock on the top key for the duration of the call.
/// All other operations take no lock and may run at any time, including while a
/// mutation of the same key is in flight.
pub struct CollectionStore<K, SK, V, S> {
    store: Arc<S>,
    ids: Arc<BucketIdGenerator>,
    config: CollectionConfig,
    _entries: PhantomData<fn() -> (K, SK, V)>,
}

impl<K, SK, V, S> CollectionStore<K, SK, V, S>
where
    K: Serialize + Sync,
    SK: HashCode + Serialize + DeserializeOwned + Eq + Hash + Send + Sync,
    V: Serialize + DeserializeOwned + Send + Sync,
    S: KeyValueStore,
{
    /// Creates a collection store writing into `store`.
    ///
    /// `ids` should be shared by every collection writing into the same store from this
    /// process, so that bucket ids never collide.
    pub fn new(
        store: Arc<S>,
        ids: Arc<BucketIdGenerator>,
        config: CollectionConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            store,
            ids,
            config,
            _entries: PhantomData,
        })
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Stores `value` under `secondary_key` in the collection named `key`.
    ///
    /// Creates the collection if it does not exist. When the target bucket is full
    /// and `secondary_key` is new, the bucket is split in two.
    ///
    /// # Returns
    /// * `Some(previous)` if `secondary_key` was already present.
    /// * `None` if a new entry was added.
    pub async fn put(&self, key: &K, secondary_key: SK, value: V) -> Result<Option<V>> {
        let table_key = collection_key(key)?;

        let Some(mut table) = self.read_table(&table_key).await? else {
            let mut table = PartitionTable::new(&self.ids);
            let mut bucket = Bucket::new();
            bucket.insert(secondary_key, value);
            table.set_count(0, bucket.len());

            let bucket_id = table.bucket_id(0);
            self.write_bucket(bucket_id, bucket).await?;
            self.write_table(&table_key, table).await?;

            tracing::debug!("Created collection with bucket {}", bucket_id);
            return Ok(None);
        };

        let index = table.index_of(placement_hash(&secondary_key));
        let bucket_id = table.bucket_id(index);
        // a missing bucket is treated as empty
        let mut bucket = self.fetch_live_bucket(bucket_id).await?.unwrap_or_default();

        if bucket.contains_key(&secondary_key) {
            let previous = bucket.insert(secondary_key, value);
            self.write_bucket(bucket_id, bucket).await?;
            return Ok(previous);
        }

        if table.count(index) >= self.config.max_bucket_size {
            match table.split_down(index, &self.ids) {
                Some(split) => {
                    bucket.insert(secondary_key, value);
                    self.split_bucket(&table_key, split, index, bucket_id, bucket)
                        .await?;
                    return Ok(None);
                }
                None => {
                    tracing::warn!(
                        "Range {:?} of bucket {} is too narrow to split, growing past {} entries",
                        table.range_of(index),
                        bucket_id,
                        self.config.max_bucket_size
                    );
                }
            }
        }

        bucket.insert(secondary_key, value);
        table.set_count(index, bucket.len());
        self.write_bucket(bucket_id, bucket).await?;
        self.write_table(&table_key, table).await?;

        Ok(None)
    }

    /// Removes `secondary_key` from the collection named `key`.
    ///
    /// Removing the last entry deletes the whole collection. Otherwise, if the bucket
    /// and its smaller neighbour together hold at most `min_compaction_bucket_size`
    /// entries, the two are merged.
    pub async fn remove(&self, key: &K, secondary_key: &SK) -> Result<Option<V>> {
        let table_key = collection_key(key)?;

        let Some(mut table) = self.read_table(&table_key).await? else {
            return Ok(None);
        };

        let index = table.index_of(placement_hash(secondary_key));
        let bucket_id = table.bucket_id(index);

        let Some(mut bucket) = self.fetch_live_bucket(bucket_id).await? else {
            return Ok(None);
        };
        let Some(previous) = bucket.remove(secondary_key) else {
            return Ok(None);
        };
        table.set_count(index, bucket.len());

        if table.total_size() == 0 {
            self.delete_collection(&table_key, &table).await?;
            tracing::debug!("Removed last entry, collection deleted");
            return Ok(Some(previous));
        }

        if table.bucket_count() > 1 {
            let neighbour = merge_candidate(&table, index);

            if table.count(index) + table.count(neighbour) <= self.config.min_compaction_bucket_size
            {
                self.merge_buckets(&table_key, &table, index, neighbour, bucket)
                    .await?;
                return Ok(Some(previous));
            }
        }

        self.write_bucket(bucket_id, bucket).await?;
        self.write_table(&table_key, table).await?;

        Ok(Some(previous))
    }

    /// Deletes the collection named `key` and all of its buckets.
    ///
    /// Returns whether the collection existed.
    pub async fn remove_collection(&self, key: &K) -> Result<bool> {
        let table_key = collection_key(key)?;

        match self.read_table(&table_key).await? {
            Some(table) => self.delete_collection(&table_key, &table).await,
            None => Ok(false),
        }
    }

    pub async fn get(&self, key: &K, secondary_key: &SK) -> Result<Option<V>> {
        let Some(bucket_id) = self.bucket_id(key, secondary_key).await? else {
            return Ok(None);
        };

        let mut bucket = self.resolve_bucket(bucket_id).await?;
        Ok(bucket.remove(secondary_key))
    }

    pub async fn contains(&self, key: &K, secondary_key: &SK) -> Result<bool> {
        let Some(bucket_id) = self.bucket_id(key, secondary_key).await? else {
            return Ok(false);
        };

        let bucket = self.resolve_bucket(bucket_id).await?;
        Ok(bucket.contains_key(secondary_key))
    }

    /// Every entry of the collection named `key`.
    ///
    /// Reads every bucket, so the cost grows with the bucket count. For bulk processing
    /// prefer `bucket_ids` + `values_by_bucket_id`, which can be spread across workers.
    pub async fn values(&self, key: &K) -> Result<HashMap<SK, V>> {
        let table_key = collection_key(key)?;

        let Some(table) = self.read_table(&table_key).await? else {
            return Ok(HashMap::new());
        };

        let mut values = Bucket::new();
        for &bucket_id in table.bucket_ids() {
            values.absorb(self.resolve_bucket(bucket_id).await?);
        }

        Ok(values.into_entries())
    }

    /// The entries of a single bucket, following redirects if it has been retired.
    pub async fn values_by_bucket_id(&self, bucket_id: BucketId) -> Result<HashMap<SK, V>> {
        Ok(self.resolve_bucket(bucket_id).await?.into_entries())
    }

    /// Bucket ids of the current partition table, in hash order. Empty if the collection
    /// does not exist.
    pub async fn bucket_ids(&self, key: &K) -> Result<Vec<BucketId>> {
        let table_key = collection_key(key)?;

        Ok(self
            .read_table(&table_key)
            .await?
            .map(|table| table.bucket_ids().to_vec())
            .unwrap_or_default())
    }

    /// The bucket that `secondary_key` would live in, according to the current table.
    ///
    /// Does not check that the entry exists and does not follow redirects: the id may
    /// already have been retired by the time the caller uses it.
    pub async fn bucket_id(&self, key: &K, secondary_key: &SK) -> Result<Option<BucketId>> {
        let table_key = collection_key(key)?;

        Ok(self.read_table(&table_key).await?.map(|table| {
            let index = table.index_of(placement_hash(secondary_key));
            table.bucket_id(index)
        }))
    }

    /// Number of entries in the collection named `key`, as recorded in its table.
    pub async fn len(&self, key: &K) -> Result<usize> {
        let table_key = collection_key(key)?;

        Ok(self
            .read_table(&table_key)
            .await?
            .map(|table| table.total_size())
            .unwrap_or(0))
    }

    pub async fn partition_table(&self, key: &K) -> Result<Option<PartitionTable>> {
        self.read_table(&collection_key(key)?).await
    }

    async fn split_bucket(
        &self,
        table_key: &[u8],
        mut table: PartitionTable,
        index: usize,
        retired: BucketId,
        bucket: Bucket<SK, V>,
    ) -> Result<()> {
        let split_point = *table.range_of(index + 1).start();
        let (left, right) = bucket.split_by(|key| placement_hash(key) < split_point);

        table.set_count(index, left.len());
        table.set_count(index + 1, right.len());
        let left_id = table.bucket_id(index);
        let right_id = table.bucket_id(index + 1);

        tracing::debug!(
            "Splitting bucket {} at {}: {} ({} entries), {} ({} entries)",
            retired,
            split_point,
            left_id,
            left.len(),
            right_id,
            right.len()
        );

        self.write_bucket(left_id, left).await?;
        self.write_bucket(right_id, right).await?;
        // Overwrites the retired bucket. Readers still holding the old table follow it
        // to the two halves.
        self.write_transfer(retired, vec![left_id, right_id]).await?;
        self.write_table(table_key, table).await
    }

    async fn merge_buckets(
        &self,
        table_key: &[u8],
        table: &PartitionTable,
        index: usize,
        neighbour: usize,
        bucket: Bucket<SK, V>,
    ) -> Result<()> {
        let first = index.min(neighbour);
        let mut merged_table = table.merge_up(first, &self.ids).ok_or_else(|| {
            anyhow::anyhow!("Cannot merge range {} of a {}-range table", first, table.bucket_count())
        })?;

        let retired = table.bucket_id(index);
        let neighbour_id = table.bucket_id(neighbour);
        let merged_id = merged_table.bucket_id(first);

        let mut merged = Bucket::new();
        merged.absorb(bucket);
        if let Some(neighbour_bucket) = self.fetch_live_bucket(neighbour_id).await? {
            merged.absorb(neighbour_bucket);
        }
        merged_table.set_count(first, merged.len());

        tracing::debug!(
            "Merging buckets {} and {} into {} ({} entries)",
            retired,
            neighbour_id,
            merged_id,
            merged.len()
        );

        self.write_bucket(merged_id, merged).await?;
        self.write_transfer(retired, vec![merged_id]).await?;
        self.write_transfer(neighbour_id, vec![merged_id]).await?;
        self.write_table(table_key, merged_table).await
    }

    async fn delete_collection(&self, table_key: &[u8], table: &PartitionTable) -> Result<bool> {
        for &bucket_id in table.bucket_ids() {
            self.store.remove(&bucket_key(bucket_id)?).await?;
        }

        self.store.remove(table_key).await
    }

    /// Collects the entries reachable from `root`, following transfer records.
    ///
    /// Chains can be arbitrarily long: every split/merge of a range within one transfer
    /// expiry adds to them. Ids are never reused, so a visited id is simply skipped.
    ///
    /// A missing record contributes nothing: either the collection was deleted or the
    /// redirect expired before this read reached it.
    async fn resolve_bucket(&self, root: BucketId) -> Result<Bucket<SK, V>> {
        let mut resolved = Bucket::new();
        let mut visited = HashSet::new();
        let mut pending = vec![root];

        while let Some(bucket_id) = pending.pop() {
            if !visited.insert(bucket_id) {
                continue;
            }

            match self.read_bucket_record(bucket_id).await? {
                Some(StoredRecord::Bucket(bucket)) => resolved.absorb(bucket),
                Some(StoredRecord::Transfer(transfer)) => {
                    tracing::trace!(
                        "Bucket {} redirects to {:?}",
                        bucket_id,
                        transfer.targets()
                    );
                    pending.extend_from_slice(transfer.targets());
                }
                Some(StoredRecord::Table(_)) => {
                    anyhow::bail!("Partition table stored under bucket id {}", bucket_id)
                }
                None => tracing::trace!("Bucket {} not found", bucket_id),
            }
        }

        Ok(resolved)
    }

    /// Reads a bucket referenced by the current table, for mutation.
    ///
    /// Finding a transfer record here means a bucket of the current table has already
    /// been retired, which only happens if two mutations of the same key overlapped.
    async fn fetch_live_bucket(&self, bucket_id: BucketId) -> Result<Option<Bucket<SK, V>>> {
        match self.read_bucket_record(bucket_id).await? {
            Some(StoredRecord::Bucket(bucket)) => Ok(Some(bucket)),
            Some(StoredRecord::Transfer(_)) => Err(anyhow::anyhow!(
                "Bucket {} of the current table has been retired; mutations of this key overlapped",
                bucket_id
            )),
            Some(StoredRecord::Table(_)) => Err(anyhow::anyhow!(
                "Partition table stored under bucket id {}",
                bucket_id
            )),
            None => Ok(None),
        }
    }

    async fn read_table(&self, table_key: &[u8]) -> Result<Option<PartitionTable>> {
        let Some(bytes) = self.store.get(table_key).await? else {
            return Ok(None);
        };

        match decode_record::<SK, V>(&bytes)? {
            StoredRecord::Table(table) => Ok(Some(table)),
            _ => Err(anyhow::anyhow!(
                "Record stored under a collection key is not a partition table"
            )),
        }
    }

    async fn read_bucket_record(&self, bucket_id: BucketId) -> Result<Option<StoredRecord<SK, V>>> {
        let Some(bytes) = self.store.get(&bucket_key(bucket_id)?).await? else {
            return Ok(None);
        };

        Ok(Some(decode_record(&bytes)?))
    }

    async fn write_table(&self, table_key: &[u8], table: PartitionTable) -> Result<()> {
        let record = StoredRecord::<SK, V>::Table(table);
        self.store.put(table_key, encode_record(&record)?).await
    }

    async fn write_bucket(&self, bucket_id: BucketId, bucket: Bucket<SK, V>) -> Result<()> {
        let record = StoredRecord::Bucket(bucket);
        self.store
            .put(&bucket_key(bucket_id)?, encode_record(&record)?)
            .await
    }

    async fn write_transfer(&self, retired: BucketId, targets: Vec<BucketId>) -> Result<()> {
        let record = StoredRecord::<SK, V>::Transfer(TransferRecord::new(targets));
        self.store
            .put_with_expiry(
                &bucket_key(retired)?,
                encode_record(&record)?,
                self.config.transfer_expire(),
            )
            .await
    }
}

/// Neighbour of `index` that a merge would join it with: the only neighbour at either
/// end of the table, otherwise the one with fewer entries (right on a tie).
fn merge_candidate(table: &PartitionTable, index: usize) -> usize {
    let last = table.bucket_count() - 1;

    if index == 0 {
        index + 1
    } else if index == last {
        index - 1
    } else if table.count(index - 1) < table.count(index + 1) {
        index - 1
    } else {
        index + 1
    }
}
