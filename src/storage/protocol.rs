//! Store Record Protocol
//!
//! Defines how collection records are laid out in the backing store.
//!
//! Keys and values are encoded with `bincode`. Every key is a `StoreKey`, so the top key
//! of a collection and the id of a bucket can share one keyspace without colliding. Every
//! value is a `StoredRecord`, whose variant tag tells a reader which of the three record
//! kinds it found.

use crate::bucket::partition::PartitionTable;
use crate::bucket::types::{Bucket, BucketId, TransferRecord};

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Address of a record in the backing store.
#[derive(Debug, Serialize)]
pub enum StoreKey<'a, K> {
    /// Root record (partition table) of the collection named by the caller's top key.
    Collection(&'a K),
    /// A bucket, or the transfer record that replaced it.
    Bucket(BucketId),
}

/// A value as stored in the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "SK: Serialize, V: Serialize",
    deserialize = "SK: DeserializeOwned + Eq + Hash, V: DeserializeOwned"
))]
pub enum StoredRecord<SK, V> {
    /// Stored under `StoreKey::Collection`.
    Table(PartitionTable),
    /// Stored under `StoreKey::Bucket` while the bucket id is live.
    Bucket(Bucket<SK, V>),
    /// Stored under `StoreKey::Bucket` once the bucket id has been retired. Always
    /// written with an expiry.
    Transfer(TransferRecord),
}

pub fn collection_key<K: Serialize>(key: &K) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&StoreKey::Collection(key))?)
}

pub fn bucket_key(id: BucketId) -> Result<Vec<u8>> {
    Ok(bincode::serialize(&StoreKey::<()>::Bucket(id))?)
}

pub fn encode_record<SK, V>(record: &StoredRecord<SK, V>) -> Result<Vec<u8>>
where
    SK: Serialize,
    V: Serialize,
{
    Ok(bincode::serialize(record)?)
}

pub fn decode_record<SK, V>(bytes: &[u8]) -> Result<StoredRecord<SK, V>>
where
    SK: DeserializeOwned + Eq + Hash,
    V: DeserializeOwned,
{
    Ok(bincode::deserialize(bytes)?)
}
