use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map;
use std::fmt;
use std::hash::Hash;

/// Identifier of one physical bucket record.
///
/// Made of the instance stamp of the generator that minted it and that generator's
/// sequence number. Ids are never reused: a split or merge always retires the old ids
/// and mints new ones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId {
    pub instance: u64,
    pub sequence: u64,
}

impl BucketId {
    pub fn new(instance: u64, sequence: u64) -> Self {
        Self { instance, sequence }
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}:{:x}", self.instance, self.sequence)
    }
}

/// The entries of one hash range.
///
/// Updated in place for inserts, overwrites and removals that do not change the
/// partition table; rebuilt under a new id when its range is split or merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "SK: Serialize, V: Serialize",
    deserialize = "SK: DeserializeOwned + Eq + Hash, V: DeserializeOwned"
))]
pub struct Bucket<SK, V> {
    entries: HashMap<SK, V>,
}

impl<SK, V> Bucket<SK, V>
where
    SK: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, key: &SK) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &SK) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: SK, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &SK) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, SK, V> {
        self.entries.iter()
    }

    /// Moves every entry of `other` into this bucket. Entries of `other` win on
    /// duplicate keys.
    pub fn absorb(&mut self, other: Bucket<SK, V>) {
        self.entries.extend(other.entries);
    }

    /// Splits the bucket in two: entries whose key satisfies `goes_left` land in the
    /// first bucket, the rest in the second.
    pub fn split_by<F>(self, mut goes_left: F) -> (Bucket<SK, V>, Bucket<SK, V>)
    where
        F: FnMut(&SK) -> bool,
    {
        let (left, right): (HashMap<SK, V>, HashMap<SK, V>) = self
            .entries
            .into_iter()
            .partition(|(key, _)| goes_left(key));

        (Bucket { entries: left }, Bucket { entries: right })
    }

    pub fn into_entries(self) -> HashMap<SK, V> {
        self.entries
    }
}

impl<SK, V> Default for Bucket<SK, V>
where
    SK: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<SK, V> From<HashMap<SK, V>> for Bucket<SK, V> {
    fn from(entries: HashMap<SK, V>) -> Self {
        Self { entries }
    }
}

/// Redirect left at a retired bucket id during a split or merge.
///
/// The entries that used to live under the retired id now live in the union of
/// `targets`. A target may itself have been retired since, in which case readers
/// follow it further. The store drops the record on its own once its expiry elapses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferRecord {
    targets: Vec<BucketId>,
}

impl TransferRecord {
    pub fn new(targets: Vec<BucketId>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[BucketId] {
        &self.targets
    }
}
