use super::types::BucketId;

use std::sync::atomic::{AtomicU64, Ordering};

/// Mints bucket ids that are unique for the lifetime of the process.
///
/// `instance` is drawn once when the generator is created and stamps every id it
/// produces; `sequence` is a monotonic counter. Share one generator (through `Arc`)
/// between every collection that writes into the same store.
#[derive(Debug)]
pub struct BucketIdGenerator {
    instance: u64,
    sequence: AtomicU64,
}

impl BucketIdGenerator {
    /// Creates a generator with a random instance stamp.
    pub fn new() -> Self {
        Self::with_instance(rand::random::<u64>())
    }

    /// Creates a generator with a fixed instance stamp.
    ///
    /// Two generators with the same stamp produce colliding ids, so this is only
    /// meant for tests and for embedders that assign stamps themselves.
    pub fn with_instance(instance: u64) -> Self {
        Self {
            instance,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> BucketId {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        BucketId::new(self.instance, sequence)
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for BucketIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
