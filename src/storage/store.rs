use anyhow::Result;
use std::future::Future;
use std::time::Duration;

/// Client of the distributed key-value store that holds every collection record.
///
/// Implementations must be strongly consistent: a completed `put` is visible to every
/// later `get` on any node. Entries written with `put_with_expiry` disappear on their own
/// once `ttl` has elapsed; collections never remove them explicitly.
///
/// Failures (node unreachable, timeouts, ...) are returned as-is and propagate to the
/// caller of the collection operation unchanged.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    /// Unconditional overwrite. Clears any expiry the previous entry had.
    fn put(&self, key: &[u8], value: Vec<u8>) -> impl Future<Output = Result<()>> + Send;

    fn put_with_expiry(
        &self,
        key: &[u8],
        value: Vec<u8>,
        ttl: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Removes `key`, returning whether a live entry was present.
    fn remove(&self, key: &[u8]) -> impl Future<Output = Result<bool>> + Send;
}
