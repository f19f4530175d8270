use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tuning of one collection.
///
/// Loaded from JSON with every field optional; missing fields take the defaults
/// (`50` / `10` / `100` ms).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// A bucket whose count has reached this value is split on the next insert of a new key.
    pub max_bucket_size: usize,
    /// After a removal, a bucket is merged with its smaller neighbour when their combined
    /// count is at or below this value.
    pub min_compaction_bucket_size: usize,
    /// Lifetime of the transfer records left behind by splits and merges.
    ///
    /// Must exceed the longest time a reader can keep using a partition table it has
    /// already fetched. A reader that outlives it can land on an expired redirect and
    /// see part of the collection missing.
    pub transfer_expire_millis: u64,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_bucket_size: 50,
            min_compaction_bucket_size: 10,
            transfer_expire_millis: 100,
        }
    }
}

impl CollectionConfig {
    pub fn new(
        max_bucket_size: usize,
        min_compaction_bucket_size: usize,
        transfer_expire_millis: u64,
    ) -> Self {
        Self {
            max_bucket_size,
            min_compaction_bucket_size,
            transfer_expire_millis,
        }
    }

    pub fn transfer_expire(&self) -> Duration {
        Duration::from_millis(self.transfer_expire_millis)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.max_bucket_size >= 1,
            "max_bucket_size must be at least 1"
        );
        anyhow::ensure!(
            self.transfer_expire_millis >= 1,
            "transfer_expire_millis must be at least 1"
        );
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json_str(&json).with_context(|| format!("Invalid config {}", path.display()))
    }
}
