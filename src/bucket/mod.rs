//! Bucket & Partition Module
//!
//! The value types that make up one collection in the backing store.
//!
//! ## Core Concepts
//! - **Placement Hash**: Secondary keys are mapped onto the signed 32-bit hash space with a
//!   hash that every node computes identically, so all nodes agree on which range owns a key.
//! - **Partition Table**: The root record of a collection. It splits the hash space into
//!   contiguous ranges, each owned by one bucket, and is replaced wholesale on every split/merge.
//! - **Buckets**: Leaf records holding the actual `secondary key -> value` entries of one range.
//! - **Transfer Records**: Short-lived redirects left at a retired bucket id, pointing readers
//!   that still hold an old partition table at the buckets that replaced it.
//! - **Bucket Ids**: Never reused. Every structural change mints fresh ids from a
//!   `BucketIdGenerator`.

pub mod hash;
pub mod id;
pub mod partition;
pub mod types;

#[cfg(test)]
mod tests;
