//! One-to-Many Collection Module
//!
//! Implements a collection that maps one top key to an unbounded number of
//! `secondary key -> value` entries, stored as many small records instead of one
//! ever-growing record.
//!
//! ## Architecture Overview
//! 1. **Root**: Each top key has a `PartitionTable` record splitting the placement-hash space
//!    into ranges, one bucket per range.
//! 2. **Writes**: A mutation hashes the secondary key, finds its range and updates that bucket.
//!    Overfull buckets are split in two, nearly empty neighbours are merged.
//! 3. **Redirects**: A split or merge leaves a `TransferRecord` at each retired bucket id, so a
//!    reader still holding the previous table is sent to the buckets that replaced it.
//! 4. **Ordering**: New buckets are written before the redirect, and the redirect before the
//!    new table. Readers therefore need no locks to see a complete collection.
//!
//! Mutations of one top key must be serialized by the caller (a cluster-wide lock on the top
//! key). Reads can run at any time.
//!
//! ## Submodules
//! - **`config`**: Split/merge thresholds and the redirect lifetime.
//! - **`store`**: `CollectionStore`, the put/remove/get/scan operations.

pub mod config;
pub mod store;
