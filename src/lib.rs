//! Distributed Multimap Library
//!
//! This library crate stores one-to-many collections (`top key -> {secondary key -> value}`)
//! in a plain key-value store, without any single record growing with the collection.
//! It serves as the foundation for the demo binary (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of three layers:
//!
//! - **`bucket`**: The data model. Placement hashing of secondary keys, bucket ids, buckets,
//!   transfer records and the partition table that maps hash ranges to buckets.
//! - **`storage`**: The backing store abstraction (`KeyValueStore`), an in-memory
//!   implementation with per-entry expiry, and the binary layout of stored records.
//! - **`collection`**: The multimap itself (`CollectionStore`). Splits and merges buckets
//!   as collections grow and shrink, and keeps lock-free readers consistent while doing so.

pub mod bucket;
pub mod collection;
pub mod storage;
