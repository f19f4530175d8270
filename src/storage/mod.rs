//! Backing Store Module
//!
//! The boundary between collections and the distributed key-value store they live in.
//!
//! ## Core Concepts
//! - **Store Contract**: `KeyValueStore` is the only thing a collection needs from the cluster:
//!   strongly consistent get/put/remove, plus puts that the store expires on its own.
//! - **Encoding**: Keys and records cross the boundary as bytes. `protocol` defines how top
//!   keys, bucket ids and the three record kinds are encoded so they can be told apart on read.
//! - **In-Memory Store**: `MemoryStore` is a single-process implementation with per-entry
//!   expiry, used by tests and by embedders that do not need a cluster.

pub mod memory;
pub mod protocol;
pub mod store;
