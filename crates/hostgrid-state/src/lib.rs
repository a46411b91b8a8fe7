//! hostgrid-state — key-value record store for Hostgrid.
//!
//! Backed by [redb](https://docs.rs/redb). Records live in a single table
//! keyed by prefixed strings (`subdomain:acme`, `custom-domain:acme.com`,
//! `domain:acme.com`) with JSON-serialized values.
//!
//! # Consistency
//!
//! Every `set`/`delete` commits its own write transaction, so the store is
//! last-write-wins per key with no cross-key atomicity. Deleting a missing
//! key is a successful no-op.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod kv;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use kv::{KvStore, KvStoreExt};
pub use store::StateStore;
