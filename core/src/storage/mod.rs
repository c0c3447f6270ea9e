//! Three-layer storage model (§4.1): [`KeyValueStore`] on disk, [`Cache`]
//! tracking dirtiness above it, [`Staging`] as a disposable scratch layer
//! above that for speculative state transitions.

pub mod cache;
pub mod columns;
pub mod kv;
pub mod staging;

pub use cache::{Cache, CacheEntry};
pub use columns::Column;
pub use kv::{BatchOp, KeyValueStore, WriteBatch};
pub use staging::Staging;
