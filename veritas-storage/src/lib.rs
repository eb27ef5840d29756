//! VERITAS Storage - Message Store and Caches
//!
//! Defines the durable message store abstraction the pipeline reads history
//! from, an in-memory implementation, and the tiered caches that sit in
//! front of it.

pub mod cache;
pub mod store;

pub use cache::{BoundedLruCache, CacheStats, HistoryCache, HistoryKey, TtlCache};
pub use store::{InMemoryMessageStore, MessageFilter, MessageStore, StorageResult};
