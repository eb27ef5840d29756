//! Tiered in-memory caches.
//!
//! - [`BoundedLruCache`]: plain LRU with a hard entry cap (validation verdicts).
//! - [`TtlCache`]: LRU with per-entry TTL and batch eviction of the oldest
//!   entries on overflow (content analysis).
//! - [`HistoryCache`]: read-through per-author and per-scope message history.
//!
//! Every cache enforces its cap on every insert and degrades to a miss when
//! its lock is poisoned.

pub mod bounded;
pub mod history;
pub mod stats;
pub mod ttl;

pub use bounded::BoundedLruCache;
pub use history::{HistoryCache, HistoryKey};
pub use stats::CacheStats;
pub use ttl::TtlCache;
