//! Read-through history cache.
//!
//! Holds the most recent messages per (author, scope) and per scope.
//! Sequences are capped (oldest dropped first) and the key set itself is an
//! LRU. A read the cache cannot fully answer falls through to the store and
//! repopulates the sequence.

use super::bounded::BoundedLruCache;
use super::stats::CacheStats;
use crate::store::{MessageFilter, MessageStore, StorageResult};
use std::collections::VecDeque;
use tracing::debug;
use veritas_core::{CacheSettings, MessageRecord, Snowflake};

/// Partition key for cached history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryKey {
    Author { author_id: Snowflake, scope_id: Snowflake },
    Scope { scope_id: Snowflake },
}

impl HistoryKey {
    fn filter(&self) -> MessageFilter {
        match *self {
            Self::Author { author_id, scope_id } => MessageFilter::author(author_id, scope_id),
            Self::Scope { scope_id } => MessageFilter::scope(scope_id),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct HistorySequence {
    /// Oldest at the front, newest at the back.
    messages: VecDeque<MessageRecord>,
    /// True when the store held no more than what is cached at load time,
    /// so a short sequence is still a complete answer.
    exhaustive: bool,
}

impl HistorySequence {
    fn push(&mut self, record: MessageRecord, cap: usize) {
        if self.messages.iter().rev().any(|m| m.id == record.id) {
            return;
        }
        self.messages.push_back(record);
        while self.messages.len() > cap {
            self.messages.pop_front();
            self.exhaustive = false;
        }
    }

    fn can_serve(&self, limit: usize) -> bool {
        self.exhaustive || self.messages.len() >= limit
    }

    fn newest_first(&self, limit: usize) -> Vec<MessageRecord> {
        self.messages.iter().rev().take(limit).cloned().collect()
    }
}

/// Tiered history cache in front of a `MessageStore`.
pub struct HistoryCache {
    sequences: BoundedLruCache<HistoryKey, HistorySequence>,
    author_len: usize,
    scope_len: usize,
}

impl HistoryCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            sequences: BoundedLruCache::new("history", settings.history_max_keys),
            author_len: settings.author_history_len.max(1),
            scope_len: settings.scope_history_len.max(1),
        }
    }

    fn cap_for(&self, key: &HistoryKey) -> usize {
        match key {
            HistoryKey::Author { .. } => self.author_len,
            HistoryKey::Scope { .. } => self.scope_len,
        }
    }

    /// Record a message that has already been written to the store.
    ///
    /// Only sequences already loaded are extended; an absent key stays
    /// absent so the next read loads it from the store in full.
    pub fn record(&self, record: &MessageRecord) {
        let keys = [
            HistoryKey::Author {
                author_id: record.author_id,
                scope_id: record.scope_id,
            },
            HistoryKey::Scope {
                scope_id: record.scope_id,
            },
        ];
        for key in keys {
            let cap = self.cap_for(&key);
            self.sequences
                .update(&key, |seq| seq.push(record.clone(), cap));
        }
    }

    /// Most recent messages by `author_id` in `scope_id`, newest first.
    pub async fn author_history(
        &self,
        store: &dyn MessageStore,
        author_id: Snowflake,
        scope_id: Snowflake,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>> {
        self.read(store, HistoryKey::Author { author_id, scope_id }, limit)
            .await
    }

    /// Most recent messages in `scope_id`, newest first.
    pub async fn scope_history(
        &self,
        store: &dyn MessageStore,
        scope_id: Snowflake,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>> {
        self.read(store, HistoryKey::Scope { scope_id }, limit).await
    }

    async fn read(
        &self,
        store: &dyn MessageStore,
        key: HistoryKey,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>> {
        let cap = self.cap_for(&key);

        if limit <= cap {
            if let Some(seq) = self.sequences.get(&key) {
                if seq.can_serve(limit) {
                    return Ok(seq.newest_first(limit));
                }
            }
        }

        let fetch = limit.max(cap);
        let loaded = store.find_recent(&key.filter(), fetch).await?;
        debug!(?key, fetched = loaded.len(), "history cache fill from store");

        let mut seq = HistorySequence {
            messages: VecDeque::with_capacity(cap),
            exhaustive: loaded.len() < fetch,
        };
        for record in loaded.iter().take(cap).rev() {
            seq.messages.push_back(record.clone());
        }
        if loaded.len() > cap {
            seq.exhaustive = false;
        }
        self.sequences.put(key, seq);

        Ok(loaded.into_iter().take(limit).collect())
    }

    /// Drop cached history for an author in a scope and for the scope itself.
    pub fn invalidate(&self, author_id: Snowflake, scope_id: Snowflake) {
        self.sequences
            .remove(&HistoryKey::Author { author_id, scope_id });
        self.sequences.remove(&HistoryKey::Scope { scope_id });
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.sequences.stats()
    }
}

impl std::fmt::Debug for HistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCache")
            .field("keys", &self.len())
            .field("author_len", &self.author_len)
            .field("scope_len", &self.scope_len)
            .finish()
    }
}
