//! Durable message store contract and in-memory implementation.
//!
//! The real store is an external collaborator; the pipeline depends only on
//! `MessageStore`. `InMemoryMessageStore` backs tests and the stdin driver.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use veritas_core::{MessageRecord, Snowflake, StorageError, Timestamp};

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Selection criteria for history queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub scope_id: Snowflake,
    pub author_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub exclude_bots: bool,
}

impl MessageFilter {
    /// Every message in a scope.
    pub fn scope(scope_id: Snowflake) -> Self {
        Self {
            scope_id,
            author_id: None,
            channel_id: None,
            exclude_bots: false,
        }
    }

    /// One author's messages in a scope.
    pub fn author(author_id: Snowflake, scope_id: Snowflake) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::scope(scope_id)
        }
    }

    pub fn in_channel(mut self, channel_id: Snowflake) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn without_bots(mut self) -> Self {
        self.exclude_bots = true;
        self
    }

    pub fn matches(&self, record: &MessageRecord) -> bool {
        record.scope_id == self.scope_id
            && self.author_id.map_or(true, |a| record.author_id == a)
            && self.channel_id.map_or(true, |c| record.channel_id == c)
            && !(self.exclude_bots && record.is_bot)
    }
}

/// Durable, append-only message store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Insert a message. Inserting an id twice is `StorageError::Duplicate`.
    async fn insert(&self, record: &MessageRecord) -> StorageResult<()>;

    /// Most recent matching messages, newest first.
    async fn find_recent(
        &self,
        filter: &MessageFilter,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>>;

    /// Number of matching messages.
    async fn count(&self, filter: &MessageFilter) -> StorageResult<usize>;

    /// Messages created before `cutoff`, oldest first, at most `limit`.
    async fn find_older_than(
        &self,
        cutoff: Timestamp,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>>;

    /// Delete messages by id. Returns how many existed.
    async fn delete_many(&self, ids: &[Snowflake]) -> StorageResult<usize>;
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

/// In-memory message store keyed by snowflake.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<BTreeMap<Snowflake, MessageRecord>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: Snowflake) -> bool {
        self.messages
            .read()
            .map(|m| m.contains_key(&id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, record: &MessageRecord) -> StorageResult<()> {
        let mut messages = self.messages.write().map_err(|_| StorageError::LockPoisoned)?;
        if messages.contains_key(&record.id) {
            return Err(StorageError::Duplicate { id: record.id });
        }
        messages.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_recent(
        &self,
        filter: &MessageFilter,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>> {
        let messages = self.messages.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut matching: Vec<&MessageRecord> =
            messages.values().filter(|m| filter.matches(m)).collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(matching.into_iter().take(limit).cloned().collect())
    }

    async fn count(&self, filter: &MessageFilter) -> StorageResult<usize> {
        let messages = self.messages.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(messages.values().filter(|m| filter.matches(m)).count())
    }

    async fn find_older_than(
        &self,
        cutoff: Timestamp,
        limit: usize,
    ) -> StorageResult<Vec<MessageRecord>> {
        let messages = self.messages.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut old: Vec<&MessageRecord> =
            messages.values().filter(|m| m.created_at < cutoff).collect();
        old.sort_by_key(|m| (m.created_at, m.id));
        Ok(old.into_iter().take(limit).cloned().collect())
    }

    async fn delete_many(&self, ids: &[Snowflake]) -> StorageResult<usize> {
        let mut messages = self.messages.write().map_err(|_| StorageError::LockPoisoned)?;
        Ok(ids.iter().filter(|id| messages.remove(*id).is_some()).count())
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================
