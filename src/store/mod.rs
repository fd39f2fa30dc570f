//! Persistent bot state: karma counters, the dictionary behind `define`,
//! and the last line seen from each nick.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{DatabaseConfig, StoreBackend};

pub mod memory;
pub mod redb;

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store is closed")]
    Closed,
}

/// The last line a nick said in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenEntry {
    /// Unix timestamp, seconds.
    pub timestamp: i64,
    pub channel: String,
    pub text: String,
}

impl SeenEntry {
    /// Stamp a new entry with the current time.
    pub fn now(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp(),
            channel: channel.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Current karma for `name`; unknown names are 0.
    async fn karma(&self, name: &str) -> Result<i64, StoreError>;

    /// Add `delta` to `name`'s karma in a single transaction, returning the new value.
    async fn adjust_karma(&self, name: &str, delta: i64) -> Result<i64, StoreError>;

    /// Definition stored for `word`.
    async fn definition(&self, word: &str) -> Result<Option<String>, StoreError>;

    /// Store (or replace) the definition for `word`.
    async fn define(&self, word: &str, text: &str) -> Result<(), StoreError>;

    /// Remember the last thing `nick` said.
    async fn record_seen(&self, nick: &str, entry: SeenEntry) -> Result<(), StoreError>;

    async fn last_seen(&self, nick: &str) -> Result<Option<SeenEntry>, StoreError>;

    /// Release the backing storage. Later calls fail with [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}

/// Open the configured backend.
pub fn open(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend {
        StoreBackend::Redb => {
            info!(path = %config.path, "opening redb store");
            Ok(Arc::new(RedbStore::new(&config.path)?))
        }
        StoreBackend::Memory => {
            info!("using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_backend() {
        let config = DatabaseConfig {
            backend: StoreBackend::Memory,
            path: String::new(),
        };
        let store = open(&config).unwrap();
        assert_eq!(store.adjust_karma("alice", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_redb_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            backend: StoreBackend::Redb,
            path: dir.path().join("ircb.db").to_string_lossy().into_owned(),
        };
        let store = open(&config).unwrap();
        store.define("rust", "a language").await.unwrap();
        assert_eq!(
            store.definition("rust").await.unwrap().as_deref(),
            Some("a language")
        );
        store.close().await.unwrap();
    }
}
