//! In-process store. Nothing survives a restart.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{SeenEntry, Store, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    karma: DashMap<String, i64>,
    dictionary: DashMap<String, String>,
    history: DashMap<String, SeenEntry>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn karma(&self, name: &str) -> Result<i64, StoreError> {
        self.check_open()?;
        Ok(self.karma.get(name).map(|v| *v).unwrap_or(0))
    }

    async fn adjust_karma(&self, name: &str, delta: i64) -> Result<i64, StoreError> {
        self.check_open()?;
        let mut entry = self.karma.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(delta);
        Ok(*entry)
    }

    async fn definition(&self, word: &str) -> Result<Option<String>, StoreError> {
        self.check_open()?;
        Ok(self.dictionary.get(word).map(|v| v.clone()))
    }

    async fn define(&self, word: &str, text: &str) -> Result<(), StoreError> {
        self.check_open()?;
        self.dictionary.insert(word.to_string(), text.to_string());
        Ok(())
    }

    async fn record_seen(&self, nick: &str, entry: SeenEntry) -> Result<(), StoreError> {
        self.check_open()?;
        self.history.insert(nick.to_string(), entry);
        Ok(())
    }

    async fn last_seen(&self, nick: &str) -> Result<Option<SeenEntry>, StoreError> {
        self.check_open()?;
        Ok(self.history.get(nick).map(|v| v.clone()))
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
