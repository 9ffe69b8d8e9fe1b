use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::KvStore;

/// Process-local store.  Useful for tests and for running without a data dir.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("dailyGoal").await.unwrap(), None);

        store.set("dailyGoal", "2.5").await.unwrap();
        assert_eq!(store.get("dailyGoal").await.unwrap().as_deref(), Some("2.5"));

        store.set("dailyGoal", "3").await.unwrap();
        assert_eq!(store.get("dailyGoal").await.unwrap().as_deref(), Some("3"));

        store.remove("dailyGoal").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn remove_many_ignores_missing_keys() {
        let store = MemoryKvStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();
        store.set("keep", "3").await.unwrap();

        store.remove_many(&["a", "b", "never-set"]).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("keep").await.unwrap().as_deref(), Some("3"));
    }
}
