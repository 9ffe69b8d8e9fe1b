//! Durable string-keyed storage for tracker state.
//!
//! The tracker never assumes transactions: each key is read and written on
//! its own, and a single-key write is the only atomicity guarantee.

pub mod file;
pub mod keys;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use file::JsonFileStore;
pub use keys::{StoreError, parse_bool, parse_f64, parse_millis};
pub use memory::MemoryKvStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}
