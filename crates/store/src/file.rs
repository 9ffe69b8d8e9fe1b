//! JSON-file backed store.
//!
//! The whole map lives in one JSON object.  Every read goes back to disk so a
//! write made by another process (e.g. a notification action handled while no
//! UI is running) is visible immediately.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use fs2::FileExt;

use crate::KvStore;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let filename = self
            .path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "store.json".to_string());
        self.path.with_file_name(format!("{filename}.{suffix}"))
    }

    /// Advisory lock shared by every process touching this store.
    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(self.sibling("lock"))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("store file {} is not a JSON object", self.path.display()))
    }

    /// Write to a `.tmp` sibling, fsync, then rename over the original.  A
    /// crash before the rename leaves the previous file untouched.
    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let tmp_path = self.sibling("tmp");
        let write_result: Result<()> = (|| {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
            file.flush()?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// File access and the advisory lock both block, so they run on the
    /// blocking pool rather than an executor thread.
    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(JsonFileStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(store))
            .await
            .map_err(|e| anyhow!("store task panicked: {e}"))?
    }

    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let lock = self.lock()?;
        let mut map = self.read_map()?;
        let result = if mutate(&mut map) {
            self.write_map(&map)
        } else {
            Ok(())
        };
        lock.unlock()?;
        result
    }
}

#[async_trait]
impl KvStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |store| Ok(store.read_map()?.remove(&key))).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.blocking(move |store| {
            store.update(|map| {
                map.insert(key, value);
                true
            })
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |store| store.update(|map| map.remove(&key).is_some()))
            .await
    }

    async fn remove_many(&self, keys: &[&str]) -> Result<()> {
        let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        self.blocking(move |store| {
            store.update(|map| {
                let before = map.len();
                for key in &keys {
                    map.remove(key);
                }
                map.len() != before
            })
        })
        .await
    }
}
