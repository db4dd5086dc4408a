//! Key-value clients
//!
//! The bridge consumes one operation, [`KeyValueStore::hgetall`]. `hset` is
//! only there so tools and tests can seed data.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;

use super::error::{KvError, Result};

/// A shared connection to a flat hash store
pub trait KeyValueStore: Send + Sync {
    /// Full mapping stored under `namespace`; empty when the namespace is absent
    fn hgetall(&self, namespace: &str) -> Result<HashMap<String, String>>;

    fn hset(&self, namespace: &str, key: &str, value: &str) -> Result<()>;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    hashes: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn hgetall(&self, namespace: &str) -> Result<HashMap<String, String>> {
        let hashes = self.hashes.read().map_err(|_| KvError::Poisoned)?;
        Ok(hashes.get(namespace).cloned().unwrap_or_default())
    }

    fn hset(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut hashes = self.hashes.write().map_err(|_| KvError::Poisoned)?;
        hashes
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One JSON object file per namespace under a base directory
#[derive(Debug, Clone)]
pub struct JsonFileKvStore {
    base_path: PathBuf,
}

impl JsonFileKvStore {
    /// Open a store rooted at `path`, creating the directory if needed
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;
        Ok(Self {
            base_path: path.to_path_buf(),
        })
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", namespace))
    }

    /// Namespaces currently on disk
    pub fn namespaces(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl KeyValueStore for JsonFileKvStore {
    fn hgetall(&self, namespace: &str) -> Result<HashMap<String, String>> {
        let path = self.namespace_path(namespace);
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k, s)),
                    _ => Err(KvError::WrongType(namespace.to_string())),
                })
                .collect(),
            _ => Err(KvError::WrongType(namespace.to_string())),
        }
    }

    fn hset(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let mut hash = self.hgetall(namespace)?;
        hash.insert(key.to_string(), value.to_string());

        let ordered: std::collections::BTreeMap<_, _> = hash.into_iter().collect();
        let content = serde_json::to_string_pretty(&ordered)?;
        fs::write(self.namespace_path(namespace), content)?;
        Ok(())
    }
}
