//! Scan-and-filter fetch
//!
//! One `hgetall` per call, a key predicate over the result, then decoding of
//! the survivors. Result order is whatever the store iterates in.

use std::sync::Arc;

use tracing::debug;

use super::codec::{self, KeyCodec};
use super::storage::KeyValueStore;
use crate::engine::error::Result;
use crate::engine::model::Action;

/// Stateless fetcher over a shared key-value connection
#[derive(Clone)]
pub struct FetchEngine {
    store: Arc<dyn KeyValueStore>,
    codec: Arc<dyn KeyCodec>,
}

impl FetchEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, codec: Arc<dyn KeyCodec>) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &dyn KeyCodec {
        self.codec.as_ref()
    }

    /// Decode every entry under `namespace` whose raw key satisfies `keep`.
    ///
    /// A surviving entry with a malformed key fails the whole fetch.
    pub fn fetch<F>(&self, namespace: &str, keep: F) -> Result<Vec<Action>>
    where
        F: Fn(&str) -> bool,
    {
        let hash = self.store.hgetall(namespace)?;
        let scanned = hash.len();

        let actions = hash
            .iter()
            .filter(|(key, _)| keep(key))
            .map(|(key, value)| codec::decode(self.codec.as_ref(), key, value))
            .collect::<Result<Vec<_>>>()?;

        debug!(namespace, scanned, matched = actions.len(), "kv scan");
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::BridgeError;
    use crate::engine::kv::codec::OwnerPrefixCodec;
    use crate::engine::kv::storage::MemoryKvStore;

    fn engine_with(entries: &[(&str, &str)]) -> FetchEngine {
        let store = MemoryKvStore::new();
        for (k, v) in entries {
            store.hset("actions", k, v).unwrap();
        }
        FetchEngine::new(Arc::new(store), Arc::new(OwnerPrefixCodec::default()))
    }

    #[test]
    fn test_fetch_all_and_filtered() {
        let engine = engine_with(&[("userA1:r1", "buy milk"), ("userA2:r2", "walk dog")]);

        let mut all = engine.fetch("actions", |_| true).unwrap();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(all, vec![Action::new("r1", "buy milk"), Action::new("r2", "walk dog")]);

        let scoped = engine.fetch("actions", |k| k.starts_with("userA2:")).unwrap();
        assert_eq!(scoped, vec![Action::new("r2", "walk dog")]);

        assert!(engine.fetch("actions", |_| false).unwrap().is_empty());
        assert!(engine.fetch("missing", |_| true).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_survivor_fails_fetch() {
        let engine = engine_with(&[("userA1:r1", "buy milk"), ("garbage", "???")]);

        let err = engine.fetch("actions", |_| true).unwrap_err();
        assert!(matches!(err, BridgeError::MalformedKey(_)));

        // filtered out before decoding
        let ok = engine.fetch("actions", |k| k.starts_with("userA1:")).unwrap();
        assert_eq!(ok.len(), 1);
    }
}
