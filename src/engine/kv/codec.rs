//! Record codec for owner-scoped keys
//!
//! Keys have the shape `<prefix><ownerId>:<recordId>`. They are split on the
//! first colon, so record ids may themselves contain colons.

use std::fmt;

use crate::engine::error::{BridgeError, Result};
use crate::engine::model::Action;

/// Structured form of a raw key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKey {
    pub prefix: String,
    pub owner_id: String,
    pub record_id: String,
}

/// Per-relation key encoding
pub trait KeyCodec: Send + Sync + fmt::Debug {
    /// Leading part of every key owned by `owner_id`, separator included
    fn owner_scope(&self, owner_id: &str) -> String;

    fn encode(&self, owner_id: &str, record_id: &str) -> String {
        format!("{}{}", self.owner_scope(owner_id), record_id)
    }

    fn decode_key(&self, raw: &str) -> Result<StoredKey>;

    /// Record id without validating the owner part
    fn record_id<'k>(&self, raw: &'k str) -> Option<&'k str> {
        raw.split_once(':').map(|(_, id)| id)
    }
}

/// Keys prefixed with a fixed literal followed by the owner id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerPrefixCodec {
    prefix: String,
}

impl OwnerPrefixCodec {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    /// Prefix on its own, e.g. `user` + owner id
    pub fn encode_owner_prefix(&self, owner_id: &str) -> String {
        format!("{}{}", self.prefix, owner_id)
    }
}

impl Default for OwnerPrefixCodec {
    fn default() -> Self {
        Self::new("user")
    }
}

impl KeyCodec for OwnerPrefixCodec {
    fn owner_scope(&self, owner_id: &str) -> String {
        format!("{}:", self.encode_owner_prefix(owner_id))
    }

    fn decode_key(&self, raw: &str) -> Result<StoredKey> {
        let (scope, record_id) = raw
            .split_once(':')
            .ok_or_else(|| BridgeError::MalformedKey(format!("{} has no ':' separator", raw)))?;

        let owner_id = scope.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
            BridgeError::MalformedKey(format!("{} does not start with {}", raw, self.prefix))
        })?;

        if record_id.is_empty() {
            return Err(BridgeError::MalformedKey(format!("{} has an empty record id", raw)));
        }

        Ok(StoredKey {
            prefix: self.prefix.clone(),
            owner_id: owner_id.to_string(),
            record_id: record_id.to_string(),
        })
    }
}

/// Turn one raw entry into an [`Action`]
pub fn decode(codec: &dyn KeyCodec, key: &str, value: &str) -> Result<Action> {
    let stored = codec.decode_key(key)?;
    Ok(Action {
        id: stored.record_id,
        description: value.to_string(),
    })
}
