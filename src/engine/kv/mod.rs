//! Key-value side of the bridge
//!
//! Records live as flat hashes, one per namespace key. Reads are full
//! scans filtered on the raw key; nothing is ever written back.

pub mod codec;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod transaction;

pub use codec::{KeyCodec, OwnerPrefixCodec, StoredKey};
pub use error::KvError;
pub use fetch::FetchEngine;
pub use storage::{JsonFileKvStore, KeyValueStore, MemoryKvStore};
pub use transaction::{KvDataStore, KvTransaction};
