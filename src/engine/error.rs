//! Bridge Error Types

use thiserror::Error;

use super::database::DatabaseError;
use super::kv::KvError;
use super::model::EntityType;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Tried to load unexpected object: {0}")]
    UnexpectedType(EntityType),

    #[error("Unsupported filter shape: {0} expressions cannot be evaluated")]
    UnsupportedFilterShape(&'static str),

    #[error("Unsupported bridging attempted from {parent} via relation {relation}")]
    UnsupportedBridge { parent: String, relation: String },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Invalid bridge configuration: {0}")]
    Config(String),

    #[error("Key-value store error: {0}")]
    Store(#[from] KvError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
