//! Key-Value Client Error Types

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Namespace {0} does not hold a flat string mapping")]
    WrongType(String),
}

pub type Result<T> = std::result::Result<T, KvError>;
