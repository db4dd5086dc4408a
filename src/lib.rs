//! BridgeDB - Cross-store relationship bridging
//!
//! Resolves relations whose parent lives in a SQL store and whose targets
//! live in a flat key-value store.

pub mod engine;

pub use engine::database::Database;
pub use engine::error::{BridgeError, Result};
pub use engine::hybrid::{Federation, FilterExpression, Multiplexer, Predicate};
pub use engine::model::{Action, Entity, EntityType, User};
