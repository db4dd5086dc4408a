//! Hybrid SQL/Key-Value Module
//!
//! Filter translation, relation metadata and cross-store multiplexing

pub mod filter;
pub mod multiplex;
pub mod relations;

pub use filter::{translate, FilterExpression, FilterOp, Predicate};
pub use multiplex::{Federation, Multiplexer};
pub use relations::{BridgeDef, BridgeStrategy, BridgeTable, EngineType, EntityDictionary, StaticDictionary};
