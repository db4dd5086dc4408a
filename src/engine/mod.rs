// BridgeDB Engine - Core module structure
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod hybrid;
pub mod kv;
pub mod model;
pub mod sql;
pub mod store;

pub use config::Config;
pub use database::Database;
pub use error::BridgeError;
