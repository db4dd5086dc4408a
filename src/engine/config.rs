//! BridgeDB Configuration Module
//! Handles loading and validating bridge.config.json

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use super::database::Database;
use super::error::Result as BridgeResult;
use super::hybrid::multiplex::Federation;
use super::hybrid::relations::BridgeDef;
use super::kv::{JsonFileKvStore, OwnerPrefixCodec};
use super::model::EntityType;

pub const CONFIG_FILE: &str = "bridge.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Invalid config format: {0}")]
    ParseError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub project: ProjectConfig,
    pub database: DatabaseConfig,
    pub kv: KvConfig,
    #[serde(default)]
    pub bridges: Vec<BridgeDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvConfig {
    pub path: PathBuf,
    #[serde(default = "default_owner_prefix")]
    pub owner_prefix: String,
    #[serde(default = "default_owner_field")]
    pub owner_field: String,
}

fn default_owner_prefix() -> String {
    "user".to_string()
}

fn default_owner_field() -> String {
    "user_id".to_string()
}

impl Config {
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Err(ConfigError::NotFound(config_path));
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, project_dir: &Path) -> Result<(), ConfigError> {
        let config_path = project_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn default_for_project(name: &str) -> Self {
        Self {
            version: "0.1.0".to_string(),
            project: ProjectConfig {
                name: name.to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("./data/bridge.db"),
            },
            kv: KvConfig {
                path: PathBuf::from("./data/kv"),
                owner_prefix: default_owner_prefix(),
                owner_field: default_owner_field(),
            },
            bridges: vec![
                BridgeDef::DirectId {
                    parent: EntityType::User,
                    relation: "specialAction".to_string(),
                    parent_field: "special_action_id".to_string(),
                },
                BridgeDef::OwnerScoped {
                    parent: EntityType::User,
                    relation: "redisActions".to_string(),
                },
            ],
        }
    }

    /// Open both stores under `project_dir` and validate the bridges
    pub fn open_federation(&self, project_dir: &Path) -> BridgeResult<Federation> {
        let db = Database::new(&project_dir.join(&self.database.path))?;
        let kv = JsonFileKvStore::open(&project_dir.join(&self.kv.path))?;
        Federation::new(
            db,
            Arc::new(kv),
            Arc::new(OwnerPrefixCodec::new(&self.kv.owner_prefix)),
            &self.kv.owner_field,
            &self.bridges,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip_and_defaults() {
        let dir = tempdir().unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::NotFound(_))));

        Config::default_for_project("demo").save(dir.path()).unwrap();
        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.project.name, "demo");
        assert_eq!(loaded.bridges.len(), 2);

        let federation = loaded.open_federation(dir.path()).unwrap();
        assert_eq!(federation.kv().bridges().len(), 2);
    }

    #[test]
    fn test_kv_defaults_when_omitted() {
        let config: Config = serde_json::from_str(
            r#"{
                "version": "0.1.0",
                "project": {"name": "demo"},
                "database": {"path": "./data/bridge.db"},
                "kv": {"path": "./data/kv"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.kv.owner_prefix, "user");
        assert_eq!(config.kv.owner_field, "user_id");
        assert!(config.bridges.is_empty());
    }
}
