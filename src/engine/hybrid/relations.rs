//! Cross-engine relation metadata
//!
//! The entity dictionary records which engine owns each entity type and
//! which type every declared relation points at. The bridge table maps a
//! (parent type, relation name) pair onto the lookup strategy the
//! key-value side uses to resolve it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::engine::error::{BridgeError, Result};
use crate::engine::model::EntityType;

/// Backing engine type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EngineType {
    Sql,
    Kv,
}

/// Type metadata consulted while resolving relations
pub trait EntityDictionary: Send + Sync {
    fn bind_entity(&mut self, entity_type: EntityType, engine: EngineType);

    fn bind_relation(&mut self, parent: EntityType, relation: &str, target: EntityType);

    /// Engine owning `entity_type`, if bound
    fn engine_of(&self, entity_type: EntityType) -> Option<EngineType>;

    /// Target type of `parent.relation`, if declared
    fn parameterized_type(&self, parent: EntityType, relation: &str) -> Option<EntityType>;
}

/// Dictionary populated once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticDictionary {
    engines: HashMap<EntityType, EngineType>,
    relations: HashMap<(EntityType, String), EntityType>,
}

impl StaticDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relations declared with `parent` as their source
    pub fn relations_of(&self, parent: EntityType) -> Vec<(&str, EntityType)> {
        let mut found: Vec<(&str, EntityType)> = self
            .relations
            .iter()
            .filter(|((p, _), _)| *p == parent)
            .map(|((_, name), target)| (name.as_str(), *target))
            .collect();
        found.sort_by(|a, b| a.0.cmp(b.0));
        found
    }
}

impl EntityDictionary for StaticDictionary {
    fn bind_entity(&mut self, entity_type: EntityType, engine: EngineType) {
        self.engines.insert(entity_type, engine);
    }

    fn bind_relation(&mut self, parent: EntityType, relation: &str, target: EntityType) {
        self.relations.insert((parent, relation.to_string()), target);
    }

    fn engine_of(&self, entity_type: EntityType) -> Option<EngineType> {
        self.engines.get(&entity_type).copied()
    }

    fn parameterized_type(&self, parent: EntityType, relation: &str) -> Option<EntityType> {
        self.relations.get(&(parent, relation.to_string())).copied()
    }
}

/// One configured bridge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BridgeDef {
    /// The parent stores the target id in one of its own fields
    DirectId {
        parent: EntityType,
        relation: String,
        parent_field: String,
    },
    /// Target keys embed the parent id
    OwnerScoped { parent: EntityType, relation: String },
}

impl BridgeDef {
    pub fn parent(&self) -> EntityType {
        match self {
            BridgeDef::DirectId { parent, .. } | BridgeDef::OwnerScoped { parent, .. } => *parent,
        }
    }

    pub fn relation(&self) -> &str {
        match self {
            BridgeDef::DirectId { relation, .. } | BridgeDef::OwnerScoped { relation, .. } => relation,
        }
    }
}

/// How a bridged relation is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeStrategy {
    DirectId { parent_field: String },
    OwnerScoped,
}

/// Validated (parent type, relation) -> strategy mapping
#[derive(Debug, Clone, Default)]
pub struct BridgeTable {
    entries: HashMap<(EntityType, String), BridgeStrategy>,
}

impl BridgeTable {
    /// Build the table, rejecting entries that could never resolve.
    ///
    /// Every relation must be declared in `dictionary`, its target must be
    /// owned by `target_engine`, and its parent by a different engine.
    pub fn build(
        defs: &[BridgeDef],
        dictionary: &dyn EntityDictionary,
        target_engine: EngineType,
    ) -> Result<Self> {
        let mut entries = HashMap::new();

        for def in defs {
            let parent = def.parent();
            let relation = def.relation();

            let target = dictionary.parameterized_type(parent, relation).ok_or_else(|| {
                BridgeError::Config(format!("{} has no relation named {}", parent, relation))
            })?;

            if dictionary.engine_of(target) != Some(target_engine) {
                return Err(BridgeError::Config(format!(
                    "{}.{} targets {}, which is not stored in {:?}",
                    parent, relation, target, target_engine
                )));
            }

            if dictionary.engine_of(parent) == Some(target_engine) {
                return Err(BridgeError::Config(format!(
                    "{}.{} does not cross stores",
                    parent, relation
                )));
            }

            let strategy = match def {
                BridgeDef::DirectId { parent_field, .. } => BridgeStrategy::DirectId {
                    parent_field: parent_field.clone(),
                },
                BridgeDef::OwnerScoped { .. } => BridgeStrategy::OwnerScoped,
            };

            if entries.insert((parent, relation.to_string()), strategy).is_some() {
                return Err(BridgeError::Config(format!(
                    "duplicate bridge for {}.{}",
                    parent, relation
                )));
            }
        }

        Ok(Self { entries })
    }

    pub fn lookup(&self, parent: EntityType, relation: &str) -> Option<&BridgeStrategy> {
        self.entries.get(&(parent, relation.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> StaticDictionary {
        let mut dict = StaticDictionary::new();
        dict.bind_entity(EntityType::User, EngineType::Sql);
        dict.bind_entity(EntityType::Action, EngineType::Kv);
        dict.bind_relation(EntityType::User, "specialAction", EntityType::Action);
        dict.bind_relation(EntityType::User, "redisActions", EntityType::Action);
        dict
    }

    fn defs() -> Vec<BridgeDef> {
        vec![
            BridgeDef::DirectId {
                parent: EntityType::User,
                relation: "specialAction".to_string(),
                parent_field: "special_action_id".to_string(),
            },
            BridgeDef::OwnerScoped {
                parent: EntityType::User,
                relation: "redisActions".to_string(),
            },
        ]
    }

    #[test]
    fn test_build_and_lookup() {
        let table = BridgeTable::build(&defs(), &dictionary(), EngineType::Kv).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup(EntityType::User, "redisActions"),
            Some(&BridgeStrategy::OwnerScoped)
        );
        assert!(table.lookup(EntityType::User, "friends").is_none());
        assert!(table.lookup(EntityType::Action, "redisActions").is_none());
    }

    #[test]
    fn test_build_rejects_unknown_relation() {
        let defs = vec![BridgeDef::OwnerScoped {
            parent: EntityType::User,
            relation: "friends".to_string(),
        }];
        let err = BridgeTable::build(&defs, &dictionary(), EngineType::Kv).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let mut defs = defs();
        let duplicate = defs[1].clone();
        defs.push(duplicate);
        assert!(BridgeTable::build(&defs, &dictionary(), EngineType::Kv).is_err());
    }

    #[test]
    fn test_build_rejects_wrong_target_engine() {
        assert!(BridgeTable::build(&defs(), &dictionary(), EngineType::Sql).is_err());
    }

    #[test]
    fn test_bridge_def_json() {
        let def: BridgeDef = serde_json::from_str(
            r#"{"kind": "direct-id", "parent": "user", "relation": "specialAction", "parent_field": "special_action_id"}"#,
        )
        .unwrap();
        assert_eq!(def, defs()[0]);
    }

    #[test]
    fn test_relations_of() {
        let dict = dictionary();
        let names: Vec<&str> = dict.relations_of(EntityType::User).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["redisActions", "specialAction"]);
    }
}
