//! Key-value data store and its read-only transaction
//!
//! Besides direct loads of [`Action`](crate::engine::model::Action) records,
//! the transaction resolves relations whose parent lives in another store.
//! Bridged loads never filter on their own: they synthesize an owner-scoped
//! predicate and hand it back to the multiplexer, which routes it to
//! [`KvTransaction::load_object`] / [`KvTransaction::load_objects`].

use std::sync::Arc;

use tracing::{debug, error};

use super::codec::KeyCodec;
use super::fetch::FetchEngine;
use super::storage::KeyValueStore;
use crate::engine::error::{BridgeError, Result};
use crate::engine::hybrid::filter::{translate, FilterExpression, FilterOp, Predicate};
use crate::engine::hybrid::relations::{
    BridgeDef, BridgeStrategy, BridgeTable, EngineType, EntityDictionary,
};
use crate::engine::model::{Entity, EntityType};
use crate::engine::store::{
    BridgeableTransaction, DataStore, DataStoreTransaction, MultiplexTransaction, Pagination,
    RequestScope, Sorting,
};

/// The only entity type this store owns
const OWNED_TYPE: EntityType = EntityType::Action;

/// Key-value backed store of [`EntityType::Action`] records
#[derive(Clone)]
pub struct KvDataStore {
    fetch: FetchEngine,
    owner_field: String,
    bridges: Arc<BridgeTable>,
}

impl KvDataStore {
    /// Create a store with no bridges installed
    pub fn new(store: Arc<dyn KeyValueStore>, codec: Arc<dyn KeyCodec>, owner_field: &str) -> Self {
        Self {
            fetch: FetchEngine::new(store, codec),
            owner_field: owner_field.to_string(),
            bridges: Arc::new(BridgeTable::default()),
        }
    }

    /// Install the bridge table, validated against a populated dictionary
    pub fn with_bridges(mut self, defs: &[BridgeDef], dictionary: &dyn EntityDictionary) -> Result<Self> {
        self.bridges = Arc::new(BridgeTable::build(defs, dictionary, EngineType::Kv)?);
        Ok(self)
    }

    pub fn bridges(&self) -> &BridgeTable {
        &self.bridges
    }

    fn transaction(&self) -> KvTransaction {
        KvTransaction {
            fetch: self.fetch.clone(),
            owner_field: self.owner_field.clone(),
            bridges: Arc::clone(&self.bridges),
        }
    }
}

impl DataStore for KvDataStore {
    fn populate_entity_dictionary(&self, dictionary: &mut dyn EntityDictionary) {
        dictionary.bind_entity(OWNED_TYPE, EngineType::Kv);
    }

    fn begin_transaction(&self) -> Box<dyn DataStoreTransaction> {
        Box::new(self.transaction())
    }

    fn begin_read_transaction(&self) -> Box<dyn DataStoreTransaction> {
        Box::new(self.transaction())
    }
}

/// Read-only transaction. Holds no mutable state; safe to share.
pub struct KvTransaction {
    fetch: FetchEngine,
    owner_field: String,
    bridges: Arc<BridgeTable>,
}

impl KvTransaction {
    fn namespace(&self) -> &'static str {
        OWNED_TYPE.canonical_name()
    }

    fn check_type(&self, entity_type: EntityType) -> Result<()> {
        if entity_type != OWNED_TYPE {
            debug!(%entity_type, "Tried to load unexpected object from key-value store");
            return Err(BridgeError::UnexpectedType(entity_type));
        }
        Ok(())
    }

    /// Owner ids named by an owner-field predicate
    fn owner_ids(&self, predicate: &Predicate) -> Result<Vec<String>> {
        match predicate.op() {
            FilterOp::Eq | FilterOp::In => Ok(predicate.string_values()),
            op => {
                error!(filter = %predicate, "Received bad filter operator for {}", OWNED_TYPE);
                Err(BridgeError::UnsupportedOperation(format!(
                    "Cannot filter {} with {:?}",
                    self.owner_field, op
                )))
            }
        }
    }

    /// `owner_field IN [parent.id]`
    fn owner_predicate(&self, parent: &Entity) -> Result<FilterExpression> {
        Ok(Predicate::in_list(&self.owner_field, [parent.id()])?.into())
    }

    fn unsupported_bridge(&self, parent: &Entity, relation: &str) -> BridgeError {
        error!(parent = ?parent, relation, "Tried to bridge from parent to relation");
        BridgeError::UnsupportedBridge {
            parent: format!("{}#{}", parent.entity_type(), parent.id()),
            relation: relation.to_string(),
        }
    }
}

impl DataStoreTransaction for KvTransaction {
    fn load_object(
        &self,
        entity_type: EntityType,
        id: &str,
        filter: Option<&FilterExpression>,
        _scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>> {
        self.check_type(entity_type)?;
        let codec = self.fetch.codec();

        let found = match filter {
            Some(expr) => {
                let predicate = translate(expr)?;
                if predicate.field() != self.owner_field {
                    debug!(filter = %predicate, "Filter does not scope by owner, nothing to load");
                    return Ok(None);
                }
                let wanted: Vec<String> = self
                    .owner_ids(&predicate)?
                    .iter()
                    .map(|owner| codec.encode(owner, id))
                    .collect();
                self.fetch
                    .fetch(self.namespace(), |key| wanted.iter().any(|w| w == key))?
            }
            None => self
                .fetch
                .fetch(self.namespace(), |key| codec.record_id(key) == Some(id))?,
        };

        Ok(found.into_iter().next().map(Entity::from))
    }

    fn load_objects(
        &self,
        entity_type: EntityType,
        filter: Option<&FilterExpression>,
        _sorting: Option<&Sorting>,
        _pagination: Option<&Pagination>,
        _scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        self.check_type(entity_type)?;

        let actions = match filter {
            Some(expr) => {
                let predicate = translate(expr)?;
                if predicate.field() != self.owner_field {
                    error!(filter = %predicate, "Received bad filter for {}", OWNED_TYPE);
                    return Err(BridgeError::UnsupportedOperation(format!(
                        "Cannot filter {} by {}",
                        OWNED_TYPE,
                        predicate.field()
                    )));
                }
                let codec = self.fetch.codec();
                let scopes: Vec<String> = self
                    .owner_ids(&predicate)?
                    .iter()
                    .map(|owner| codec.owner_scope(owner))
                    .collect();
                self.fetch
                    .fetch(self.namespace(), |key| scopes.iter().any(|s| key.starts_with(s.as_str())))?
            }
            None => self.fetch.fetch(self.namespace(), |_| true)?,
        };

        Ok(actions.into_iter().map(Entity::from).collect())
    }

    fn get_relation(
        &self,
        _relation_tx: &dyn DataStoreTransaction,
        _entity: &Entity,
        _relation: &str,
        _filter: Option<&FilterExpression>,
        _sorting: Option<&Sorting>,
        _pagination: Option<&Pagination>,
        _scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        Err(BridgeError::UnsupportedOperation(
            "No key-value relationships currently supported".to_string(),
        ))
    }

    fn as_bridgeable(&self) -> Option<&dyn BridgeableTransaction> {
        Some(self)
    }
}

impl BridgeableTransaction for KvTransaction {
    fn bridgeable_load_object(
        &self,
        mux: &dyn MultiplexTransaction,
        parent: &Entity,
        relation: &str,
        lookup_id: &str,
        _filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>> {
        let parent_type = parent.entity_type();
        let (strategy, target) = match (
            self.bridges.lookup(parent_type, relation),
            scope.dictionary.parameterized_type(parent_type, relation),
        ) {
            (Some(strategy), Some(target)) => (strategy, target),
            _ => return Err(self.unsupported_bridge(parent, relation)),
        };

        match strategy {
            BridgeStrategy::DirectId { parent_field } => match parent.field(parent_field) {
                Some(id) => mux.load_object(target, &id, None, scope),
                None => {
                    debug!(parent = ?parent, parent_field = %parent_field, "Parent has no linked id");
                    Ok(None)
                }
            },
            BridgeStrategy::OwnerScoped => {
                let scoped = self.owner_predicate(parent)?;
                mux.load_object(target, lookup_id, Some(&scoped), scope)
            }
        }
    }

    fn bridgeable_load_objects(
        &self,
        mux: &dyn MultiplexTransaction,
        parent: &Entity,
        relation: &str,
        _filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        let parent_type = parent.entity_type();
        match (
            self.bridges.lookup(parent_type, relation),
            scope.dictionary.parameterized_type(parent_type, relation),
        ) {
            (Some(BridgeStrategy::OwnerScoped), Some(target)) => {
                let scoped = self.owner_predicate(parent)?;
                mux.load_objects(target, Some(&scoped), sorting, pagination, scope)
            }
            _ => Err(self.unsupported_bridge(parent, relation)),
        }
    }
}
