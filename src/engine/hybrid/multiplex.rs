//! Multiplexing across backing stores
//!
//! [`Federation`] wires the SQL and key-value stores together at startup;
//! [`Multiplexer`] routes each load to the transaction of the engine owning
//! the requested type, and hands cross-engine relation traversal to the
//! target store's bridge.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::filter::FilterExpression;
use super::relations::{BridgeDef, EngineType, StaticDictionary};
use crate::engine::database::Database;
use crate::engine::error::{BridgeError, Result};
use crate::engine::kv::{KeyCodec, KeyValueStore, KvDataStore};
use crate::engine::model::{Entity, EntityType};
use crate::engine::sql::SqlDataStore;
use crate::engine::store::{
    DataStore, DataStoreTransaction, MultiplexTransaction, Pagination, RequestScope, Sorting,
};

/// Open read transactions, one per engine
pub struct Multiplexer {
    transactions: HashMap<EngineType, Box<dyn DataStoreTransaction>>,
}

impl Multiplexer {
    pub fn new() -> Self {
        Self {
            transactions: HashMap::new(),
        }
    }

    pub fn with_transaction(mut self, engine: EngineType, tx: Box<dyn DataStoreTransaction>) -> Self {
        self.transactions.insert(engine, tx);
        self
    }

    fn engine_of(&self, entity_type: EntityType, scope: &RequestScope<'_>) -> Result<EngineType> {
        scope
            .dictionary
            .engine_of(entity_type)
            .ok_or(BridgeError::UnexpectedType(entity_type))
    }

    fn transaction(&self, engine: EngineType) -> Result<&dyn DataStoreTransaction> {
        self.transactions
            .get(&engine)
            .map(|tx| tx.as_ref())
            .ok_or_else(|| BridgeError::UnsupportedOperation(format!("no open {:?} transaction", engine)))
    }

    fn transaction_for(&self, entity_type: EntityType, scope: &RequestScope<'_>) -> Result<&dyn DataStoreTransaction> {
        self.transaction(self.engine_of(entity_type, scope)?)
    }

    /// Resolve the engines on both ends of `parent.relation`
    fn relation_ends(
        &self,
        parent: &Entity,
        relation: &str,
        scope: &RequestScope<'_>,
    ) -> Result<(EngineType, EngineType)> {
        let parent_type = parent.entity_type();
        let target = scope
            .dictionary
            .parameterized_type(parent_type, relation)
            .ok_or_else(|| {
                BridgeError::UnsupportedOperation(format!("{} has no relation {}", parent_type, relation))
            })?;
        Ok((self.engine_of(parent_type, scope)?, self.engine_of(target, scope)?))
    }

    /// To-many relation traversal
    pub fn get_relation(
        &self,
        parent: &Entity,
        relation: &str,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        let (parent_engine, target_engine) = self.relation_ends(parent, relation, scope)?;
        let target_tx = self.transaction(target_engine)?;

        if parent_engine == target_engine {
            let parent_tx = self.transaction(parent_engine)?;
            return parent_tx.get_relation(target_tx, parent, relation, filter, sorting, pagination, scope);
        }

        debug!(
            request_id = %scope.request_id,
            relation,
            from = ?parent_engine,
            to = ?target_engine,
            "bridging relation"
        );
        let bridge = target_tx.as_bridgeable().ok_or_else(|| {
            BridgeError::UnsupportedOperation(format!("{:?} store cannot bridge relations", target_engine))
        })?;
        bridge.bridgeable_load_objects(self, parent, relation, filter, sorting, pagination, scope)
    }

    /// To-one relation traversal, or a single member of a to-many relation
    pub fn get_relation_object(
        &self,
        parent: &Entity,
        relation: &str,
        lookup_id: &str,
        filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>> {
        let (parent_engine, target_engine) = self.relation_ends(parent, relation, scope)?;
        if parent_engine == target_engine {
            return Err(BridgeError::UnsupportedOperation(format!(
                "{} does not cross stores",
                relation
            )));
        }

        debug!(
            request_id = %scope.request_id,
            relation,
            lookup_id,
            from = ?parent_engine,
            to = ?target_engine,
            "bridging relation"
        );
        let bridge = self.transaction(target_engine)?.as_bridgeable().ok_or_else(|| {
            BridgeError::UnsupportedOperation(format!("{:?} store cannot bridge relations", target_engine))
        })?;
        bridge.bridgeable_load_object(self, parent, relation, lookup_id, filter, scope)
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MultiplexTransaction for Multiplexer {
    fn load_object(
        &self,
        entity_type: EntityType,
        id: &str,
        filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>> {
        self.transaction_for(entity_type, scope)?
            .load_object(entity_type, id, filter, scope)
    }

    fn load_objects(
        &self,
        entity_type: EntityType,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        self.transaction_for(entity_type, scope)?
            .load_objects(entity_type, filter, sorting, pagination, scope)
    }
}

/// The SQL and key-value stores behind one dictionary
pub struct Federation {
    dictionary: StaticDictionary,
    sql: SqlDataStore,
    kv: KvDataStore,
}

impl Federation {
    /// Populate the dictionary from both stores, then validate the bridges
    pub fn new(
        db: Database,
        kv_store: Arc<dyn KeyValueStore>,
        codec: Arc<dyn KeyCodec>,
        owner_field: &str,
        bridges: &[BridgeDef],
    ) -> Result<Self> {
        let sql = SqlDataStore::new(db);
        let kv = KvDataStore::new(kv_store, codec, owner_field);

        let mut dictionary = StaticDictionary::new();
        sql.populate_entity_dictionary(&mut dictionary);
        kv.populate_entity_dictionary(&mut dictionary);

        let kv = kv.with_bridges(bridges, &dictionary)?;
        Ok(Self { dictionary, sql, kv })
    }

    pub fn dictionary(&self) -> &StaticDictionary {
        &self.dictionary
    }

    pub fn kv(&self) -> &KvDataStore {
        &self.kv
    }

    pub fn scope(&self) -> RequestScope<'_> {
        RequestScope::new(&self.dictionary)
    }

    pub fn begin_read_transaction(&self) -> Multiplexer {
        Multiplexer::new()
            .with_transaction(EngineType::Sql, self.sql.begin_read_transaction())
            .with_transaction(EngineType::Kv, self.kv.begin_read_transaction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hybrid::filter::Predicate;
    use crate::engine::hybrid::relations::EntityDictionary;
    use crate::engine::kv::{MemoryKvStore, OwnerPrefixCodec};
    use crate::engine::model::{Action, User};

    fn bridges() -> Vec<BridgeDef> {
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

    fn federation() -> Federation {
        let db = Database::in_memory().unwrap();
        db.insert_user(&User::new(1, "alice").with_special_action("r2")).unwrap();

        let kv = MemoryKvStore::new();
        let ns = EntityType::Action.canonical_name();
        kv.hset(ns, "user1:r1", "buy milk").unwrap();
        kv.hset(ns, "user2:r2", "walk dog").unwrap();

        Federation::new(db, Arc::new(kv), Arc::new(OwnerPrefixCodec::default()), "user_id", &bridges())
            .unwrap()
    }

    #[test]
    fn test_routes_by_engine() {
        let fed = federation();
        let mux = fed.begin_read_transaction();
        let scope = fed.scope();

        let user = mux.load_object(EntityType::User, "1", None, &scope).unwrap();
        assert!(user.is_some());
        let actions = mux.load_objects(EntityType::Action, None, None, None, &scope).unwrap();
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_get_relation_bridges_to_kv() {
        let fed = federation();
        let mux = fed.begin_read_transaction();
        let scope = fed.scope();
        let alice = mux.load_object(EntityType::User, "1", None, &scope).unwrap().unwrap();

        let actions = mux.get_relation(&alice, "redisActions", None, None, None, &scope).unwrap();
        assert_eq!(actions, vec![Entity::from(Action::new("r1", "buy milk"))]);

        let special = mux
            .get_relation_object(&alice, "specialAction", "", None, &scope)
            .unwrap();
        assert_eq!(special, Some(Entity::from(Action::new("r2", "walk dog"))));

        let missing = mux.get_relation(&alice, "friends", None, None, None, &scope);
        assert!(matches!(missing, Err(BridgeError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_federation_dictionary() {
        let fed = federation();
        let relations = fed.dictionary().relations_of(EntityType::User);
        assert_eq!(
            relations,
            vec![("redisActions", EntityType::Action), ("specialAction", EntityType::Action)]
        );
        assert_eq!(fed.dictionary().engine_of(EntityType::Action), Some(EngineType::Kv));
        assert_ne!(fed.scope().request_id, fed.scope().request_id);
    }

    #[test]
    fn test_unbridged_relation_rejected_at_startup() {
        let mut defs = bridges();
        defs.push(BridgeDef::OwnerScoped {
            parent: EntityType::Action,
            relation: "owner".to_string(),
        });
        let result = Federation::new(
            Database::in_memory().unwrap(),
            Arc::new(MemoryKvStore::new()),
            Arc::new(OwnerPrefixCodec::default()),
            "user_id",
            &defs,
        );
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_direct_filtered_load_through_mux() {
        let fed = federation();
        let mux = fed.begin_read_transaction();
        let scope = fed.scope();

        let filter: FilterExpression = Predicate::in_list("user_id", ["2"]).unwrap().into();
        let actions = mux
            .load_objects(EntityType::Action, Some(&filter), None, None, &scope)
            .unwrap();
        assert_eq!(actions, vec![Entity::from(Action::new("r2", "walk dog"))]);
    }
}
