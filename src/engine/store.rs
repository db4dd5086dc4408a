//! Data store and transaction contracts
//!
//! Every backing store exposes a [`DataStore`] that hands out
//! [`DataStoreTransaction`]s. A store that can resolve relations whose
//! parent lives elsewhere also implements [`BridgeableTransaction`] and
//! returns itself from [`DataStoreTransaction::as_bridgeable`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use super::error::Result;
use super::hybrid::filter::FilterExpression;
use super::hybrid::relations::EntityDictionary;
use super::model::{Entity, EntityType};

/// Sort direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Sort specification. Passed through, never enforced by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sorting {
    pub field: String,
    #[serde(default)]
    pub dir: SortDir,
}

/// Pagination window. Passed through, never enforced by the bridge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

/// Per-request context
pub struct RequestScope<'a> {
    pub request_id: Uuid,
    pub dictionary: &'a dyn EntityDictionary,
}

impl<'a> RequestScope<'a> {
    pub fn new(dictionary: &'a dyn EntityDictionary) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            dictionary,
        }
    }
}

/// A backing store
pub trait DataStore: Send + Sync {
    /// Register the entity types this store owns
    fn populate_entity_dictionary(&self, dictionary: &mut dyn EntityDictionary);

    fn begin_transaction(&self) -> Box<dyn DataStoreTransaction>;

    fn begin_read_transaction(&self) -> Box<dyn DataStoreTransaction>;
}

/// Operations a store transaction answers.
///
/// The mutation methods default to no-ops: read-only stores accept them and
/// do nothing.
pub trait DataStoreTransaction: Send + Sync {
    fn load_object(
        &self,
        entity_type: EntityType,
        id: &str,
        filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>>;

    fn load_objects(
        &self,
        entity_type: EntityType,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>>;

    /// Traverse a relation stored alongside `entity`
    #[allow(clippy::too_many_arguments)]
    fn get_relation(
        &self,
        relation_tx: &dyn DataStoreTransaction,
        entity: &Entity,
        relation: &str,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>>;

    fn get_attribute(&self, entity: &Entity, attribute: &str, _scope: &RequestScope<'_>) -> Value {
        entity.field(attribute).map(Value::String).unwrap_or(Value::Null)
    }

    fn set_attribute(&self, _entity: &Entity, _attribute: &str, _value: Value, _scope: &RequestScope<'_>) {}

    fn update_to_many_relation(
        &self,
        _relation_tx: &dyn DataStoreTransaction,
        _entity: &Entity,
        _relation: &str,
        _added: &HashSet<String>,
        _deleted: &HashSet<String>,
        _scope: &RequestScope<'_>,
    ) {
    }

    fn update_to_one_relation(
        &self,
        _relation_tx: &dyn DataStoreTransaction,
        _entity: &Entity,
        _relation: &str,
        _value: Option<&Entity>,
        _scope: &RequestScope<'_>,
    ) {
    }

    fn create_object(&self, _entity: &Entity, _scope: &RequestScope<'_>) {}

    fn create_new_object(&self, _entity_type: EntityType) -> Option<Entity> {
        None
    }

    fn save(&self, _entity: &Entity, _scope: &RequestScope<'_>) {}

    fn delete(&self, _entity: &Entity, _scope: &RequestScope<'_>) {}

    fn flush(&self, _scope: &RequestScope<'_>) {}

    fn pre_commit(&self) {}

    fn commit(&self, _scope: &RequestScope<'_>) {}

    fn close(&self) {}

    /// Opaque principal mapping; stores without users answer `None`
    fn access_user(&self, _opaque_user: &Value) -> Option<String> {
        None
    }

    fn as_bridgeable(&self) -> Option<&dyn BridgeableTransaction> {
        None
    }
}

/// Loads routed to whichever store owns the requested type
pub trait MultiplexTransaction {
    fn load_object(
        &self,
        entity_type: EntityType,
        id: &str,
        filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>>;

    fn load_objects(
        &self,
        entity_type: EntityType,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>>;
}

/// Relation loads whose parent lives in another store
pub trait BridgeableTransaction: Send + Sync {
    fn bridgeable_load_object(
        &self,
        mux: &dyn MultiplexTransaction,
        parent: &Entity,
        relation: &str,
        lookup_id: &str,
        filter: Option<&FilterExpression>,
        scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>>;

    #[allow(clippy::too_many_arguments)]
    fn bridgeable_load_objects(
        &self,
        mux: &dyn MultiplexTransaction,
        parent: &Entity,
        relation: &str,
        filter: Option<&FilterExpression>,
        sorting: Option<&Sorting>,
        pagination: Option<&Pagination>,
        scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>>;
}
