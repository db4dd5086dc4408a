//! SQL-side data store for relational parents

use tracing::debug;

use super::database::Database;
use super::error::{BridgeError, Result};
use super::hybrid::filter::{translate, FilterExpression, FilterOp};
use super::hybrid::relations::{EngineType, EntityDictionary};
use super::model::{Entity, EntityType, User};
use super::store::{DataStore, DataStoreTransaction, Pagination, RequestScope, Sorting};

/// SQLite-backed store of [`User`] rows
#[derive(Clone)]
pub struct SqlDataStore {
    db: Database,
}

impl SqlDataStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl DataStore for SqlDataStore {
    fn populate_entity_dictionary(&self, dictionary: &mut dyn EntityDictionary) {
        dictionary.bind_entity(EntityType::User, EngineType::Sql);
        for (relation, target) in User::RELATIONS {
            dictionary.bind_relation(EntityType::User, relation, *target);
        }
    }

    fn begin_transaction(&self) -> Box<dyn DataStoreTransaction> {
        Box::new(SqlTransaction { db: self.db.clone() })
    }

    fn begin_read_transaction(&self) -> Box<dyn DataStoreTransaction> {
        Box::new(SqlTransaction { db: self.db.clone() })
    }
}

pub struct SqlTransaction {
    db: Database,
}

impl SqlTransaction {
    fn check_type(&self, entity_type: EntityType) -> Result<()> {
        if entity_type != EntityType::User {
            debug!(%entity_type, "Tried to load unexpected object from SQL store");
            return Err(BridgeError::UnexpectedType(entity_type));
        }
        Ok(())
    }
}

impl DataStoreTransaction for SqlTransaction {
    fn load_object(
        &self,
        entity_type: EntityType,
        id: &str,
        filter: Option<&FilterExpression>,
        _scope: &RequestScope<'_>,
    ) -> Result<Option<Entity>> {
        self.check_type(entity_type)?;
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };

        let user = self.db.get_user(id)?;
        match (user, filter) {
            (Some(user), Some(expr)) => Ok(matches_filter(&user, expr)?.then(|| user.into())),
            (user, None) => Ok(user.map(Entity::from)),
            (None, Some(_)) => Ok(None),
        }
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

        let mut users = Vec::new();
        for user in self.db.list_users()? {
            let keep = match filter {
                Some(expr) => matches_filter(&user, expr)?,
                None => true,
            };
            if keep {
                users.push(Entity::from(user));
            }
        }
        Ok(users)
    }

    fn get_relation(
        &self,
        _relation_tx: &dyn DataStoreTransaction,
        entity: &Entity,
        relation: &str,
        _filter: Option<&FilterExpression>,
        _sorting: Option<&Sorting>,
        _pagination: Option<&Pagination>,
        _scope: &RequestScope<'_>,
    ) -> Result<Vec<Entity>> {
        // every declared user relation points into another store
        Err(BridgeError::UnsupportedOperation(format!(
            "{} has no SQL-side relation {}",
            entity.entity_type(),
            relation
        )))
    }
}

/// Single `Eq`/`In` predicates on `id` or `name`
fn matches_filter(user: &User, expr: &FilterExpression) -> Result<bool> {
    let predicate = translate(expr)?;
    let actual = match predicate.field() {
        "id" => user.id.to_string(),
        "name" => user.name.clone(),
        field => {
            return Err(BridgeError::UnsupportedOperation(format!(
                "Cannot filter users by {}",
                field
            )))
        }
    };

    match predicate.op() {
        FilterOp::Eq | FilterOp::In => Ok(predicate.string_values().contains(&actual)),
        op => Err(BridgeError::UnsupportedOperation(format!(
            "Cannot filter users with {:?}",
            op
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hybrid::filter::Predicate;
    use crate::engine::hybrid::relations::StaticDictionary;

    fn setup() -> (SqlDataStore, StaticDictionary) {
        let db = Database::in_memory().unwrap();
        db.insert_user(&User::new(1, "alice")).unwrap();
        db.insert_user(&User::new(2, "bob")).unwrap();
        let store = SqlDataStore::new(db);
        let mut dict = StaticDictionary::new();
        store.populate_entity_dictionary(&mut dict);
        (store, dict)
    }

    #[test]
    fn test_populates_user_relations() {
        let (_, dict) = setup();
        assert_eq!(dict.engine_of(EntityType::User), Some(EngineType::Sql));
        assert_eq!(
            dict.parameterized_type(EntityType::User, "redisActions"),
            Some(EntityType::Action)
        );
    }

    #[test]
    fn test_load_users() {
        let (store, dict) = setup();
        let tx = store.begin_read_transaction();
        let scope = RequestScope::new(&dict);

        let alice = tx.load_object(EntityType::User, "1", None, &scope).unwrap();
        assert_eq!(alice.and_then(|e| e.as_user().map(|u| u.name.clone())).as_deref(), Some("alice"));
        assert!(tx.load_object(EntityType::User, "abc", None, &scope).unwrap().is_none());

        let by_name: FilterExpression = Predicate::eq("name", "bob").into();
        let bobs = tx
            .load_objects(EntityType::User, Some(&by_name), None, None, &scope)
            .unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id(), "2");

        assert!(tx
            .load_object(EntityType::User, "1", Some(&by_name), &scope)
            .unwrap()
            .is_none());
        assert_eq!(tx.load_objects(EntityType::User, None, None, None, &scope).unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_foreign_types() {
        let (store, dict) = setup();
        let tx = store.begin_read_transaction();
        let scope = RequestScope::new(&dict);
        assert!(matches!(
            tx.load_object(EntityType::Action, "r1", None, &scope),
            Err(BridgeError::UnexpectedType(EntityType::Action))
        ));
    }
}
