//! Entity model shared by the SQL and key-value sides

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Entity types known to the federation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Relational parent (lives in SQLite)
    User,
    /// Key-value record
    Action,
}

impl EntityType {
    /// Canonical name, also used as the key-value namespace key
    pub fn canonical_name(&self) -> &'static str {
        match self {
            EntityType::User => "bridgedb.model.User",
            EntityType::Action => "bridgedb.model.Action",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A user row from the relational store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_action_id: Option<String>,
}

impl User {
    /// Relations declared on the user model: (relation name, target type)
    pub const RELATIONS: &'static [(&'static str, EntityType)] = &[
        ("specialAction", EntityType::Action),
        ("redisActions", EntityType::Action),
    ];

    pub fn new(id: i64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            special_action_id: None,
        }
    }

    pub fn with_special_action(mut self, action_id: &str) -> Self {
        self.special_action_id = Some(action_id.to_string());
        self
    }
}

/// A record decoded from the key-value store.
///
/// Built fresh on every fetch; there is no identity map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub description: String,
}

impl Action {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
        }
    }
}

/// Any entity the multiplexer can hand back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    User(User),
    Action(Action),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::User(_) => EntityType::User,
            Entity::Action(_) => EntityType::Action,
        }
    }

    /// Identifier rendered as a string, whatever its native type
    pub fn id(&self) -> String {
        match self {
            Entity::User(user) => user.id.to_string(),
            Entity::Action(action) => action.id.clone(),
        }
    }

    /// Read a named field; `None` when the field is unknown or unset
    pub fn field(&self, name: &str) -> Option<String> {
        match (self, name) {
            (_, "id") => Some(self.id()),
            (Entity::User(user), "name") => Some(user.name.clone()),
            (Entity::User(user), "special_action_id") => user.special_action_id.clone(),
            (Entity::Action(action), "description") => Some(action.description.clone()),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Entity::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Entity::User(user) => Some(user),
            _ => None,
        }
    }
}

impl From<Action> for Entity {
    fn from(action: Action) -> Self {
        Entity::Action(action)
    }
}

impl From<User> for Entity {
    fn from(user: User) -> Self {
        Entity::User(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_fields() {
        let user = Entity::from(User::new(7, "alice").with_special_action("a9"));
        assert_eq!(user.entity_type(), EntityType::User);
        assert_eq!(user.id(), "7");
        assert_eq!(user.field("special_action_id").as_deref(), Some("a9"));
        assert_eq!(user.field("description"), None);

        let action = Entity::from(Action::new("r1", "buy milk"));
        assert_eq!(action.field("description").as_deref(), Some("buy milk"));
        assert_eq!(action.as_action().map(|a| a.id.as_str()), Some("r1"));
    }

    #[test]
    fn test_entity_json_is_tagged() {
        let json = Entity::from(Action::new("r1", "buy milk")).to_json();
        assert_eq!(json["type"], "action");
        assert_eq!(json["description"], "buy milk");
    }
}
