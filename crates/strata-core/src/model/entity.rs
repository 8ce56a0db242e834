//! Entity: attributes plus an optional store identity

use crate::model::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute name to value, ordered by name
pub type Attributes = BTreeMap<String, Value>;

/// A plain record of one logical kind
///
/// An unset identity means the entity has never been persisted (or was
/// deleted). Identities are assigned by the store on insert and cleared by a
/// successful delete; `RecordMapper` is the only intended caller of
/// [`Entity::mark_persisted`] and [`Entity::mark_transient`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Entity {
    identity: Option<i64>,
    attributes: Attributes,
}

impl Entity {
    /// Create a transient entity with no attributes
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transient entity from attribute pairs
    pub fn from_attributes<K, V, I>(attributes: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            identity: None,
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Rebuild an entity read back from the store
    pub fn hydrated(identity: i64, attributes: Attributes) -> Self {
        Self {
            identity: Some(identity),
            attributes,
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn identity(&self) -> Option<i64> {
        self.identity
    }

    pub fn is_persisted(&self) -> bool {
        self.identity.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set an attribute in memory, returning the previous value
    ///
    /// Nothing is written until the entity is saved.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn into_attributes(self) -> Attributes {
        self.attributes
    }

    /// Attribute equality, ignoring identity
    pub fn same_attributes(&self, other: &Entity) -> bool {
        self.attributes == other.attributes
    }

    pub fn mark_persisted(&mut self, identity: i64) {
        self.identity = Some(identity);
    }

    pub fn mark_transient(&mut self) {
        self.identity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_is_transient() {
        let student = Entity::new().with("name", "Jon");
        assert!(!student.is_persisted());
        assert_eq!(student.identity(), None);
        assert_eq!(student.get("name"), Some(&Value::from("Jon")));
    }

    #[test]
    fn test_set_returns_previous_value() {
        let mut student = Entity::from_attributes([("name", "Jon")]);
        let previous = student.set("name", "Steve");
        assert_eq!(previous, Some(Value::from("Jon")));
        assert_eq!(student.get("name").and_then(Value::as_str), Some("Steve"));
    }

    #[test]
    fn test_identity_lifecycle() {
        let mut artist = Entity::new().with("name", "Kelly");
        artist.mark_persisted(2);
        assert_eq!(artist.identity(), Some(2));

        artist.mark_transient();
        assert!(!artist.is_persisted());
    }

    #[test]
    fn test_same_attributes_ignores_identity() {
        let a = Entity::hydrated(1, Entity::new().with("grade", "10th").into_attributes());
        let b = Entity::new().with("grade", "10th");
        assert!(a.same_attributes(&b));
        assert_ne!(a, b);
    }
}
