use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::key::Key;

pub type Value = serde_json::Value;

/// The schemaless field mapping carried by a record.
pub type Fields = BTreeMap<String, Value>;

/// Builds a field mapping from (name, value) pairs.
pub fn fields<K, I>(pairs: I) -> Fields
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs.into_iter().map(|(name, value)| (name.into(), value)).collect()
}

/// One record: a field mapping bound to exactly one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    fields: Fields,
}

impl Entity {
    pub fn new(key: Key, fields: Fields) -> Self {
        Entity { key, fields }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Overwrites this record's fields with the incoming values, one field
    /// at a time. Fields absent from `values` keep their current value.
    pub fn apply_values(&mut self, values: Fields) {
        for (name, value) in values {
            self.fields.insert(name, value);
        }
    }

    /// Restricts the record to the listed columns. The key is unaffected.
    pub fn only(mut self, columns: &[String]) -> Self {
        self.fields.retain(|name, _| columns.iter().any(|column| column == name));
        self
    }

    pub fn into_parts(self) -> (Key, Fields) {
        (self.key, self.fields)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn apply_values_overwrites_field_by_field() {
        let mut entity = Entity::new(
            Key::new("Person").with_id(1),
            fields([("name", json!("Bob")), ("age", json!(30))]),
        );
        entity.apply_values(fields([("age", json!(31)), ("city", json!("Leeds"))]));

        assert_eq!(entity.get("name"), Some(&json!("Bob")));
        assert_eq!(entity.get("age"), Some(&json!(31)));
        assert_eq!(entity.get("city"), Some(&json!("Leeds")));
    }

    #[test]
    fn only_keeps_the_listed_columns_and_the_key() {
        let entity = Entity::new(
            Key::new("Person").with_id(1),
            fields([("name", json!("Bob")), ("age", json!(30))]),
        );
        let projected = entity.only(&["name".to_string()]);

        assert_eq!(projected.fields().len(), 1);
        assert_eq!(projected.get("name"), Some(&json!("Bob")));
        assert_eq!(projected.key(), &Key::new("Person").with_id(1));
    }
}
