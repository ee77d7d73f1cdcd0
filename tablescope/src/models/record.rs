use crate::models::DatabaseValue;
use crate::{Result, TablescopeError};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tokio_postgres::Row;

/// Column name to value pairs, in column order.
///
/// Used both for the payload of inserts and updates, and for the rows that come back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordValues {
    values: Vec<(String, DatabaseValue)>,
}

impl RecordValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value of a column, replacing an earlier value in place.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Option<DatabaseValue> {
        let column = column.into();
        let value = value.into();

        match self.values.iter_mut().find(|(c, _)| *c == column) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.values.push((column, value));
                None
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.values.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.values.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    /// Parses a JSON object such as `{"name": "Alice", "age": 42}`, keeping the key order.
    pub fn from_json_str(json: &str) -> Result<Self> {
        match serde_json::from_str::<serde_json::Value>(json)? {
            serde_json::Value::Object(map) => Ok(map.into()),
            serde_json::Value::Null => Err(TablescopeError::PayloadNotAnObject("null")),
            serde_json::Value::Bool(_) => Err(TablescopeError::PayloadNotAnObject("a boolean")),
            serde_json::Value::Number(_) => Err(TablescopeError::PayloadNotAnObject("a number")),
            serde_json::Value::String(_) => Err(TablescopeError::PayloadNotAnObject("a string")),
            serde_json::Value::Array(_) => Err(TablescopeError::PayloadNotAnObject("an array")),
        }
    }

    /// Reads every column of a row.
    pub(crate) fn from_row(row: &Row) -> Result<Self> {
        let mut values = Vec::with_capacity(row.len());

        for (idx, column) in row.columns().iter().enumerate() {
            values.push((column.name().to_string(), row.try_get::<_, DatabaseValue>(idx)?));
        }

        Ok(Self { values })
    }
}

impl<K: Into<String>, V: Into<DatabaseValue>> FromIterator<(K, V)> for RecordValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = RecordValues::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

impl IntoIterator for RecordValues {
    type Item = (String, DatabaseValue);
    type IntoIter = std::vec::IntoIter<(String, DatabaseValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for RecordValues {
    fn from(value: serde_json::Map<String, serde_json::Value>) -> Self {
        value.into_iter().collect()
    }
}

impl Serialize for RecordValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in &self.values {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_in_place() {
        let mut record = RecordValues::from_iter([("id", DatabaseValue::from(1i64)), ("name", "a".into())]);

        let previous = record.insert("id", 2i64);

        assert_eq!(previous, Some(DatabaseValue::from(1i64)));
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(record.get("id"), Some(&DatabaseValue::from(2i64)));
    }

    #[test]
    fn serializes_as_ordered_map() {
        let record = RecordValues::from_iter([("b", DatabaseValue::from(1i64)), ("a", DatabaseValue::Null)]);

        assert_eq!(serde_json::to_string(&record).unwrap(), r#"{"b":1,"a":null}"#);
    }

    #[test]
    fn keeps_json_object_order() {
        let record = RecordValues::from_json_str(r#"{"z": "x", "a": 5}"#).unwrap();

        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["z", "a"]);
        assert_eq!(record.get("a"), Some(&DatabaseValue::from(5i64)));
    }

    #[test]
    fn rejects_payloads_that_are_not_objects() {
        let err = RecordValues::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, TablescopeError::PayloadNotAnObject("an array")));

        let err = RecordValues::from_json_str("{").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }
}
