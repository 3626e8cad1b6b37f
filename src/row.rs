use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

/// A single record: column name to value, with names compared case-insensitively.
///
/// The key set is whatever stage of the query pipeline produced the row (a stored
/// row, a joined row with `table.column` keys, or a projection). Cells keep the order
/// they were first set in so that `SELECT *` lists columns predictably, but equality
/// ignores order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored under `column`, ignoring ASCII case.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|idx| &self.cells[idx].1)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Sets `column` to `value`. An existing cell keeps its original spelling.
    pub fn set(&mut self, column: impl Into<String>, value: Value) {
        let column = column.into();
        match self.position(&column) {
            Some(idx) => self.cells[idx].1 = value,
            None => self.cells.push((column, value)),
        }
    }

    /// Column names in the order they were first set.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.cells
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(column))
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value.into());
        }
        row
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping column names to integers or strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut row = Row::new();
        while let Some((name, value)) = access.next_entry::<String, Value>()? {
            row.set(name, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let row: Row = [("Name", Value::from("Alice")), ("id", Value::Int(1))]
            .into_iter()
            .collect();

        assert_eq!(row.get("name"), Some(&Value::from("Alice")));
        assert_eq!(row.get("ID"), Some(&Value::Int(1)));
        assert!(row.get("age").is_none());
        assert!(row.contains("NAME"));
    }

    #[test]
    fn test_set_replaces_and_keeps_spelling() {
        let mut row = Row::new();
        row.set("Name", Value::from("a"));
        row.set("NAME", Value::from("b"));

        assert_eq!(row.len(), 1);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["Name"]);
        assert_eq!(row.get("name"), Some(&Value::from("b")));
    }

    #[test]
    fn test_equality_ignores_order() {
        let a: Row = [("a", 1i64), ("b", 2)].into_iter().collect();
        let b: Row = [("b", 2i64), ("a", 1)].into_iter().collect();
        let c: Row = [("a", 1i64)].into_iter().collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(c, a);
    }

    #[test]
    fn test_json_object_keeps_column_order() {
        let row: Row = [("id", Value::Int(1)), ("name", Value::from("a"))]
            .into_iter()
            .collect();

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"name":"a"}"#);

        let back: Row = serde_json::from_str(r#"{"name":"a","id":1}"#).unwrap();
        assert_eq!(back.columns().collect::<Vec<_>>(), vec!["name", "id"]);
        assert_eq!(back, row);
    }

    #[test]
    fn test_rejects_unsupported_json_values() {
        assert!(serde_json::from_str::<Row>(r#"{"id":true}"#).is_err());
        assert!(serde_json::from_str::<Row>("[1, 2]").is_err());
    }

    #[test]
    fn test_display() {
        let row: Row = [("id", Value::Int(1)), ("name", Value::from("a"))]
            .into_iter()
            .collect();
        assert_eq!(row.to_string(), "id=1 name=a");
    }
}
