use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::SemanticError;
use crate::row::Row;
use crate::value::Value;

/// Column definition in the schema.
///
/// Field names follow the on-disk table file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub is_primary_key: bool,
    pub is_unique: bool,
}

impl ColumnDef {
    /// A column without constraints.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_primary_key: false,
            is_unique: false,
        }
    }

    /// True when inserts must reject a value already present in this column.
    pub fn requires_unique(&self) -> bool {
        self.is_primary_key || self.is_unique
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Looks a column up by name, ignoring ASCII case.
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|col| col.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: String, schema: Schema) -> Self {
        Self {
            name,
            schema,
            rows: Vec::new(),
        }
    }

    /// Resolves a column of this table or fails with `ColumnNotFound`.
    pub fn get_col(&self, name: &str) -> Result<&ColumnDef, SemanticError> {
        self.schema
            .column(name)
            .ok_or_else(|| SemanticError::ColumnNotFound(name.to_string()))
    }

    /// Checks `value` against the declared type of `column`.
    pub fn check_type(column: &ColumnDef, value: &Value) -> Result<(), SemanticError> {
        if value.data_type() != column.data_type {
            return Err(SemanticError::TypeMismatch {
                column: column.name.clone(),
                expected: column.data_type,
                found: value.data_type(),
            });
        }
        Ok(())
    }

    /// Full scan for an existing row holding `value` in `column`.
    pub fn contains_value(&self, column: &str, value: &Value) -> bool {
        self.rows.iter().any(|row| row.get(column) == Some(value))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
