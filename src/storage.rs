//! Flat-file persistence: one pretty-printed JSON file per table plus a
//! `schema.json` membership list, rewritten whole on every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::table::{ColumnDef, Schema, Table};

const SCHEMA_FILE: &str = "schema.json";

/// Borrowed view of a table as written to `<name>.json`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TableFileRef<'a> {
    name: &'a str,
    columns: &'a [ColumnDef],
    rows: &'a [Row],
}

/// Owned form of `<name>.json` as read back.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TableFile {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnDef>,
    #[serde(default)]
    rows: Vec<Row>,
}

/// Reads and writes table files under one data directory.
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    /// Opens `dir`, creating it and an empty `schema.json` when missing.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        let storage = Self { dir };
        if !storage.schema_path().exists() {
            info!(dir = %storage.dir.display(), "initializing empty data directory");
            storage.write_schema(std::iter::empty())?;
        }
        Ok(storage)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    /// Path of the file holding `table`.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }

    /// Reads every table named in `schema.json`. A name whose file is missing comes
    /// back as an empty shell without columns.
    pub fn load_all(&self) -> Result<Vec<Table>> {
        let schema: BTreeMap<String, serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(self.schema_path())?)?;

        let mut tables: Vec<Table> = Vec::with_capacity(schema.len());
        for name in schema.into_keys() {
            if tables.iter().any(|t| t.name.eq_ignore_ascii_case(&name)) {
                return Err(Error::CorruptTable {
                    table: name,
                    reason: "schema.json lists the table more than once".into(),
                });
            }

            let path = self.table_path(&name);
            if !path.exists() {
                warn!(table = %name, path = %path.display(), "table file missing, loading empty table");
                tables.push(Table::new(name, Schema::default()));
                continue;
            }

            let table = self.load_table(&name, &path)?;
            info!(table = %table.name, rows = table.row_count(), "loaded table");
            tables.push(table);
        }
        Ok(tables)
    }

    fn load_table(&self, name: &str, path: &Path) -> Result<Table> {
        let file: TableFile = serde_json::from_str(&fs::read_to_string(path)?)?;

        if !file.name.eq_ignore_ascii_case(name) {
            return Err(Error::CorruptTable {
                table: name.to_string(),
                reason: format!("file declares table '{}'", file.name),
            });
        }

        let schema = Schema {
            columns: file.columns,
        };
        for row in &file.rows {
            if let Some(unknown) = row.columns().find(|col| schema.column(col).is_none()) {
                return Err(Error::CorruptTable {
                    table: name.to_string(),
                    reason: format!("row holds undeclared column '{unknown}'"),
                });
            }
        }

        let mut table = Table::new(name.to_string(), schema);
        table.rows = file.rows;
        Ok(table)
    }

    /// Rewrites `<table>.json` in full and then `schema.json` from `all_tables`.
    pub fn save_table<'a>(
        &self,
        table: &Table,
        all_tables: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let file = TableFileRef {
            name: &table.name,
            columns: &table.schema.columns,
            rows: &table.rows,
        };
        let path = self.table_path(&table.name);
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        debug!(table = %table.name, rows = table.row_count(), path = %path.display(), "persisted table");

        self.write_schema(all_tables)
    }

    fn write_schema<'a>(&self, tables: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let schema: BTreeMap<&str, serde_json::Value> = tables
            .into_iter()
            .map(|name| (name, serde_json::Value::Object(serde_json::Map::new())))
            .collect();
        fs::write(self.schema_path(), serde_json::to_string_pretty(&schema)?)?;
        Ok(())
    }
}
