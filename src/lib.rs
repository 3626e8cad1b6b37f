pub mod ast;
pub mod config;
pub mod data_type;
pub mod database;
pub mod error;
pub mod parser;
pub mod row;
pub mod storage;
pub mod table;
pub mod tokenizer;
pub mod value;

pub use config::Config;
pub use data_type::DataType;
pub use database::{Database, Outcome, QueryResult};
pub use error::{Error, Result, SemanticError};
pub use row::Row;
pub use table::{ColumnDef, Schema, Table};
pub use value::Value;
