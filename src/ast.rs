use std::fmt;

use crate::{ColumnDef, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateTable(CreateTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    /// Explicit target columns; `None` means every declared column in order.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnsSelect {
    Star,
    ColumnsNames(Vec<String>),
}

/// `INNER JOIN <table> [alias] ON <left> = <right>`, an equi-join.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub table: String,
    /// Defaults to the table name when no alias is written.
    pub alias: String,
    pub left_column: String,
    pub right_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByClause {
    pub column: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: ColumnsSelect,
    pub table: String,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub order_by: Vec<OrderByClause>,
    pub limit: Option<usize>,
}

impl Select {
    /// `SELECT * FROM <table>` with no other clause.
    pub fn all_from(table: impl Into<String>) -> Self {
        Self {
            columns: ColumnsSelect::Star,
            table: table.into(),
            joins: Vec::new(),
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn with_where(mut self, expr: Expr) -> Self {
        self.where_clause = Some(expr);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    /// Applied in order, so a repeated column keeps its last value.
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// Expression tree built once per statement and evaluated per row.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Column(String),
    Binary {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Builds `<column> <op> <literal>`, the only comparison shape WHERE accepts.
    pub fn compare(column: impl Into<String>, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::Binary {
            left: Box::new(Self::Column(column.into())),
            op,
            right: Box::new(Self::Literal(value.into())),
        }
    }

    pub fn and(self, right: Expr) -> Self {
        Self::Logical {
            left: Box::new(self),
            op: LogicalOp::And,
            right: Box::new(right),
        }
    }

    pub fn or(self, right: Expr) -> Self {
        Self::Logical {
            left: Box::new(self),
            op: LogicalOp::Or,
            right: Box::new(right),
        }
    }
}
