use crate::{
    Value,
    ast::{
        ColumnsSelect, ComparisonOp, CreateTable, Delete, Expr, Insert, Join, LogicalOp,
        OrderByClause, Select, SortDirection, Statement, Update,
    },
    config::Config,
    error::{Result, SemanticError},
    parser::parse_sql,
    row::Row,
    storage::Storage,
    table::{Schema, Table},
};
use bitvec::prelude::*;
use std::{cmp::Ordering, collections::HashMap, path::Path};
use tracing::{debug, info};

/// The main entry point for the query engine.
///
/// Owns every table of one data directory. All tables are loaded when the database is
/// opened; afterwards the in-memory copy is authoritative and each mutating statement
/// rewrites its table file before returning. Calls must be serialized by the caller.
#[derive(Debug)]
pub struct Database {
    /// Tables keyed by their lowercased name.
    tables: HashMap<String, Table>,
    storage: Storage,
}

/// Represents the result of a successful `SELECT` query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set.
    pub columns: Vec<String>,
    /// The projected rows, in result order.
    pub rows: Vec<Row>,
}

/// What a statement run through [Database::execute] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    Inserted,
    Updated(usize),
    Deleted(usize),
    Rows(QueryResult),
}

fn table_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Database {
    /// Opens the database stored in `dir`, creating the directory if needed, and
    /// loads every table listed in its `schema.json`.
    ///
    /// # Example
    /// ```
    /// use flatdb::{Database, Value};
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::open(dir.path()).unwrap();
    /// db.execute("CREATE TABLE users (id INT PRIMARY KEY)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1)").unwrap();
    ///
    /// let reopened = Database::open(dir.path()).unwrap();
    /// let result = reopened.query("SELECT * FROM users").unwrap();
    /// assert_eq!(result.rows[0].get("id"), Some(&Value::Int(1)));
    /// ```
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let storage = Storage::open(dir.as_ref())?;
        let tables = storage
            .load_all()?
            .into_iter()
            .map(|table| (table_key(&table.name), table))
            .collect::<HashMap<_, _>>();

        info!(dir = %storage.dir().display(), tables = tables.len(), "opened database");
        Ok(Self { tables, storage })
    }

    pub fn with_config(config: Config) -> Result<Self> {
        Self::open(config.data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        self.storage.dir()
    }

    /// Retrieves a reference to a table by name, ignoring case.
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.tables.get(&table_key(name))
    }

    fn table(&self, name: &str) -> std::result::Result<&Table, SemanticError> {
        self.get_table(name)
            .ok_or_else(|| SemanticError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> std::result::Result<&mut Table, SemanticError> {
        self.tables
            .get_mut(&table_key(name))
            .ok_or_else(|| SemanticError::TableNotFound(name.to_string()))
    }

    /// Returns the names of all tables, sorted.
    pub fn list_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.values().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Tokenizes, parses and runs one SQL statement.
    ///
    /// # Errors
    /// Returns the lex, parse or semantic error that aborted the statement, or a
    /// storage error if the table file could not be rewritten.
    ///
    /// # Example
    /// ```
    /// use flatdb::{Database, Outcome};
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::open(dir.path()).unwrap();
    /// db.execute("CREATE TABLE users (id INT)").unwrap();
    /// db.execute("INSERT INTO users VALUES (1)").unwrap();
    ///
    /// let outcome = db.execute("DELETE FROM users WHERE id > 12").unwrap();
    /// assert_eq!(outcome, Outcome::Deleted(0));
    /// ```
    pub fn execute(&mut self, sql: &str) -> Result<Outcome> {
        let statement = parse_sql(sql)?;
        self.run(statement)
    }

    /// Runs a statement that was parsed or built by the caller.
    pub fn run(&mut self, statement: Statement) -> Result<Outcome> {
        debug!(?statement, "executing statement");
        match statement {
            Statement::CreateTable(create) => {
                self.create_table(create)?;
                Ok(Outcome::Created)
            }
            Statement::Insert(insert) => {
                self.insert(insert)?;
                Ok(Outcome::Inserted)
            }
            Statement::Update(update) => self.update(update).map(Outcome::Updated),
            Statement::Delete(delete) => self.delete(delete).map(Outcome::Deleted),
            Statement::Select(select) => self.select(&select).map(Outcome::Rows),
        }
    }

    /// Parses and runs a `SELECT`. Any other statement is rejected without effect.
    ///
    /// # Example
    ///
    /// ```
    /// use flatdb::{Database, Value};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut db = Database::open(dir.path()).unwrap();
    /// db.execute("CREATE TABLE products (name TEXT, price INT)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Laptop', 1200)").unwrap();
    /// db.execute("INSERT INTO products VALUES ('Mouse', 25)").unwrap();
    ///
    /// let result = db.query("SELECT name, price FROM products ORDER BY price").unwrap();
    ///
    /// assert_eq!(result.columns, vec!["name", "price"]);
    /// assert_eq!(result.rows.len(), 2);
    /// assert_eq!(result.rows[0].get("name"), Some(&Value::from("Mouse")));
    /// assert_eq!(result.rows[1].get("name"), Some(&Value::from("Laptop")));
    /// ```
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        match parse_sql(sql)? {
            Statement::Select(select) => self.select(&select),
            _ => Err(SemanticError::Unsupported("statement in a read-only query".into()).into()),
        }
    }

    /// Rewrites the file of `name` and the schema membership list.
    fn persist(&self, name: &str) -> Result<()> {
        let table = self.table(name)?;
        self.storage
            .save_table(table, self.tables.values().map(|t| t.name.as_str()))
    }

    /// Creates an empty table and persists it.
    ///
    /// # Errors
    /// Returns an error if a table with the same name (ignoring case) already exists or
    /// if two columns share a name.
    pub fn create_table(&mut self, create: CreateTable) -> Result<()> {
        let key = table_key(&create.name);
        if self.tables.contains_key(&key) {
            return Err(SemanticError::TableExists(create.name).into());
        }
        for (i, column) in create.columns.iter().enumerate() {
            if create.columns[..i]
                .iter()
                .any(|c| c.name.eq_ignore_ascii_case(&column.name))
            {
                return Err(SemanticError::DuplicateColumn(column.name.clone()).into());
            }
        }

        let table = Table::new(
            create.name.clone(),
            Schema {
                columns: create.columns,
            },
        );
        self.tables.insert(key, table);
        self.persist(&create.name)?;

        info!(table = %create.name, "created table");
        Ok(())
    }

    /// Appends one row built from literal values.
    ///
    /// Target columns are the explicit list or every declared column in order;
    /// columns left out are simply absent from the row. Each value must match its
    /// column's declared type, and primary-key or unique columns are checked against
    /// every existing row before anything is written.
    pub fn insert(&mut self, insert: Insert) -> Result<()> {
        let table = self.table(&insert.table)?;

        let names: Vec<&str> = match &insert.columns {
            Some(columns) => columns.iter().map(String::as_str).collect(),
            None => table.schema.column_names().collect(),
        };
        if names.len() != insert.values.len() {
            return Err(SemanticError::ColumnCountMismatch {
                expected: names.len(),
                found: insert.values.len(),
            }
            .into());
        }

        let mut row = Row::new();
        for (name, expr) in names.iter().zip(&insert.values) {
            let column = table.get_col(name)?;
            if row.contains(&column.name) {
                return Err(SemanticError::DuplicateColumn(column.name.clone()).into());
            }

            let Expr::Literal(value) = expr else {
                return Err(SemanticError::Unsupported("non-literal value in INSERT".into()).into());
            };
            Table::check_type(column, value)?;

            if column.requires_unique() && table.contains_value(&column.name, value) {
                return Err(SemanticError::ConstraintViolation {
                    table: table.name.clone(),
                    column: column.name.clone(),
                }
                .into());
            }

            row.set(column.name.clone(), value.clone());
        }

        self.table_mut(&insert.table)?.rows.push(row);
        self.persist(&insert.table)?;
        debug!(table = %insert.table, "inserted row");
        Ok(())
    }

    /// Evaluates an optional `WHERE` clause against every row of `table`.
    ///
    /// Returns one bit per row, set when the row matches. A missing clause matches
    /// every row. Column names are resolved against the table schema first, so an
    /// unknown column fails even on an empty table.
    fn filter_rows(&self, table: &Table, where_clause: Option<&Expr>) -> Result<BitVec> {
        let Some(expr) = where_clause else {
            return Ok(bitvec![1; table.row_count()]);
        };

        let expr = Scope::new(table).bind(expr)?;
        let mut mask = BitVec::with_capacity(table.row_count());
        for row in &table.rows {
            mask.push(evaluate(row, &expr)?);
        }
        Ok(mask)
    }

    /// Executes an `UPDATE` statement and returns the number of rows it matched.
    ///
    /// The `SET` list is validated (known column, literal value of the declared type,
    /// uniqueness) and the `WHERE` clause is evaluated over all rows before any row is
    /// modified, so a failing update leaves the table untouched. The table is
    /// persisted once after the pass.
    pub fn update(&mut self, update: Update) -> Result<usize> {
        let table = self.table(&update.table)?;
        let mask = self.filter_rows(table, update.where_clause.as_ref())?;
        let matched = mask.count_ones();

        let mut assignments: Vec<(String, Value)> = Vec::with_capacity(update.assignments.len());
        for (name, expr) in &update.assignments {
            let column = table.get_col(name)?;
            let Expr::Literal(value) = expr else {
                return Err(
                    SemanticError::Unsupported("non-literal value in SET clause".into()).into(),
                );
            };
            Table::check_type(column, value)?;

            if column.requires_unique() && matched > 0 {
                let clash = table
                    .rows
                    .iter()
                    .zip(mask.iter().by_vals())
                    .any(|(row, hit)| !hit && row.get(&column.name) == Some(value));
                if clash || matched > 1 {
                    return Err(SemanticError::ConstraintViolation {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    }
                    .into());
                }
            }

            assignments.push((column.name.clone(), value.clone()));
        }

        let table = self.table_mut(&update.table)?;
        for (row, hit) in table.rows.iter_mut().zip(mask.iter().by_vals()) {
            if hit {
                for (column, value) in &assignments {
                    row.set(column.clone(), value.clone());
                }
            }
        }

        self.persist(&update.table)?;
        debug!(table = %update.table, matched, "updated rows");
        Ok(matched)
    }

    /// Executes a `DELETE` statement and returns the number of removed rows.
    ///
    /// Deletion is performed in two phases: the `WHERE` clause is evaluated over
    /// every row into a bitmap, then the marked rows are dropped in one pass.
    pub fn delete(&mut self, delete: Delete) -> Result<usize> {
        let table = self.table(&delete.table)?;
        let mask = self.filter_rows(table, delete.where_clause.as_ref())?;
        let removed = mask.count_ones();

        let table = self.table_mut(&delete.table)?;
        let mut marks = mask.iter().by_vals();
        table.rows.retain(|_| !marks.next().unwrap_or(false));

        self.persist(&delete.table)?;
        debug!(table = %delete.table, removed, "deleted rows");
        Ok(removed)
    }

    /// Executes a `SELECT` and returns the resulting data set. Nothing is written.
    ///
    /// Pipeline:
    /// 1. **Copies** the rows of the base table.
    /// 2. **Joins** each `INNER JOIN` table with a nested loop, keeping pairs whose
    ///    join columns are equal; a pair missing either join column is skipped.
    ///    Joined columns are added under `<table>.<column>` keys.
    /// 3. **Filters** rows with the `WHERE` clause.
    /// 4. **Projects** the requested columns; `*` takes the key set of the first
    ///    filtered row.
    /// 5. **Sorts** the projected rows by the `ORDER BY` keys, first key most
    ///    significant; a row missing a key sorts before every row that has it.
    /// 6. **Limits** the number of rows returned.
    ///
    /// # Errors
    /// Returns an error if a table does not exist, a named column cannot be resolved,
    /// or the `WHERE` clause fails on some row.
    pub fn select(&self, select: &Select) -> Result<QueryResult> {
        let base = self.table(&select.table)?;
        let mut scope = Scope::new(base);
        let mut rows: Vec<Row> = base.rows.clone();

        for join in &select.joins {
            let joined = self.table(&join.table)?;
            // Joined columns are keyed by table name, so a second copy would collide.
            if joined.name.eq_ignore_ascii_case(&base.name)
                || scope.joins.iter().any(|(_, t)| t.name.eq_ignore_ascii_case(&joined.name))
            {
                return Err(SemanticError::DuplicateTable(join.table.clone()).into());
            }
            let (left_key, right_column) = scope.resolve_join(join, joined)?;
            rows = nested_loop_join(&rows, &left_key, joined, &right_column);
            scope.joins.push((join, joined));
        }

        if let Some(expr) = &select.where_clause {
            let expr = scope.bind(expr)?;
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if evaluate(&row, &expr)? {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        let (columns, keys): (Vec<String>, Vec<String>) = match &select.columns {
            ColumnsSelect::Star => {
                let names: Vec<String> = rows
                    .first()
                    .map(|row| row.columns().map(String::from).collect())
                    .unwrap_or_default();
                (names.clone(), names)
            }
            ColumnsSelect::ColumnsNames(names) => {
                let keys = names
                    .iter()
                    .map(|name| scope.resolve(name))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                (names.clone(), keys)
            }
        };

        let mut rows: Vec<Row> = rows
            .iter()
            .map(|row| {
                let mut projected = Row::new();
                for (column, key) in columns.iter().zip(&keys) {
                    if let Some(value) = row.get(key) {
                        projected.set(column.clone(), value.clone());
                    }
                }
                projected
            })
            .collect();

        if !select.order_by.is_empty() {
            self.sort(&mut rows, &scope, &select.order_by, &columns, &keys)?;
        }

        if let Some(limit) = select.limit {
            rows.truncate(limit);
        }

        Ok(QueryResult { columns, rows })
    }

    /// Sorts the projected rows in place based on the `ORDER BY` clauses.
    ///
    /// A clause names either an output column or a column of the queried tables; the
    /// latter sorts by the output column it was projected to. A valid column that was
    /// not projected is absent from every row and leaves the order unchanged.
    ///
    /// The sort is stable; for each comparison it walks the clauses in order and stops
    /// at the first one that tells the rows apart.
    fn sort(
        &self,
        rows: &mut [Row],
        scope: &Scope<'_>,
        order_by: &[OrderByClause],
        columns: &[String],
        keys: &[String],
    ) -> Result<()> {
        let mut sort: Vec<(&str, SortDirection)> = Vec::with_capacity(order_by.len());
        for clause in order_by {
            let output = match columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(&clause.column))
            {
                found @ Some(_) => found,
                None => {
                    let key = scope.resolve(&clause.column)?;
                    keys.iter().position(|k| k.eq_ignore_ascii_case(&key))
                }
            };
            if let Some(i) = output {
                sort.push((columns[i].as_str(), clause.direction));
            }
        }

        rows.sort_by(|a, b| {
            for (key, direction) in &sort {
                // Option orders None first, so absent values sort lowest.
                let mut ord = a.get(key).cmp(&b.get(key));
                if *direction == SortDirection::Desc {
                    ord = ord.reverse();
                }
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        Ok(())
    }
}

/// Keeps every pair of a working row and a `joined` row whose join columns hold
/// equal values, merging the joined row in under `<table>.<column>` keys.
fn nested_loop_join(rows: &[Row], left_key: &str, joined: &Table, right_column: &str) -> Vec<Row> {
    let mut out = Vec::new();
    for row in rows {
        let Some(left) = row.get(left_key) else {
            continue;
        };
        for other in &joined.rows {
            if other.get(right_column) != Some(left) {
                continue;
            }
            let mut merged = row.clone();
            for (column, value) in other.iter() {
                merged.set(format!("{}.{}", joined.name, column), value.clone());
            }
            out.push(merged);
        }
    }
    out
}

/// Name resolution for one `SELECT` (or the single table of an UPDATE/DELETE).
///
/// Maps the column names a statement uses to the row keys the pipeline produces:
/// a bare name or one qualified by the base table becomes the declared column name,
/// and a name qualified by a joined table or its alias becomes `<table>.<column>`.
struct Scope<'a> {
    base: &'a Table,
    joins: Vec<(&'a Join, &'a Table)>,
}

impl<'a> Scope<'a> {
    fn new(base: &'a Table) -> Self {
        Self {
            base,
            joins: Vec::new(),
        }
    }

    fn resolve(&self, name: &str) -> std::result::Result<String, SemanticError> {
        let not_found = || SemanticError::ColumnNotFound(name.to_string());

        let Some((qualifier, column)) = name.split_once('.') else {
            return Ok(self.base.get_col(name)?.name.clone());
        };

        if qualifier.eq_ignore_ascii_case(&self.base.name) {
            return self
                .base
                .schema
                .column(column)
                .map(|col| col.name.clone())
                .ok_or_else(not_found);
        }

        for (join, table) in &self.joins {
            if names_join(join, qualifier) {
                let col = table.schema.column(column).ok_or_else(not_found)?;
                return Ok(format!("{}.{}", table.name, col.name));
            }
        }

        Err(not_found())
    }

    /// Resolves the two sides of `ON a = b` into (key in the working row, column of
    /// the joined table). Either side may name the joined table.
    fn resolve_join(
        &self,
        join: &Join,
        joined: &Table,
    ) -> std::result::Result<(String, String), SemanticError> {
        let in_joined = |name: &str| -> Option<String> {
            let column = match name.split_once('.') {
                Some((qualifier, column)) if names_join(join, qualifier) => column,
                Some(_) => return None,
                None => name,
            };
            joined.schema.column(column).map(|col| col.name.clone())
        };

        let left = self.resolve(&join.left_column);
        if let (Ok(left), Some(right)) = (&left, in_joined(&join.right_column)) {
            return Ok((left.clone(), right));
        }
        if let (Ok(left), Some(right)) = (self.resolve(&join.right_column), in_joined(&join.left_column)) {
            return Ok((left, right));
        }

        let missing = match left {
            Err(_) => &join.left_column,
            Ok(_) => &join.right_column,
        };
        Err(SemanticError::ColumnNotFound(missing.clone()))
    }

    /// Rewrites every column reference in `expr` to its row key.
    fn bind(&self, expr: &Expr) -> std::result::Result<Expr, SemanticError> {
        Ok(match expr {
            Expr::Literal(value) => Expr::Literal(value.clone()),
            Expr::Column(name) => Expr::Column(self.resolve(name)?),
            Expr::Binary { left, op, right } => Expr::Binary {
                left: Box::new(self.bind(left)?),
                op: *op,
                right: Box::new(self.bind(right)?),
            },
            Expr::Logical { left, op, right } => Expr::Logical {
                left: Box::new(self.bind(left)?),
                op: *op,
                right: Box::new(self.bind(right)?),
            },
        })
    }
}

fn names_join(join: &Join, qualifier: &str) -> bool {
    qualifier.eq_ignore_ascii_case(&join.alias) || qualifier.eq_ignore_ascii_case(&join.table)
}

/// Evaluates a WHERE clause expression against a specific row.
///
/// - **Comparisons** must be `<column> <op> <literal>`; a column absent from the row
///   is an error, not a non-match.
/// - **AND** / **OR** evaluate both sides before combining them.
fn evaluate(row: &Row, expr: &Expr) -> std::result::Result<bool, SemanticError> {
    match expr {
        Expr::Binary { left, op, right } => match (left.as_ref(), right.as_ref()) {
            (Expr::Column(column), Expr::Literal(literal)) => {
                let value = row
                    .get(column)
                    .ok_or_else(|| SemanticError::ColumnNotFound(column.clone()))?;
                compare_values(value, *op, literal)
            }
            _ => Err(SemanticError::Unsupported(
                "comparison in WHERE clause, expected <column> <op> <literal>".into(),
            )),
        },
        Expr::Logical { left, op, right } => {
            let left = evaluate(row, left)?;
            let right = evaluate(row, right)?;
            Ok(match op {
                LogicalOp::And => left && right,
                LogicalOp::Or => left || right,
            })
        }
        Expr::Literal(_) | Expr::Column(_) => Err(SemanticError::Unsupported(
            "expression in WHERE clause, expected a comparison".into(),
        )),
    }
}

/// Compares a row value with a literal.
///
/// Two integers compare numerically with any operator. Any other pairing is
/// compared by textual form and only supports `=` and `!=`.
fn compare_values(
    left: &Value,
    op: ComparisonOp,
    right: &Value,
) -> std::result::Result<bool, SemanticError> {
    if let (Value::Int(l), Value::Int(r)) = (left, right) {
        return Ok(match op {
            ComparisonOp::Eq => l == r,
            ComparisonOp::NotEq => l != r,
            ComparisonOp::Lt => l < r,
            ComparisonOp::Gt => l > r,
            ComparisonOp::LtEq => l <= r,
            ComparisonOp::GtEq => l >= r,
        });
    }

    let (left, right) = (left.to_string(), right.to_string());
    match op {
        ComparisonOp::Eq => Ok(left == right),
        ComparisonOp::NotEq => Ok(left != right),
        other => Err(SemanticError::IncomparableOperands(other.to_string())),
    }
}
