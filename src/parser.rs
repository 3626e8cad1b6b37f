use crate::error::ParseError;
use crate::tokenizer::{Token, TokenKind};
use crate::{ColumnDef, DataType, ast::*};

/// Recursive-descent parser with one token of lookahead. Parses exactly one
/// statement; there is no error recovery.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses one statement, an optional trailing `;`, and requires end of input.
    pub fn parse(&mut self) -> Result<Statement, ParseError> {
        let statement = match self.current_token().kind {
            TokenKind::Create => self.parse_create_table(),
            TokenKind::Insert => self.parse_insert(),
            TokenKind::Select => self.parse_select(),
            TokenKind::Update => self.parse_update(),
            TokenKind::Delete => self.parse_delete(),
            _ => Err(self.error("Expected a statement")),
        }?;

        // semicolon is optional in SQL so skip it
        self.matches(&TokenKind::Semicolon);

        if !self.is_at_end() {
            return Err(self.error("Expected end of statement"));
        }

        Ok(statement)
    }

    //helpers
    fn current_token(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_token().kind, TokenKind::Eof)
    }

    fn error(&self, message: &str) -> ParseError {
        let token = self.current_token();
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", token.lexeme),
        };
        ParseError {
            message: format!("{message}, found {found}"),
            position: token.offset,
        }
    }

    /// Advances past the current token if it is `expected`.
    fn matches(&mut self, expected: &TokenKind) -> bool {
        if self.current_token().kind == *expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: TokenKind, message: &str) -> Result<(), ParseError> {
        if self.matches(&expected) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_ident(&mut self, message: &str) -> Result<String, ParseError> {
        match self.current_token().kind {
            TokenKind::Ident => {
                let name = self.current_token().lexeme.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    /// `<ident> [. <ident>]`, kept as the dotted text.
    fn consume_column_ref(&mut self, message: &str) -> Result<String, ParseError> {
        let name = self.consume_ident(message)?;
        if self.matches(&TokenKind::Dot) {
            let column = self.consume_ident("Expected column name after '.'")?;
            return Ok(format!("{name}.{column}"));
        }
        Ok(name)
    }

    fn consume_data_type(&mut self) -> Result<DataType, ParseError> {
        let data_type = match self.current_token().kind {
            TokenKind::Int => DataType::Int,
            TokenKind::Text => DataType::Text,
            _ => return Err(self.error("Expected data type INT or TEXT")),
        };
        self.advance();
        Ok(data_type)
    }

    /// A NUMBER or STRING literal.
    fn parse_value(&mut self, message: &str) -> Result<Expr, ParseError> {
        match self.current_token().literal() {
            Some(value) => {
                self.advance();
                Ok(Expr::Literal(value))
            }
            None => Err(self.error(message)),
        }
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef, ParseError> {
        let name = self.consume_ident("Expected column name")?;
        let data_type = self.consume_data_type()?;

        let mut column = ColumnDef::new(name, data_type);
        if self.matches(&TokenKind::Primary) {
            self.consume(TokenKind::Key, "Expected KEY after PRIMARY")?;
            column.is_primary_key = true;
        } else if self.matches(&TokenKind::Unique) {
            column.is_unique = true;
        }

        Ok(column)
    }

    fn parse_create_table(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::Create, "Expected CREATE")?;
        self.consume(TokenKind::Table, "Expected TABLE after CREATE")?;
        let name = self.consume_ident("Expected table name")?;
        self.consume(TokenKind::LeftParen, "Expected '(' after table name")?;

        let mut columns = vec![self.parse_column_def()?];
        while self.matches(&TokenKind::Comma) {
            columns.push(self.parse_column_def()?);
        }

        self.consume(TokenKind::RightParen, "Expected ',' or ')' after column definition")?;
        Ok(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_insert(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::Insert, "Expected INSERT")?;
        self.consume(TokenKind::Into, "Expected INTO after INSERT")?;
        let table = self.consume_ident("Expected table name after INTO")?;

        let columns = if self.matches(&TokenKind::LeftParen) {
            let mut columns = vec![self.consume_ident("Expected column name")?];
            while self.matches(&TokenKind::Comma) {
                columns.push(self.consume_ident("Expected column name")?);
            }
            self.consume(TokenKind::RightParen, "Expected ')' after column list")?;
            Some(columns)
        } else {
            None
        };

        self.consume(TokenKind::Values, "Expected VALUES keyword")?;
        self.consume(TokenKind::LeftParen, "Expected '(' before values")?;
        let mut values = vec![self.parse_value("Expected a value (number or string)")?];
        while self.matches(&TokenKind::Comma) {
            values.push(self.parse_value("Expected a value (number or string)")?);
        }
        self.consume(TokenKind::RightParen, "Expected ')' after values")?;

        Ok(Statement::Insert(Insert {
            table,
            columns,
            values,
        }))
    }

    fn parse_select(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::Select, "Expected SELECT")?;

        let columns = if self.matches(&TokenKind::Star) {
            ColumnsSelect::Star
        } else {
            let mut names = vec![self.consume_column_ref("Expected column name or '*'")?];
            while self.matches(&TokenKind::Comma) {
                names.push(self.consume_column_ref("Expected column name")?);
            }
            ColumnsSelect::ColumnsNames(names)
        };

        self.consume(TokenKind::From, "Expected FROM after column list")?;
        let table = self.consume_ident("Expected table name after FROM")?;

        let mut joins = Vec::new();
        while self.matches(&TokenKind::Inner) {
            joins.push(self.parse_join()?);
        }

        let where_clause = if self.matches(&TokenKind::Where) {
            Some(self.parse_logical_expr()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.matches(&TokenKind::Order) {
            self.consume(TokenKind::By, "Expected BY after ORDER")?;
            loop {
                let column = self.consume_column_ref("Expected column name in ORDER BY")?;
                let direction = if self.matches(&TokenKind::Desc) {
                    SortDirection::Desc
                } else {
                    self.matches(&TokenKind::Asc);
                    SortDirection::Asc
                };
                order_by.push(OrderByClause { column, direction });
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let limit = if self.matches(&TokenKind::Limit) {
            match self.current_token().kind {
                TokenKind::Number(n) => {
                    self.advance();
                    Some(n as usize)
                }
                _ => return Err(self.error("Expected number after LIMIT")),
            }
        } else {
            None
        };

        Ok(Statement::Select(Select {
            columns,
            table,
            joins,
            where_clause,
            order_by,
            limit,
        }))
    }

    /// `JOIN <table> [alias] ON <column> = <column>`, after `INNER`.
    fn parse_join(&mut self) -> Result<Join, ParseError> {
        self.consume(TokenKind::Join, "Expected JOIN after INNER")?;
        let table = self.consume_ident("Expected table name to join")?;

        let alias = match self.current_token().kind {
            TokenKind::Ident => self.consume_ident("Expected alias")?,
            _ => table.clone(),
        };

        self.consume(TokenKind::On, "Expected ON after JOIN table")?;
        let left_column = self.consume_column_ref("Expected left column in JOIN condition")?;
        self.consume(TokenKind::Equal, "Expected '=' in JOIN condition")?;
        let right_column = self.consume_column_ref("Expected right column in JOIN condition")?;

        Ok(Join {
            table,
            alias,
            left_column,
            right_column,
        })
    }

    /// `<comparison> ((AND | OR) <comparison>)*`, folded strictly left to right with
    /// no precedence between AND and OR.
    fn parse_logical_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;

        loop {
            let op = match self.current_token().kind {
                TokenKind::And => LogicalOp::And,
                TokenKind::Or => LogicalOp::Or,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::Logical {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// `<column> <op> <literal>`
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let column = self.consume_column_ref("Expected column name")?;

        let op = match self.current_token().kind {
            TokenKind::Equal => ComparisonOp::Eq,
            TokenKind::NotEqual => ComparisonOp::NotEq,
            TokenKind::Less => ComparisonOp::Lt,
            TokenKind::Greater => ComparisonOp::Gt,
            TokenKind::LessEqual => ComparisonOp::LtEq,
            TokenKind::GreaterEqual => ComparisonOp::GtEq,
            _ => return Err(self.error("Expected comparison operator")),
        };
        self.advance();

        let value = self.parse_value("Expected literal value in expression")?;

        Ok(Expr::Binary {
            left: Box::new(Expr::Column(column)),
            op,
            right: Box::new(value),
        })
    }

    fn parse_update(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::Update, "Expected UPDATE")?;
        let table = self.consume_ident("Expected table name after UPDATE")?;
        self.consume(TokenKind::Set, "Expected SET after table name")?;

        let mut assignments = Vec::new();
        loop {
            let column = self.consume_ident("Expected column name in SET clause")?;
            self.consume(TokenKind::Equal, "Expected '=' after column name in SET clause")?;
            let value = self.parse_value("Expected a value (number or string)")?;
            assignments.push((column, value));
            if !self.matches(&TokenKind::Comma) {
                break;
            }
        }

        // UPDATE and DELETE take a single comparison, not an AND/OR chain.
        let where_clause = if self.matches(&TokenKind::Where) {
            Some(self.parse_comparison()?)
        } else {
            None
        };

        Ok(Statement::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_delete(&mut self) -> Result<Statement, ParseError> {
        self.consume(TokenKind::Delete, "Expected DELETE")?;
        self.consume(TokenKind::From, "Expected FROM after DELETE")?;
        let table = self.consume_ident("Expected table name after FROM")?;

        let where_clause = if self.matches(&TokenKind::Where) {
            Some(self.parse_comparison()?)
        } else {
            None
        };

        Ok(Statement::Delete(Delete {
            table,
            where_clause,
        }))
    }
}

/// Tokenizes and parses a single statement.
pub fn parse_sql(sql: &str) -> crate::Result<Statement> {
    let tokens = crate::tokenizer::Tokenizer::new(sql).tokenize()?;
    Ok(Parser::new(tokens).parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;
    use crate::error::Error;
    use crate::tokenizer::Tokenizer;

    fn parse(sql: &str) -> Statement {
        let tokens = Tokenizer::new(sql).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn parse_err(sql: &str) -> ParseError {
        let tokens = Tokenizer::new(sql).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap_err()
    }

    fn cmp(column: &str, op: ComparisonOp, value: i64) -> Expr {
        Expr::compare(column, op, value)
    }

    #[test]
    fn test_parse_create_table() {
        let statement = parse("CREATE TABLE users (id INT PRIMARY KEY, name TEXT, email TEXT UNIQUE)");

        match statement {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, "users");
                assert_eq!(ct.columns.len(), 3);
                assert_eq!(ct.columns[0].name, "id");
                assert_eq!(ct.columns[0].data_type, DataType::Int);
                assert!(ct.columns[0].is_primary_key);
                assert!(!ct.columns[0].is_unique);
                assert_eq!(ct.columns[1], ColumnDef::new("name", DataType::Text));
                assert!(ct.columns[2].is_unique);
                assert!(!ct.columns[2].is_primary_key);
            }
            _ => panic!("Expected CreateTable"),
        }
    }

    #[test]
    fn test_parse_create_table_errors() {
        let err = parse_err("CREATE TABLE users (id FLOAT)");
        assert!(err.message.starts_with("Expected data type INT or TEXT"));
        assert_eq!(err.position, 23);

        let err = parse_err("CREATE TABLE users (id INT PRIMARY)");
        assert!(err.message.starts_with("Expected KEY after PRIMARY"));

        let err = parse_err("CREATE TABLE users (id INT");
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn test_parse_insert() {
        assert_eq!(
            parse("INSERT INTO users VALUES (1, 'Alice');"),
            Statement::Insert(Insert {
                table: "users".into(),
                columns: None,
                values: vec![Expr::Literal(Value::Int(1)), Expr::Literal("Alice".into())],
            })
        );

        assert_eq!(
            parse("insert into users (name, id) values ('Bob', 2)"),
            Statement::Insert(Insert {
                table: "users".into(),
                columns: Some(vec!["name".into(), "id".into()]),
                values: vec![Expr::Literal("Bob".into()), Expr::Literal(Value::Int(2))],
            })
        );
    }

    #[test]
    fn test_insert_values_must_be_literals() {
        let err = parse_err("INSERT INTO users VALUES (id)");
        assert!(err.message.starts_with("Expected a value"));
        assert_eq!(err.position, 26);
    }

    #[test]
    fn test_parse_select_star() {
        assert_eq!(
            parse("SELECT * FROM users"),
            Statement::Select(Select::all_from("users"))
        );
    }

    #[test]
    fn test_parse_select_full() {
        let statement = parse(
            "SELECT id, users.name FROM orders INNER JOIN users u ON uid = u.id \
             WHERE id > 1 AND name = 'x' ORDER BY id DESC, name LIMIT 5",
        );

        let Statement::Select(select) = statement else {
            panic!("Expected Select");
        };

        assert_eq!(
            select.columns,
            ColumnsSelect::ColumnsNames(vec!["id".into(), "users.name".into()])
        );
        assert_eq!(select.table, "orders");
        assert_eq!(
            select.joins,
            vec![Join {
                table: "users".into(),
                alias: "u".into(),
                left_column: "uid".into(),
                right_column: "u.id".into(),
            }]
        );
        assert_eq!(
            select.where_clause,
            Some(cmp("id", ComparisonOp::Gt, 1).and(Expr::compare("name", ComparisonOp::Eq, "x")))
        );
        assert_eq!(
            select.order_by,
            vec![
                OrderByClause {
                    column: "id".into(),
                    direction: SortDirection::Desc,
                },
                OrderByClause {
                    column: "name".into(),
                    direction: SortDirection::Asc,
                },
            ]
        );
        assert_eq!(select.limit, Some(5));
    }

    #[test]
    fn test_join_alias_defaults_to_table_name() {
        let Statement::Select(select) =
            parse("SELECT * FROM orders INNER JOIN users ON uid = id")
        else {
            panic!("Expected Select");
        };
        assert_eq!(select.joins[0].alias, "users");
    }

    #[test]
    fn test_logical_chain_is_left_associative_without_precedence() {
        let Statement::Select(select) = parse("SELECT * FROM t WHERE a = 1 OR a = 2 AND b = 3")
        else {
            panic!("Expected Select");
        };

        let expected = cmp("a", ComparisonOp::Eq, 1)
            .or(cmp("a", ComparisonOp::Eq, 2))
            .and(cmp("b", ComparisonOp::Eq, 3));
        assert_eq!(select.where_clause, Some(expected));
    }

    #[test]
    fn test_all_comparison_operators() {
        let ops = [
            ("=", ComparisonOp::Eq),
            ("!=", ComparisonOp::NotEq),
            ("<", ComparisonOp::Lt),
            (">", ComparisonOp::Gt),
            ("<=", ComparisonOp::LtEq),
            (">=", ComparisonOp::GtEq),
        ];
        for (symbol, op) in ops {
            let Statement::Delete(delete) = parse(&format!("DELETE FROM t WHERE a {symbol} 4"))
            else {
                panic!("Expected Delete");
            };
            assert_eq!(delete.where_clause, Some(cmp("a", op, 4)));
        }
    }

    #[test]
    fn test_where_rejects_column_on_the_right() {
        let err = parse_err("SELECT * FROM t WHERE a = b");
        assert!(err.message.starts_with("Expected literal value"));
        assert_eq!(err.position, 26);
    }

    #[test]
    fn test_parse_update() {
        assert_eq!(
            parse("UPDATE users SET name = 'Z', age = 3 WHERE id = 1"),
            Statement::Update(Update {
                table: "users".into(),
                assignments: vec![
                    ("name".into(), Expr::Literal("Z".into())),
                    ("age".into(), Expr::Literal(Value::Int(3))),
                ],
                where_clause: Some(cmp("id", ComparisonOp::Eq, 1)),
            })
        );
    }

    #[test]
    fn test_update_and_delete_take_a_single_comparison() {
        let err = parse_err("UPDATE users SET age = 3 WHERE id = 1 AND age = 2");
        assert!(err.message.starts_with("Expected end of statement"));

        let err = parse_err("DELETE FROM users WHERE id = 1 OR id = 2");
        assert!(err.message.starts_with("Expected end of statement"));
    }

    #[test]
    fn test_parse_delete() {
        assert_eq!(
            parse("DELETE FROM users"),
            Statement::Delete(Delete {
                table: "users".into(),
                where_clause: None,
            })
        );
    }

    #[test]
    fn test_unknown_statement() {
        let err = parse_err("DROP TABLE users");
        assert!(err.message.starts_with("Expected a statement"));
        assert_eq!(err.position, 0);

        let err = parse_err("");
        assert!(err.message.starts_with("Expected a statement"));
    }

    #[test]
    fn test_limit_requires_number() {
        let err = parse_err("SELECT * FROM t LIMIT 'x'");
        assert!(err.message.starts_with("Expected number after LIMIT"));
        assert_eq!(err.position, 22);
    }

    #[test]
    fn test_parse_sql_surfaces_lex_errors() {
        assert!(matches!(parse_sql("SELECT 'oops"), Err(Error::Lex(_))));
        assert!(matches!(parse_sql("SELECT FROM"), Err(Error::Parse(_))));
    }
}
