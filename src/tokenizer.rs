use std::fmt;

use crate::error::LexError;
use crate::value::Value;

/// The closed set of token kinds the SQL dialect is built from. Literal kinds carry
/// their decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // --- SQL Keywords ---
    Create,
    Table,
    Insert,
    Into,
    Values,
    Select,
    From,
    Where,
    Update,
    Set,
    Delete,
    Join,
    On,
    Primary,
    Key,
    Unique,
    Inner,
    And,
    Or,
    Order,
    By,
    Asc,
    Desc,
    Limit,

    // --- Data Types ---
    Int,
    Text,

    // --- Identifiers & Literals ---
    /// A name representing a table or a column (e.g., `users`, `id`).
    /// The original spelling lives in the token lexeme.
    Ident,
    /// An unsigned integer literal (e.g., `42`).
    Number(i64),
    /// A string literal, defined between single quotes (e.g., `'Alice'`).
    String(String),

    // --- Symbols ---
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,
    /// Comma `,`
    Comma,
    /// Semicolon `;`
    Semicolon,
    /// Wildcard `*`
    Star,
    /// Dot `.` used in qualified column names
    Dot,
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // --- Special ---
    /// Represents the End Of File/Input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(_) => write!(f, "NUMBER"),
            Self::String(_) => write!(f, "STRING"),
            Self::Ident => write!(f, "IDENTIFIER"),
            Self::Eof => write!(f, "EOF"),
            other => write!(f, "{}", format!("{other:?}").to_uppercase()),
        }
    }
}

/// One lexical unit together with the text it was read from and the character offset
/// where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub offset: usize,
}

impl Token {
    /// Returns the literal value carried by a `NUMBER` or `STRING` token.
    pub fn literal(&self) -> Option<Value> {
        match &self.kind {
            TokenKind::Number(n) => Some(Value::Int(*n)),
            TokenKind::String(s) => Some(Value::from(s.as_str())),
            _ => None,
        }
    }
}

/// A lexical scanner (lexer) that converts a raw SQL string into a sequence of [Token]s.
pub struct Tokenizer {
    /// The input string stored as a vector of characters for easy iteration.
    input: Vec<char>,
    /// The current position in the character vector.
    position: usize,
    /// Where the token being scanned started.
    start: usize,
}

impl Tokenizer {
    /// Creates a new Tokenizer for the given input string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            start: 0,
        }
    }

    /// Processes the entire input and returns a vector of tokens ending with a
    /// synthetic [TokenKind::Eof].
    ///
    /// # Errors
    /// Returns a [LexError] on the first character that cannot start a token or on a
    /// string literal missing its closing quote. Nothing is skipped or recovered.
    ///
    /// # Example
    /// ```
    /// # use flatdb::tokenizer::{Tokenizer, TokenKind};
    /// let mut t = Tokenizer::new("SELECT *");
    /// let tokens = t.tokenize().unwrap();
    /// assert_eq!(tokens[0].kind, TokenKind::Select);
    /// assert_eq!(tokens[2].kind, TokenKind::Eof);
    /// ```
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                break;
            }

            self.start = self.position;
            let kind = self.next_token()?;
            tokens.push(self.make_token(kind));
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            offset: self.position,
        });
        Ok(tokens)
    }

    /// Identifies the next token based on the character at the current position.
    fn next_token(&mut self) -> Result<TokenKind, LexError> {
        let ch = self.current_char();
        self.advance();

        match ch {
            '(' => Ok(TokenKind::LeftParen),
            ')' => Ok(TokenKind::RightParen),
            ',' => Ok(TokenKind::Comma),
            ';' => Ok(TokenKind::Semicolon),
            '*' => Ok(TokenKind::Star),
            '.' => Ok(TokenKind::Dot),
            '=' => Ok(TokenKind::Equal),
            '<' => Ok(if self.matches('=') {
                TokenKind::LessEqual
            } else {
                TokenKind::Less
            }),
            '>' => Ok(if self.matches('=') {
                TokenKind::GreaterEqual
            } else {
                TokenKind::Greater
            }),
            '!' if self.matches('=') => Ok(TokenKind::NotEqual),
            '\'' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier()),
            _ => Err(LexError {
                message: format!("Unexpected character '{ch}'"),
                position: self.start,
            }),
        }
    }

    // --- Navigation Helpers ---

    /// Returns the character at the current position.
    fn current_char(&self) -> char {
        self.input[self.position]
    }

    /// Moves the cursor forward by one character.
    fn advance(&mut self) {
        self.position += 1;
    }

    /// Checks if the cursor has reached the end of the input.
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Consumes the current character if it is `expected`.
    fn matches(&mut self, expected: char) -> bool {
        if !self.is_at_end() && self.current_char() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes spaces, tabs, carriage returns and line feeds.
    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && matches!(self.current_char(), ' ' | '\t' | '\r' | '\n') {
            self.advance();
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.input[self.start..self.position].iter().collect(),
            offset: self.start,
        }
    }

    // --- Extraction Logic ---

    /// Reads a sequence of letters, digits and underscores and determines if it's
    /// a reserved SQL keyword or a user-defined identifier.
    ///
    /// Keywords are matched case-insensitively.
    fn read_identifier(&mut self) -> TokenKind {
        while !self.is_at_end()
            && (self.current_char().is_ascii_alphabetic()
                || self.current_char().is_ascii_digit()
                || self.current_char() == '_')
        {
            self.advance();
        }

        let word: String = self.input[self.start..self.position].iter().collect();
        match word.to_ascii_uppercase().as_str() {
            "CREATE" => TokenKind::Create,
            "TABLE" => TokenKind::Table,
            "INSERT" => TokenKind::Insert,
            "INTO" => TokenKind::Into,
            "VALUES" => TokenKind::Values,
            "SELECT" => TokenKind::Select,
            "FROM" => TokenKind::From,
            "WHERE" => TokenKind::Where,
            "UPDATE" => TokenKind::Update,
            "SET" => TokenKind::Set,
            "DELETE" => TokenKind::Delete,
            "JOIN" => TokenKind::Join,
            "ON" => TokenKind::On,
            "PRIMARY" => TokenKind::Primary,
            "KEY" => TokenKind::Key,
            "UNIQUE" => TokenKind::Unique,
            "INNER" => TokenKind::Inner,
            "INT" => TokenKind::Int,
            "TEXT" => TokenKind::Text,
            "AND" => TokenKind::And,
            "OR" => TokenKind::Or,
            "ORDER" => TokenKind::Order,
            "BY" => TokenKind::By,
            "ASC" => TokenKind::Asc,
            "DESC" => TokenKind::Desc,
            "LIMIT" => TokenKind::Limit,
            _ => TokenKind::Ident,
        }
    }

    /// Reads a maximal run of digits as an integer literal.
    fn read_number(&mut self) -> Result<TokenKind, LexError> {
        while !self.is_at_end() && self.current_char().is_ascii_digit() {
            self.advance();
        }

        let digits: String = self.input[self.start..self.position].iter().collect();
        digits
            .parse::<i64>()
            .map(TokenKind::Number)
            .map_err(|_| LexError {
                message: format!("Number literal '{digits}' is out of range"),
                position: self.start,
            })
    }

    /// Reads a string literal enclosed in single quotes. There is no escape syntax.
    fn read_string(&mut self) -> Result<TokenKind, LexError> {
        while !self.is_at_end() && self.current_char() != '\'' {
            self.advance();
        }

        if self.is_at_end() {
            return Err(LexError {
                message: "Unterminated string".into(),
                position: self.start,
            });
        }

        let string = self.input[self.start + 1..self.position].iter().collect();
        // Skip the closing quote
        self.advance();

        Ok(TokenKind::String(string))
    }
}
