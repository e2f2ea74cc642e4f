//! Lexical scanning of SQL snippets
//!
//! Tokenizes with sqlparser's tokenizer and walks the token stream once per
//! statement, collecting:
//! - table references after `FROM`, `JOIN`, `UPDATE`, `INTO` and `TABLE`
//! - table aliases (`customers c`, `customers AS c`)
//! - qualified (`c.customerNumber`) and unqualified column references
//! - names defined inside the statement: CTEs, derived-table aliases and
//!   select-list aliases
//! - tables created by `CREATE TABLE` / `CREATE VIEW`
//!
//! Scopes are flat per statement; subqueries share the scope of their
//! statement.

use snipcheck_core::DialectConfig;
use sqlparser::dialect::{Dialect, GenericDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};
use std::collections::BTreeSet;

/// Words skipped between a table keyword and the table name
const TABLE_MODIFIERS: &[&str] = &["ONLY", "IGNORE", "LOW_PRIORITY", "QUICK", "LATERAL", "DELAYED", "HIGH_PRIORITY"];

/// Keywords that can close a select-list expression
const EXPRESSION_END_KEYWORDS: &[&str] = &["END", "NULL", "TRUE", "FALSE"];

/// Statements that never reference schema objects we check
const SKIPPED_STATEMENTS: &[&str] = &[
    "SHOW", "USE", "SET", "START", "BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT", "GRANT", "REVOKE",
    "CALL", "DELIMITER", "SOURCE", "LOCK", "UNLOCK", "FLUSH",
];

/// SQL scanner with configurable dialect
pub struct SqlScanner {
    dialect: Box<dyn Dialect>,
}

impl SqlScanner {
    /// Create a scanner with the MySQL dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(MySqlDialect {}),
        }
    }

    /// Create a scanner for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Create a scanner for generic ANSI SQL
    pub fn ansi() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Create a scanner from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        Self {
            dialect: sql_dialect(dialect),
        }
    }

    /// Scan a snippet
    ///
    /// Fails only when the tokenizer rejects the text (unterminated string,
    /// stray quote, ...).
    pub fn scan(&self, sql: &str) -> Result<BlockScan, ScanError> {
        let tokens = Tokenizer::new(&*self.dialect, sql)
            .tokenize()
            .map_err(|e| ScanError { message: e.to_string() })?;

        let mut line = 1;
        let mut significant = Vec::with_capacity(tokens.len());
        for token in tokens {
            let newlines = token.to_string().matches('\n').count();
            if !matches!(token, Token::Whitespace(_) | Token::EOF) {
                significant.push(Tok { token, line });
            }
            line += newlines;
        }

        let statements = significant
            .split(|t| t.token == Token::SemiColon)
            .filter(|s| !s.is_empty())
            .map(|s| StatementScanner::new(s).run())
            .collect();

        Ok(BlockScan { statements })
    }
}

impl Default for SqlScanner {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn sql_dialect(dialect: &DialectConfig) -> Box<dyn Dialect> {
    match dialect {
        DialectConfig::MySql => Box::new(MySqlDialect {}),
        DialectConfig::Postgres => Box::new(PostgreSqlDialect {}),
        DialectConfig::Ansi => Box::new(GenericDialect {}),
    }
}

/// The tokenizer rejected a snippet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SQL tokenizer error: {message}")]
pub struct ScanError {
    pub message: String,
}

/// Scan of a whole snippet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockScan {
    /// Statements in order of appearance
    pub statements: Vec<StatementScan>,
}

/// Rough statement classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatementKind {
    #[default]
    Query,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Describe,
    /// Session or administrative statement; nothing is collected
    Other,
}

impl StatementKind {
    fn from_head(head: &str) -> Self {
        match head {
            "INSERT" | "REPLACE" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "CREATE" => Self::Create,
            "ALTER" => Self::Alter,
            "DROP" | "TRUNCATE" => Self::Drop,
            "DESCRIBE" | "DESC" | "EXPLAIN" => Self::Describe,
            h if SKIPPED_STATEMENTS.contains(&h) => Self::Other,
            _ => Self::Query,
        }
    }
}

/// A table named in a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Name as written, possibly schema-qualified
    pub name: String,

    /// Alias, if any
    pub alias: Option<String>,

    /// Line within the snippet (1-indexed)
    pub line: usize,
}

impl TableRef {
    /// Last segment of the name
    pub fn bare_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// A column named in a statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias the column is qualified with
    pub qualifier: Option<String>,

    /// Column name; `*` for a qualified wildcard
    pub name: String,

    /// Line within the snippet (1-indexed)
    pub line: usize,

    /// The word is also a SQL keyword: it only counts if it resolves
    pub soft: bool,
}

/// References collected from one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementScan {
    pub kind: StatementKind,

    /// First line of the statement within the snippet
    pub line: usize,

    pub tables: Vec<TableRef>,
    pub columns: Vec<ColumnRef>,

    /// CTE names and derived-table aliases (lower-cased)
    pub local_names: BTreeSet<String>,

    /// Select-list aliases (lower-cased)
    pub aliases: BTreeSet<String>,

    /// Tables or views created by this statement
    pub created: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Tok {
    token: Token,
    line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paren {
    Plain,
    /// Subquery in table position; `list` when it sits in a FROM list
    Derived { list: bool },
    /// Body of a CTE
    Cte,
}

struct StatementScanner<'t> {
    toks: &'t [Tok],
    depth: usize,
    parens: Vec<Paren>,
    /// Paren depths of SELECTs whose FROM has not been seen yet
    selects: Vec<usize>,
    pending: Option<Paren>,
    expect_cte: bool,
    head: String,
    start: usize,
    scan: StatementScan,
}

impl<'t> StatementScanner<'t> {
    fn new(toks: &'t [Tok]) -> Self {
        Self {
            toks,
            depth: 0,
            parens: Vec::new(),
            selects: Vec::new(),
            pending: None,
            expect_cte: false,
            head: String::new(),
            start: 0,
            scan: StatementScan::default(),
        }
    }

    fn run(mut self) -> StatementScan {
        self.scan.line = self.toks.first().map(|t| t.line).unwrap_or(1);
        let head = self.upper(0).unwrap_or_default();
        self.scan.kind = StatementKind::from_head(&head);

        let start = match self.scan.kind {
            StatementKind::Other => return self.scan,
            StatementKind::Create => match self.scan_create() {
                Some(resume) => resume,
                None => return self.scan,
            },
            StatementKind::Alter | StatementKind::Drop => {
                self.scan_table_statement(&head);
                return self.scan;
            }
            StatementKind::Describe => {
                if self.is_query_start(1) {
                    1
                } else {
                    self.parse_table_list(1, false);
                    return self.scan;
                }
            }
            _ => 0,
        };

        self.start = start;
        self.head = self.upper(start).unwrap_or_default();

        let mut i = start;
        while i < self.toks.len() {
            i = self.step(i);
        }

        self.scan
    }

    fn step(&mut self, i: usize) -> usize {
        match &self.toks[i].token {
            Token::LParen => {
                let kind = self.pending.take().unwrap_or(Paren::Plain);
                self.parens.push(kind);
                self.depth += 1;
                i + 1
            }
            Token::RParen => self.close_paren(i),
            Token::Word(_) => self.scan_word(i),
            _ => i + 1,
        }
    }

    fn close_paren(&mut self, i: usize) -> usize {
        self.depth = self.depth.saturating_sub(1);
        let kind = self.parens.pop().unwrap_or(Paren::Plain);
        while self.selects.last().is_some_and(|&d| d > self.depth) {
            self.selects.pop();
        }

        let mut j = i + 1;
        match kind {
            Paren::Derived { list } => {
                let alias = if self.is_kw(j, "AS") {
                    j += 1;
                    self.word_value(j)
                } else if self.is_ident(j) {
                    self.word_value(j)
                } else {
                    None
                };

                if let Some(alias) = alias {
                    self.scan.local_names.insert(alias.to_ascii_lowercase());
                    j += 1;
                }

                if list && self.token(j) == Some(&Token::Comma) {
                    return self.parse_table_list(j + 1, true);
                }
            }
            Paren::Cte => {
                if self.token(j) == Some(&Token::Comma) {
                    self.expect_cte = true;
                    j += 1;
                }
            }
            Paren::Plain => {}
        }
        j
    }

    fn scan_word(&mut self, i: usize) -> usize {
        let Some(word) = self.word(i) else {
            return i + 1;
        };
        let quoted = word.quote_style.is_some();
        let keyword = !quoted && word.keyword != Keyword::NoKeyword;

        if self.expect_cte && !keyword {
            return self.scan_cte(i);
        }

        if !quoted {
            match word.value.to_ascii_uppercase().as_str() {
                "WITH" => {
                    self.expect_cte = true;
                    return if self.is_kw(i + 1, "RECURSIVE") { i + 2 } else { i + 1 };
                }
                "SELECT" => {
                    self.selects.push(self.depth);
                    return i + 1;
                }
                "FROM" => {
                    if self.selects.last() == Some(&self.depth) {
                        self.selects.pop();
                        return self.parse_table_list(i + 1, true);
                    }
                    if self.head == "DELETE" && self.depth == 0 {
                        return self.parse_table_list(i + 1, true);
                    }
                    // EXTRACT(YEAR FROM d), TRIM(x FROM y), ...
                    return i + 1;
                }
                "JOIN" => return self.parse_table_list(i + 1, false),
                "UPDATE" if i == self.start => return self.parse_table_list(i + 1, true),
                "INTO" if self.depth == 0 && matches!(self.head.as_str(), "INSERT" | "REPLACE") => {
                    return self.parse_insert_target(i + 1);
                }
                "AS" => {
                    if let Some(alias) = self.word_value(i + 1) {
                        self.scan.aliases.insert(alias.to_ascii_lowercase());
                        return i + 2;
                    }
                    return i + 1;
                }
                _ => {}
            }
        }

        // user and system variables
        if word.value.starts_with('@') {
            return i + 1;
        }

        self.scan_column(i, keyword)
    }

    /// `name [(cols)] AS (` inside a WITH clause
    fn scan_cte(&mut self, i: usize) -> usize {
        self.expect_cte = false;
        if let Some(name) = self.word_value(i) {
            self.scan.local_names.insert(name.to_ascii_lowercase());
        }

        let mut j = i + 1;
        if self.token(j) == Some(&Token::LParen) {
            j = self.skip_group(j);
        }
        if self.is_kw(j, "AS") {
            j += 1;
        }
        while self.is_kw(j, "NOT") || self.is_kw(j, "MATERIALIZED") {
            j += 1;
        }
        if self.token(j) == Some(&Token::LParen) {
            self.pending = Some(Paren::Cte);
        }
        j
    }

    fn scan_column(&mut self, i: usize, soft: bool) -> usize {
        let line = self.toks[i].line;
        let Some(first) = self.word_value(i) else {
            return i + 1;
        };

        if self.token(i + 1) == Some(&Token::Period) {
            let mut parts = vec![first];
            let mut j = i;
            while self.token(j + 1) == Some(&Token::Period) {
                match self.token(j + 2) {
                    Some(Token::Word(w)) => {
                        parts.push(w.value.clone());
                        j += 2;
                    }
                    Some(Token::Mul) => {
                        parts.push("*".to_string());
                        j += 2;
                        break;
                    }
                    _ => break,
                }
            }

            // schema.function(...)
            if self.token(j + 1) == Some(&Token::LParen) {
                return j + 1;
            }

            if parts.len() >= 2 {
                let name = parts.pop().unwrap_or_default();
                let qualifier = parts.pop();
                self.scan.columns.push(ColumnRef {
                    qualifier,
                    name,
                    line,
                    soft: false,
                });
            }
            return j + 1;
        }

        // function call
        if self.token(i + 1) == Some(&Token::LParen) {
            return i + 1;
        }

        if !soft && self.is_implicit_alias(i) {
            self.scan.aliases.insert(first.to_ascii_lowercase());
            return i + 1;
        }

        self.scan.columns.push(ColumnRef {
            qualifier: None,
            name: first,
            line,
            soft,
        });
        i + 1
    }

    /// `SELECT COUNT(*) total FROM ...`: an identifier directly after an
    /// expression in a select list, followed by `,` or `FROM`
    fn is_implicit_alias(&self, i: usize) -> bool {
        if self.selects.last() != Some(&self.depth) || i == 0 {
            return false;
        }

        let after_expression = match self.token(i - 1) {
            Some(Token::RParen)
            | Some(Token::Number(_, _))
            | Some(Token::SingleQuotedString(_))
            | Some(Token::DoubleQuotedString(_)) => true,
            Some(Token::Word(_)) => {
                self.is_ident(i - 1) || EXPRESSION_END_KEYWORDS.iter().any(|kw| self.is_kw(i - 1, kw))
            }
            _ => false,
        };

        let before_end = match self.token(i + 1) {
            None | Some(Token::Comma) => true,
            Some(Token::Word(_)) => self.is_kw(i + 1, "FROM"),
            _ => false,
        };

        after_expression && before_end
    }

    /// Parse `name [AS alias] [, name [AS alias] ...]`
    fn parse_table_list(&mut self, i: usize, list: bool) -> usize {
        let mut j = i;
        loop {
            while TABLE_MODIFIERS.iter().any(|m| self.is_kw(j, m)) {
                j += 1;
            }

            match self.token(j) {
                Some(Token::LParen) => {
                    self.pending = Some(Paren::Derived { list });
                    return j;
                }
                Some(Token::Word(_)) => {}
                _ => return j,
            }

            let line = self.toks[j].line;
            let (name, next) = self.dotted_name(j);
            j = next;

            // table function; arguments are scanned as ordinary tokens
            if self.token(j) == Some(&Token::LParen) {
                return j;
            }

            let alias = if self.is_kw(j, "AS") {
                let alias = self.word_value(j + 1);
                j += if alias.is_some() { 2 } else { 1 };
                alias
            } else if self.is_ident(j) {
                let alias = self.word_value(j);
                j += 1;
                alias
            } else {
                None
            };

            self.scan.tables.push(TableRef { name, alias, line });

            if list && self.token(j) == Some(&Token::Comma) {
                j += 1;
                continue;
            }
            return j;
        }
    }

    /// `INSERT INTO name [(col, ...)]`
    fn parse_insert_target(&mut self, i: usize) -> usize {
        let mut j = i;
        while TABLE_MODIFIERS.iter().any(|m| self.is_kw(j, m)) {
            j += 1;
        }
        if !matches!(self.token(j), Some(Token::Word(_))) {
            return j;
        }

        let line = self.toks[j].line;
        let (name, next) = self.dotted_name(j);
        j = next;
        let bare = name.rsplit('.').next().unwrap_or(&name).to_string();
        self.scan.tables.push(TableRef { name, alias: None, line });

        if self.token(j) != Some(&Token::LParen) || self.is_query_start(j + 1) {
            return j;
        }

        let mut k = j + 1;
        while let Some(token) = self.token(k) {
            match token {
                Token::RParen => return k + 1,
                Token::Word(w) => self.scan.columns.push(ColumnRef {
                    qualifier: Some(bare.clone()),
                    name: w.value.clone(),
                    line: self.toks[k].line,
                    soft: false,
                }),
                _ => {}
            }
            k += 1;
        }
        k
    }

    /// Returns where to resume scanning for `CREATE ... AS SELECT`
    fn scan_create(&mut self) -> Option<usize> {
        let limit = self.toks.len().min(12);
        let object = (1..limit).find(|&k| {
            self.token(k) != Some(&Token::LParen)
                && ["TABLE", "VIEW", "INDEX"].iter().any(|kw| self.is_kw(k, kw))
        })?;

        if self.is_kw(object, "INDEX") {
            let on = (object + 1..self.toks.len()).find(|&k| self.is_kw(k, "ON"))?;
            self.parse_table_list(on + 1, false);
            return None;
        }

        let mut j = object + 1;
        if self.is_kw(j, "IF") {
            j += 3; // IF NOT EXISTS
        }
        if !matches!(self.token(j), Some(Token::Word(_))) {
            return None;
        }

        let (name, next) = self.dotted_name(j);
        self.scan.created.push(name);
        j = next;

        if self.is_kw(j, "LIKE") {
            self.parse_table_list(j + 1, false);
            return None;
        }

        let mut depth = 0usize;
        for k in j..self.toks.len() {
            match self.token(k) {
                Some(Token::LParen) => depth += 1,
                Some(Token::RParen) => depth = depth.saturating_sub(1),
                _ if depth == 0 && self.is_kw(k, "AS") && self.is_query_start(k + 1) => return Some(k + 1),
                _ if depth == 0 && self.is_kw(k, "SELECT") => return Some(k),
                _ => {}
            }
        }
        None
    }

    /// `ALTER TABLE t ...`, `DROP TABLE a, b`, `TRUNCATE [TABLE] t`
    fn scan_table_statement(&mut self, head: &str) {
        let limit = self.toks.len().min(4);
        let Some(table) = (1..limit).find(|&k| self.is_kw(k, "TABLE")) else {
            if head == "TRUNCATE" {
                self.parse_table_list(1, false);
            }
            return;
        };

        // DROP TABLE IF EXISTS asserts nothing about the schema
        if self.is_kw(table + 1, "IF") {
            return;
        }

        self.parse_table_list(table + 1, head == "DROP");
    }

    fn is_query_start(&self, i: usize) -> bool {
        self.is_kw(i, "SELECT") || self.is_kw(i, "WITH") || self.token(i) == Some(&Token::LParen)
    }

    /// Index just past the group opened at `i`
    fn skip_group(&self, i: usize) -> usize {
        let mut depth = 0usize;
        for k in i..self.toks.len() {
            match self.token(k) {
                Some(Token::LParen) => depth += 1,
                Some(Token::RParen) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return k + 1;
                    }
                }
                _ => {}
            }
        }
        self.toks.len()
    }

    /// `a.b.c` starting at a word; returns the joined name and next index
    fn dotted_name(&self, i: usize) -> (String, usize) {
        let mut parts = Vec::new();
        let mut j = i;
        if let Some(value) = self.word_value(j) {
            parts.push(value);
        }
        while self.token(j + 1) == Some(&Token::Period) {
            match self.word_value(j + 2) {
                Some(value) => {
                    parts.push(value);
                    j += 2;
                }
                None => break,
            }
        }
        (parts.join("."), j + 1)
    }

    fn token(&self, i: usize) -> Option<&'t Token> {
        self.toks.get(i).map(|t| &t.token)
    }

    fn word(&self, i: usize) -> Option<&'t Word> {
        match self.token(i) {
            Some(Token::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn word_value(&self, i: usize) -> Option<String> {
        self.word(i).map(|w| w.value.clone())
    }

    /// Upper-cased unquoted word
    fn upper(&self, i: usize) -> Option<String> {
        self.word(i)
            .filter(|w| w.quote_style.is_none())
            .map(|w| w.value.to_ascii_uppercase())
    }

    fn is_kw(&self, i: usize, kw: &str) -> bool {
        self.word(i)
            .is_some_and(|w| w.quote_style.is_none() && w.value.eq_ignore_ascii_case(kw))
    }

    /// Quoted word, or a word the dialect does not treat as a keyword
    fn is_ident(&self, i: usize) -> bool {
        self.word(i)
            .is_some_and(|w| w.quote_style.is_some() || w.keyword == Keyword::NoKeyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan_one(sql: &str) -> StatementScan {
        let scan = SqlScanner::new().scan(sql).unwrap();
        assert_eq!(scan.statements.len(), 1, "expected one statement in {sql:?}");
        scan.statements.into_iter().next().unwrap()
    }

    fn table_names(stmt: &StatementScan) -> Vec<(&str, Option<&str>)> {
        stmt.tables.iter().map(|t| (t.name.as_str(), t.alias.as_deref())).collect()
    }

    fn column_names(stmt: &StatementScan) -> Vec<(Option<&str>, &str)> {
        stmt.columns
            .iter()
            .filter(|c| !c.soft)
            .map(|c| (c.qualifier.as_deref(), c.name.as_str()))
            .collect()
    }

    #[test]
    fn simple_select() {
        let stmt = scan_one("SELECT customerNumber FROM customers;");
        assert_eq!(stmt.kind, StatementKind::Query);
        assert_eq!(table_names(&stmt), vec![("customers", None)]);
        assert_eq!(column_names(&stmt), vec![(None, "customerNumber")]);
    }

    #[test]
    fn join_with_aliases() {
        let stmt = scan_one(
            "SELECT c.customerName, o.orderNumber\n\
             FROM customers AS c\n\
             INNER JOIN orders o ON c.customerNumber = o.customerNumber",
        );
        assert_eq!(table_names(&stmt), vec![("customers", Some("c")), ("orders", Some("o"))]);
        assert_eq!(
            column_names(&stmt),
            vec![
                (Some("c"), "customerName"),
                (Some("o"), "orderNumber"),
                (Some("c"), "customerNumber"),
                (Some("o"), "customerNumber"),
            ]
        );
        assert_eq!(stmt.tables[1].line, 3);
    }

    #[test]
    fn comma_separated_from_list() {
        let stmt = scan_one("SELECT * FROM customers c, payments p WHERE c.customerNumber = p.customerNumber");
        assert_eq!(table_names(&stmt), vec![("customers", Some("c")), ("payments", Some("p"))]);
    }

    #[test]
    fn select_aliases_are_not_columns() {
        let stmt = scan_one(
            "SELECT country, COUNT(*) AS total, MAX(creditLimit) maxCredit FROM customers GROUP BY country ORDER BY total DESC",
        );
        assert!(stmt.aliases.contains("total"));
        assert!(stmt.aliases.contains("maxcredit"));
        assert_eq!(
            column_names(&stmt),
            vec![(None, "country"), (None, "creditLimit"), (None, "country"), (None, "total")]
        );
    }

    #[test]
    fn cte_and_derived_tables_are_local() {
        let stmt = scan_one(
            "WITH large_payers AS (SELECT customerNumber FROM payments WHERE amount > 1000)\n\
             SELECT t.customerNumber FROM (SELECT * FROM large_payers) AS t",
        );
        assert!(stmt.local_names.contains("large_payers"));
        assert!(stmt.local_names.contains("t"));
        assert_eq!(table_names(&stmt), vec![("payments", None), ("large_payers", None)]);
    }

    #[test]
    fn multiple_ctes() {
        let stmt = scan_one("WITH first_cte AS (SELECT 1), second_cte (x) AS (SELECT 2) SELECT * FROM first_cte, second_cte");
        assert!(stmt.local_names.contains("first_cte"));
        assert!(stmt.local_names.contains("second_cte"));
    }

    #[test]
    fn extract_from_is_not_a_table() {
        let stmt = scan_one("SELECT EXTRACT(YEAR FROM orderDate) FROM orders");
        assert_eq!(table_names(&stmt), vec![("orders", None)]);
        assert!(column_names(&stmt).contains(&(None, "orderDate")));
    }

    #[test]
    fn insert_target_columns() {
        let stmt = scan_one("INSERT INTO classicmodels.offices (officeCode, city) VALUES ('8', 'Oslo')");
        assert_eq!(stmt.kind, StatementKind::Insert);
        assert_eq!(table_names(&stmt), vec![("classicmodels.offices", None)]);
        assert_eq!(
            column_names(&stmt),
            vec![(Some("offices"), "officeCode"), (Some("offices"), "city")]
        );
    }

    #[test]
    fn update_and_delete() {
        let update = scan_one("UPDATE employees SET jobTitle = 'VP' WHERE employeeNumber = 1002");
        assert_eq!(update.kind, StatementKind::Update);
        assert_eq!(table_names(&update), vec![("employees", None)]);
        assert_eq!(column_names(&update), vec![(None, "jobTitle"), (None, "employeeNumber")]);

        let delete = scan_one("DELETE FROM payments WHERE amount < 10");
        assert_eq!(delete.kind, StatementKind::Delete);
        assert_eq!(table_names(&delete), vec![("payments", None)]);
    }

    #[test]
    fn create_table_defines_local_name() {
        let stmt = scan_one("CREATE TABLE IF NOT EXISTS students (id INT PRIMARY KEY, name VARCHAR(40))");
        assert_eq!(stmt.kind, StatementKind::Create);
        assert_eq!(stmt.created, vec!["students".to_string()]);
        assert!(stmt.tables.is_empty());
        assert!(stmt.columns.is_empty());
    }

    #[test]
    fn create_view_scans_query() {
        let stmt = scan_one("CREATE VIEW vip AS SELECT customerName FROM customers WHERE creditLimit > 100000");
        assert_eq!(stmt.created, vec!["vip".to_string()]);
        assert_eq!(table_names(&stmt), vec![("customers", None)]);
    }

    #[test]
    fn drop_if_exists_is_ignored() {
        assert!(scan_one("DROP TABLE IF EXISTS scratch").tables.is_empty());
        assert_eq!(table_names(&scan_one("DROP TABLE a, b")), vec![("a", None), ("b", None)]);
        assert_eq!(table_names(&scan_one("ALTER TABLE customers ADD COLUMN x INT")), vec![("customers", None)]);
    }

    #[test]
    fn session_statements_collect_nothing() {
        let stmt = scan_one("USE classicmodels");
        assert_eq!(stmt.kind, StatementKind::Other);
        assert!(stmt.tables.is_empty());
        assert!(stmt.columns.is_empty());
    }

    #[test]
    fn statements_split_on_semicolons() {
        let scan = SqlScanner::new()
            .scan("-- first\nSELECT 1;\n\nSELECT officeCode\nFROM offices;\n")
            .unwrap();
        assert_eq!(scan.statements.len(), 2);
        assert_eq!(scan.statements[1].line, 4);
        assert_eq!(scan.statements[1].tables[0].line, 5);
    }

    #[test]
    fn qualified_wildcard_and_three_part_names() {
        let stmt = scan_one("SELECT c.*, classicmodels.customers.city FROM customers c");
        assert_eq!(column_names(&stmt), vec![(Some("c"), "*"), (Some("customers"), "city")]);
    }

    #[test]
    fn backtick_identifiers() {
        let stmt = scan_one("SELECT `order` FROM `orders`");
        assert_eq!(table_names(&stmt), vec![("orders", None)]);
        assert_eq!(column_names(&stmt), vec![(None, "order")]);
    }

    #[test]
    fn implicit_alias_after_case_expression() {
        let stmt = scan_one(
            "SELECT customerName, CASE WHEN creditLimit > 50000 THEN 'high' ELSE 'low' END tier FROM customers",
        );
        assert!(stmt.aliases.contains("tier"));
        assert_eq!(column_names(&stmt), vec![(None, "customerName"), (None, "creditLimit")]);
    }

    #[test]
    fn unterminated_string_is_scan_error() {
        let err = SqlScanner::new().scan("SELECT 'oops FROM customers").unwrap_err();
        assert!(err.to_string().contains("tokenizer"));
    }

    #[test]
    fn dialects_all_scan_simple_sql() {
        for scanner in [SqlScanner::new(), SqlScanner::postgres(), SqlScanner::ansi()] {
            let scan = scanner.scan("SELECT id FROM users").unwrap();
            assert_eq!(scan.statements[0].tables[0].name, "users");
        }
    }
}
