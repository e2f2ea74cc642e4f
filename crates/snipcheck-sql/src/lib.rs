//! SQL snippet analysis
//!
//! This crate handles:
//! - Lexical scanning of SQL snippets with sqlparser's tokenizer
//! - Collecting table, alias and column references per statement
//! - Resolving those references against the reference schema
//! - Loading a reference schema from a `CREATE TABLE` script
//!
//! Scanning is intentionally shallow: it is not a SQL parser and does not
//! build scopes for subqueries. It exists to catch drift between course
//! snippets and the reference schema.

pub mod scanner;
pub mod resolver;
pub mod ddl;

pub use scanner::{SqlScanner, BlockScan, StatementScan, StatementKind, TableRef, ColumnRef, ScanError};
pub use resolver::{NameResolver, SourceContext};
pub use ddl::{DdlSchemaLoader, DdlError};
