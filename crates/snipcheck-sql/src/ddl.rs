//! Reference schema from a `CREATE TABLE` script
//!
//! Only `CREATE TABLE` statements contribute tables; anything else in the
//! script (`USE`, `INSERT`, `DROP`, ...) is ignored.

use crate::scanner::sql_dialect;
use snipcheck_core::{ColumnDef, DialectConfig, ForeignKey, SchemaTable};
use sqlparser::ast::{ColumnOption, CreateTable, ObjectName, Statement, TableConstraint};
use sqlparser::parser::Parser;

/// Loads schema tables from DDL
pub struct DdlSchemaLoader;

impl DdlSchemaLoader {
    /// Parse a DDL script into schema tables, in script order
    pub fn load(sql: &str, dialect: &DialectConfig) -> Result<Vec<SchemaTable>, DdlError> {
        let dialect = sql_dialect(dialect);
        let statements = Parser::parse_sql(&*dialect, sql).map_err(|e| DdlError::Parse(e.to_string()))?;

        let tables: Vec<SchemaTable> = statements
            .iter()
            .filter_map(|statement| match statement {
                Statement::CreateTable(create) => Some(table_from_create(create)),
                _ => None,
            })
            .collect();

        if tables.is_empty() {
            return Err(DdlError::NoTables);
        }

        tracing::debug!("loaded {} tables from DDL", tables.len());
        Ok(tables)
    }
}

fn table_from_create(create: &CreateTable) -> SchemaTable {
    let mut primary_key = Vec::new();
    let mut foreign_keys = Vec::new();
    let mut columns = Vec::with_capacity(create.columns.len());

    for column in &create.columns {
        columns.push(ColumnDef::new(column.name.value.clone(), column.data_type.to_string()));

        for option in &column.options {
            match &option.option {
                ColumnOption::Unique { is_primary: true, .. } => primary_key.push(column.name.value.clone()),
                ColumnOption::ForeignKey {
                    foreign_table,
                    referred_columns,
                    ..
                } => {
                    let referenced = referred_columns
                        .first()
                        .map(|c| c.value.clone())
                        .unwrap_or_else(|| column.name.value.clone());
                    foreign_keys.push(ForeignKey::new(
                        column.name.value.clone(),
                        last_segment(foreign_table),
                        referenced,
                    ));
                }
                _ => {}
            }
        }
    }

    for constraint in &create.constraints {
        match constraint {
            TableConstraint::PrimaryKey { columns: key, .. } => {
                primary_key.extend(key.iter().map(|c| c.value.clone()));
            }
            TableConstraint::ForeignKey {
                columns: local,
                foreign_table,
                referred_columns,
                ..
            } => {
                let target = last_segment(foreign_table);
                for (index, column) in local.iter().enumerate() {
                    let referenced = referred_columns
                        .get(index)
                        .map(|c| c.value.clone())
                        .unwrap_or_else(|| column.value.clone());
                    foreign_keys.push(ForeignKey::new(column.value.clone(), target.clone(), referenced));
                }
            }
            _ => {}
        }
    }

    let mut table = SchemaTable::new(last_segment(&create.name), columns).with_primary_key(primary_key);
    for foreign_key in foreign_keys {
        table = table.with_foreign_key(foreign_key);
    }
    table
}

fn last_segment(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| name.to_string())
}

/// A DDL script that cannot serve as a reference schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DdlError {
    #[error("DDL parse error: {0}")]
    Parse(String),

    #[error("DDL script defines no tables")]
    NoTables,
}
