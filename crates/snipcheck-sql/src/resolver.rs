//! Name resolution against the reference schema
//!
//! Binds each statement's table references to schema tables, aliases and
//! locally defined names, then checks every collected column reference.

use crate::scanner::{BlockScan, ColumnRef, StatementScan, TableRef};
use snipcheck_core::{Diagnostic, DiagnosticCode, Location, SchemaRegistry, SchemaTable, Severity};
use std::collections::BTreeSet;

/// Where a snippet sits in its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContext {
    /// Document path
    pub file: String,

    /// Document line holding the first line of the snippet
    pub first_line: usize,
}

impl SourceContext {
    pub fn new(file: impl Into<String>, first_line: usize) -> Self {
        Self {
            file: file.into(),
            first_line,
        }
    }

    fn location(&self, snippet_line: usize) -> Location {
        Location::with_line(self.file.clone(), self.first_line + snippet_line.saturating_sub(1))
    }
}

/// What a table reference is bound to
#[derive(Debug, Clone, Copy)]
enum Binding<'r> {
    /// Defined in the reference schema
    Real(&'r SchemaTable),

    /// CTE, derived table or table created earlier in the block
    Local,

    /// Not defined anywhere; already reported
    Unknown,
}

struct Bound<'r, 's> {
    table: &'s TableRef,
    binding: Binding<'r>,
}

impl Bound<'_, '_> {
    /// Whether `qualifier` names this table by alias or by name
    fn answers_to(&self, qualifier: &str) -> bool {
        match &self.table.alias {
            Some(alias) if alias.eq_ignore_ascii_case(qualifier) => true,
            _ => {
                self.table.bare_name().eq_ignore_ascii_case(qualifier)
                    || self.table.name.eq_ignore_ascii_case(qualifier)
            }
        }
    }
}

/// Resolves scanned references against a [`SchemaRegistry`]
pub struct NameResolver<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> NameResolver<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Check every statement of a snippet
    ///
    /// Tables created by one statement are visible to the statements after
    /// it. Identical diagnostics are reported once.
    pub fn resolve_block(&self, scan: &BlockScan, context: &SourceContext) -> Vec<Diagnostic> {
        let mut created = BTreeSet::new();
        let mut diagnostics = Vec::new();

        for statement in &scan.statements {
            for diagnostic in self.resolve_statement(statement, &created, context) {
                if !diagnostics.contains(&diagnostic) {
                    diagnostics.push(diagnostic);
                }
            }

            created.extend(
                statement
                    .created
                    .iter()
                    .map(|name| bare(name).to_ascii_lowercase()),
            );
        }

        diagnostics
    }

    fn resolve_statement(
        &self,
        statement: &StatementScan,
        created: &BTreeSet<String>,
        context: &SourceContext,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let scope: Vec<Bound<'r, '_>> = statement
            .tables
            .iter()
            .map(|table| {
                let key = table.bare_name().to_ascii_lowercase();
                let binding = if statement.local_names.contains(&key) || created.contains(&key) {
                    Binding::Local
                } else if let Some(schema_table) = self.registry.lookup_table(&table.name) {
                    Binding::Real(schema_table)
                } else {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticCode::RefUnknownTable,
                            Severity::Error,
                            format!("Table '{}' is not defined in the reference schema", table.name),
                        )
                        .with_location(context.location(table.line)),
                    );
                    Binding::Unknown
                };
                Bound { table, binding }
            })
            .collect();

        for column in &statement.columns {
            let diagnostic = match &column.qualifier {
                Some(qualifier) => self.check_qualified(column, qualifier, &scope, statement, created),
                None => self.check_unqualified(column, &scope, statement),
            };

            if let Some(diagnostic) = diagnostic {
                diagnostics.push(diagnostic.with_location(context.location(column.line)));
            }
        }

        tracing::trace!(
            "statement at line {}: {} tables, {} columns, {} diagnostics",
            statement.line,
            scope.len(),
            statement.columns.len(),
            diagnostics.len()
        );

        diagnostics
    }

    fn check_qualified(
        &self,
        column: &ColumnRef,
        qualifier: &str,
        scope: &[Bound<'r, '_>],
        statement: &StatementScan,
        created: &BTreeSet<String>,
    ) -> Option<Diagnostic> {
        let Some(bound) = scope.iter().find(|b| b.answers_to(qualifier)) else {
            let key = qualifier.to_ascii_lowercase();
            if statement.local_names.contains(&key) || created.contains(&key) {
                return None;
            }

            return Some(
                Diagnostic::new(
                    DiagnosticCode::RefUnknownAlias,
                    Severity::Error,
                    format!(
                        "'{}' in '{}.{}' is neither an alias nor a table in scope",
                        qualifier, qualifier, column.name
                    ),
                )
                .with_comparison("alias or table in scope", qualifier),
            );
        };

        match bound.binding {
            Binding::Real(table) if column.name != "*" && table.find_column(&column.name).is_none() => Some(
                Diagnostic::new(
                    DiagnosticCode::RefUnknownColumn,
                    Severity::Error,
                    format!("Column '{}' does not exist on table '{}'", column.name, table.name),
                )
                .with_comparison(format!("column of {}", table.name), column.name.clone()),
            ),
            _ => None,
        }
    }

    fn check_unqualified(
        &self,
        column: &ColumnRef,
        scope: &[Bound<'r, '_>],
        statement: &StatementScan,
    ) -> Option<Diagnostic> {
        let key = column.name.to_ascii_lowercase();
        if statement.aliases.contains(&key)
            || statement.local_names.contains(&key)
            || scope.iter().any(|b| b.answers_to(&column.name))
        {
            return None;
        }

        let real: Vec<&SchemaTable> = scope
            .iter()
            .filter_map(|b| match b.binding {
                Binding::Real(table) => Some(table),
                _ => None,
            })
            .collect();

        let owners: Vec<&str> = real
            .iter()
            .filter(|t| t.find_column(&column.name).is_some())
            .map(|t| t.name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if owners.len() >= 2 {
            return (!column.soft).then(|| {
                Diagnostic::new(
                    DiagnosticCode::RefAmbiguousColumn,
                    Severity::Info,
                    format!(
                        "Column '{}' exists on more than one table in scope ({})",
                        column.name,
                        owners.join(", ")
                    ),
                )
            });
        }

        if !owners.is_empty() || column.soft || scope.is_empty() {
            return None;
        }

        if scope.iter().any(|b| matches!(b.binding, Binding::Unknown)) {
            return None;
        }

        let locals = scope.iter().filter(|b| matches!(b.binding, Binding::Local)).count();
        match (real.as_slice(), locals) {
            ([table], 0) => Some(
                Diagnostic::new(
                    DiagnosticCode::RefUnknownColumn,
                    Severity::Error,
                    format!("Column '{}' does not exist on table '{}'", column.name, table.name),
                )
                .with_comparison(format!("column of {}", table.name), column.name.clone()),
            ),
            ([], _) => None,
            _ => Some(Diagnostic::new(
                DiagnosticCode::RefUnresolvedColumn,
                Severity::Warn,
                format!(
                    "Column '{}' could not be attributed to any table in scope",
                    column.name
                ),
            )),
        }
    }
}

fn bare(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
