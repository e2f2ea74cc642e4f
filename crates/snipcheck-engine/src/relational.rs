//! Relational snippet validation

use snipcheck_core::{CodeBlock, Diagnostic, DiagnosticCode, DialectConfig, Location, SchemaRegistry, Severity};
use snipcheck_sql::{NameResolver, SourceContext, SqlScanner};

/// Validates SQL blocks against the reference schema
pub struct RelationalValidator<'a> {
    scanner: SqlScanner,
    resolver: NameResolver<'a>,
}

impl<'a> RelationalValidator<'a> {
    pub fn new(registry: &'a SchemaRegistry, dialect: &DialectConfig) -> Self {
        Self {
            scanner: SqlScanner::from_dialect(dialect),
            resolver: NameResolver::new(registry),
        }
    }

    /// Validate one block
    ///
    /// A tokenizer failure yields a single `SQL_LEX_ERROR` diagnostic.
    pub fn validate(&self, block: &CodeBlock) -> Vec<Diagnostic> {
        let context = SourceContext::new(block.source_document(), block.span().content_start());

        match self.scanner.scan(block.text()) {
            Ok(scan) => self.resolver.resolve_block(&scan, &context),
            Err(e) => {
                tracing::debug!("{}: block {} does not tokenize: {}", context.file, block.position(), e);
                vec![Diagnostic::new(DiagnosticCode::SqlLexError, Severity::Error, e.to_string())
                    .with_location(Location::with_line(context.file.clone(), context.first_line))]
            }
        }
    }
}
