//! Extract → Validate → Report
//!
//! One pass over the input documents. Reference data is loaded before the
//! first document is read and only borrowed afterwards.

use crate::document::DocumentQueryValidator;
use crate::reference::{load_schema, load_seed};
use crate::relational::RelationalValidator;
use snipcheck_core::{
    CodeBlock, CollectionRegistry, Config, ConfigError, Diagnostic, DiagnosticCode, DocumentReport,
    LanguageTag, Location, Report, SchemaRegistry, Severity, ValidationResult,
};
use snipcheck_docs::{discover, Document, FenceExtractor};
use std::path::{Path, PathBuf};

/// A configured checking run
pub struct Pipeline {
    config: Config,
    schema: SchemaRegistry,
    collections: CollectionRegistry,
    extractor: FenceExtractor,
}

impl Pipeline {
    pub fn new(config: Config, schema: SchemaRegistry, collections: CollectionRegistry) -> Self {
        let extractor = FenceExtractor::new(config.languages.clone());
        Self {
            config,
            schema,
            collections,
            extractor,
        }
    }

    /// Load the reference data named by the config
    ///
    /// The schema is required. Without a configured seed every collection
    /// reference is unknown.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let schema = load_schema(&config.schema_file()?, &config.dialect)?;
        let collections = match config.seed_path {
            Some(_) => load_seed(&config.seed_file()?)?,
            None => {
                tracing::warn!("no collection seed configured; document queries will not resolve");
                CollectionRegistry::default()
            }
        };

        Ok(Self::new(config, schema, collections))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn collections(&self) -> &CollectionRegistry {
        &self.collections
    }

    /// Check every document under `inputs`
    pub fn run(&self, inputs: &[PathBuf]) -> Report {
        let documents: Vec<PathBuf> = discover(inputs)
            .into_iter()
            .filter(|path| !self.is_skipped(path))
            .collect();

        let reports = documents
            .iter()
            .map(|path| match Document::load(path) {
                Ok(document) => self.check_document(&document),
                Err(e) => {
                    tracing::warn!("{}", e);
                    DocumentReport::unreadable(
                        e.path.clone(),
                        Diagnostic::new(DiagnosticCode::InputUnreadable, Severity::Error, e.to_string())
                            .with_location(Location::new(e.path.clone())),
                    )
                }
            })
            .collect();

        let report = Report::from_documents(reports);
        tracing::debug!(
            "checked {} blocks in {} documents: {} passed, {} failed",
            report.summary.blocks_checked,
            report.summary.documents,
            report.summary.passed,
            report.summary.failed
        );
        report
    }

    /// Extract and validate one document
    pub fn check_document(&self, document: &Document) -> DocumentReport {
        let extraction = self.extractor.extract(document);
        let relational = RelationalValidator::new(&self.schema, &self.config.dialect);
        let documents = DocumentQueryValidator::new(&self.collections);

        let results = extraction
            .blocks
            .iter()
            .map(|block| self.finish(block, &relational, &documents))
            .collect();

        let warnings = extraction
            .diagnostics
            .into_iter()
            .map(|d| self.apply_overrides(d))
            .collect();

        DocumentReport::new(document.path.clone(), warnings, results)
    }

    /// Validate a single block
    pub fn validate_block(&self, block: &CodeBlock) -> ValidationResult {
        let relational = RelationalValidator::new(&self.schema, &self.config.dialect);
        let documents = DocumentQueryValidator::new(&self.collections);
        self.finish(block, &relational, &documents)
    }

    fn finish(
        &self,
        block: &CodeBlock,
        relational: &RelationalValidator<'_>,
        documents: &DocumentQueryValidator<'_>,
    ) -> ValidationResult {
        let diagnostics = match block.language() {
            LanguageTag::Sql => relational.validate(block),
            LanguageTag::DocumentQuery => documents.validate(block),
        };

        let diagnostics: Vec<Diagnostic> = diagnostics.into_iter().map(|d| self.apply_overrides(d)).collect();
        let result = ValidationResult::from_diagnostics(block.to_ref(), diagnostics);

        tracing::debug!(
            "{}#{} ({}): {}",
            block.source_document(),
            block.position(),
            block.language(),
            result.status
        );
        result
    }

    fn apply_overrides(&self, diagnostic: Diagnostic) -> Diagnostic {
        let severity = self.config.severity.get_severity(diagnostic.code, diagnostic.severity);
        diagnostic.with_severity(severity)
    }

    /// Skip patterns match the path as given or relative to the project root
    fn is_skipped(&self, path: &Path) -> bool {
        let skipped = self.config.is_document_skipped(&path.display().to_string())
            || path
                .strip_prefix(&self.config.project_root)
                .map(|relative| self.config.is_document_skipped(&relative.display().to_string()))
                .unwrap_or(false);

        if skipped {
            tracing::debug!("skipping {}", path.display());
        }
        skipped
    }
}
