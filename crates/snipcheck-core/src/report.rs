//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.
//!
//! Reports carry no timestamps: the same input always serializes to the
//! same bytes.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};
use crate::result::ValidationResult;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Results for a single document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Document path
    pub document: String,

    /// Number of recognised blocks validated
    pub blocks_checked: usize,

    /// Blocks with status `valid`
    pub passed: usize,

    /// Blocks with any other status
    pub failed: usize,

    /// Extraction warnings (malformed fences)
    pub extraction_warnings: Vec<Diagnostic>,

    /// Set when the document could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_error: Option<Diagnostic>,

    /// One result per block, by block position
    pub results: Vec<ValidationResult>,
}

impl DocumentReport {
    /// Build the report for a readable document
    pub fn new(
        document: impl Into<String>,
        extraction_warnings: Vec<Diagnostic>,
        mut results: Vec<ValidationResult>,
    ) -> Self {
        results.sort_by_key(|r| r.block.position);
        let passed = results.iter().filter(|r| r.is_pass()).count();

        Self {
            document: document.into(),
            blocks_checked: results.len(),
            passed,
            failed: results.len() - passed,
            extraction_warnings,
            input_error: None,
            results,
        }
    }

    /// Build the report for a document that could not be read
    pub fn unreadable(document: impl Into<String>, error: Diagnostic) -> Self {
        Self {
            document: document.into(),
            blocks_checked: 0,
            passed: 0,
            failed: 0,
            extraction_warnings: Vec::new(),
            input_error: Some(error),
            results: Vec::new(),
        }
    }

    /// A document passes when it was readable and every block is valid
    pub fn is_pass(&self) -> bool {
        self.input_error.is_none() && self.failed == 0
    }

    /// Every diagnostic attached to this document, in report order
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.input_error
            .iter()
            .chain(self.extraction_warnings.iter())
            .chain(self.results.iter().flat_map(|r| r.diagnostics.iter()))
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of documents considered (readable or not)
    pub documents: usize,

    /// Number of blocks validated
    pub blocks_checked: usize,

    /// Number of valid blocks
    pub passed: usize,

    /// Number of failed blocks
    pub failed: usize,

    /// Number of unreadable documents
    pub input_errors: usize,

    /// Number of extraction warnings
    pub extraction_warnings: usize,

    /// Number of error diagnostics
    pub errors: usize,

    /// Number of warning diagnostics
    pub warnings: usize,

    /// Number of info diagnostics
    pub info: usize,
}

/// Check report (report.json v1)
///
/// This is the stable output format.
/// All fields are versioned and backward-compatible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Per-document results, ordered by document path
    pub documents: Vec<DocumentReport>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            summary: ReportSummary::default(),
            documents: Vec::new(),
        }
    }

    /// Create a report from per-document results
    pub fn from_documents(mut documents: Vec<DocumentReport>) -> Self {
        documents.sort_by(|a, b| a.document.cmp(&b.document));

        let mut summary = ReportSummary {
            documents: documents.len(),
            ..ReportSummary::default()
        };

        for doc in &documents {
            summary.blocks_checked += doc.blocks_checked;
            summary.passed += doc.passed;
            summary.failed += doc.failed;
            summary.extraction_warnings += doc.extraction_warnings.len();
            if doc.input_error.is_some() {
                summary.input_errors += 1;
            }

            for diag in doc.diagnostics() {
                match diag.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warn => summary.warnings += 1,
                    Severity::Info => summary.info += 1,
                }
            }
        }

        Self {
            version: ReportVersion::CURRENT,
            summary,
            documents,
        }
    }

    /// Whether the run should exit non-zero: any failed block or unreadable
    /// document
    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0 || self.summary.input_errors > 0
    }

    /// Every validation result, by document then block position
    pub fn results(&self) -> impl Iterator<Item = &ValidationResult> {
        self.documents.iter().flat_map(|d| d.results.iter())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
