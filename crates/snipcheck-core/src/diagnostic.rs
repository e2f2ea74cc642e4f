//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Extraction (1xxx)
    /// A fenced block was opened but never closed
    ExtractUnterminatedFence,

    /// A document could not be read
    InputUnreadable,

    // Relational references (2xxx)
    /// A table is not defined in the reference schema
    RefUnknownTable,

    /// A column does not exist on the referenced table
    RefUnknownColumn,

    /// A column qualifier names neither an alias nor a table in scope
    RefUnknownAlias,

    /// An unqualified column exists on more than one table in scope
    RefAmbiguousColumn,

    /// An unqualified column could not be attributed to any table in scope
    RefUnresolvedColumn,

    // Document-store references (3xxx)
    /// A collection is not present in the collection seed
    RefUnknownCollection,

    /// An operation is not in the allowed operation set
    RefUnknownOperation,

    /// A filter field was never observed in the collection seed
    RefUnknownField,

    // Syntax (4xxx)
    /// The SQL tokenizer rejected the snippet
    SqlLexError,

    /// Unbalanced brackets or quotes in a document query
    DocQuerySyntaxError,

    /// A document-query block references no collection
    DocQueryNoReference,

    // General (9xxx)
    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractUnterminatedFence => "EXTRACT_UNTERMINATED_FENCE",
            Self::InputUnreadable => "INPUT_UNREADABLE",
            Self::RefUnknownTable => "REF_UNKNOWN_TABLE",
            Self::RefUnknownColumn => "REF_UNKNOWN_COLUMN",
            Self::RefUnknownAlias => "REF_UNKNOWN_ALIAS",
            Self::RefAmbiguousColumn => "REF_AMBIGUOUS_COLUMN",
            Self::RefUnresolvedColumn => "REF_UNRESOLVED_COLUMN",
            Self::RefUnknownCollection => "REF_UNKNOWN_COLLECTION",
            Self::RefUnknownOperation => "REF_UNKNOWN_OPERATION",
            Self::RefUnknownField => "REF_UNKNOWN_FIELD",
            Self::SqlLexError => "SQL_LEX_ERROR",
            Self::DocQuerySyntaxError => "DOC_QUERY_SYNTAX_ERROR",
            Self::DocQueryNoReference => "DOC_QUERY_NO_REFERENCE",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }

    /// Whether this code means the snippet could not be scanned at all
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::SqlLexError | Self::DocQuerySyntaxError)
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - the block fails
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Document path as given on the command line
    pub file: String,

    /// Optional line number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    /// Optional column number (1-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
            column: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_position(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
            if let Some(column) = self.column {
                write!(f, ":{}", column)?;
            }
        }
        Ok(())
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    /// Expected value (e.g. the table a column was looked up on)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// Actual value found in the snippet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    /// Replace the severity (used by configured overrides)
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        // Ensure codes are stable strings
        assert_eq!(DiagnosticCode::RefUnknownTable.as_str(), "REF_UNKNOWN_TABLE");
        assert_eq!(DiagnosticCode::ExtractUnterminatedFence.as_str(), "EXTRACT_UNTERMINATED_FENCE");
        assert_eq!(DiagnosticCode::RefUnknownCollection.as_str(), "REF_UNKNOWN_COLLECTION");
    }

    #[test]
    fn serde_name_matches_as_str() {
        let json = serde_json::to_string(&DiagnosticCode::RefAmbiguousColumn).unwrap();
        assert_eq!(json, "\"REF_AMBIGUOUS_COLUMN\"");
    }

    #[test]
    fn parse_failure_codes() {
        assert!(DiagnosticCode::SqlLexError.is_parse_failure());
        assert!(DiagnosticCode::DocQuerySyntaxError.is_parse_failure());
        assert!(!DiagnosticCode::RefUnknownColumn.is_parse_failure());
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::RefUnknownColumn,
            Severity::Error,
            "Column 'custId' does not exist on table 'customers'"
        )
        .with_location(Location::with_line("lessons/01-select.md", 42));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("REF_UNKNOWN_COLUMN"));
        assert!(json.contains("error"));
        assert!(!json.contains("expected"));
    }

    #[test]
    fn location_display() {
        assert_eq!(Location::new("a.md").to_string(), "a.md");
        assert_eq!(Location::with_line("a.md", 3).to_string(), "a.md:3");
        assert_eq!(Location::with_position("a.md", 3, 7).to_string(), "a.md:3:7");
    }
}
