//! Per-block validation outcome

use crate::block::BlockRef;
use crate::diagnostic::{Diagnostic, Severity};
use serde::{Deserialize, Serialize};

/// Outcome of validating one block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidationStatus {
    /// Every reference resolved (low-severity notes allowed)
    Valid,

    /// At least one table, column, collection or operation did not resolve
    UnknownReference,

    /// The snippet could not be scanned
    ParseError,
}

impl ValidationStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::UnknownReference => write!(f, "unknown-reference"),
            Self::ParseError => write!(f, "parse-error"),
        }
    }
}

/// Result for exactly one code block; never mutated after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub block: BlockRef,
    pub status: ValidationStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Derive the status from the diagnostics
    ///
    /// A parse failure wins over everything else; otherwise any
    /// error-severity diagnostic makes the block an unknown reference.
    pub fn from_diagnostics(block: BlockRef, diagnostics: Vec<Diagnostic>) -> Self {
        let status = if diagnostics.iter().any(|d| d.code.is_parse_failure()) {
            ValidationStatus::ParseError
        } else if diagnostics.iter().any(|d| d.severity == Severity::Error) {
            ValidationStatus::UnknownReference
        } else {
            ValidationStatus::Valid
        };

        Self {
            block,
            status,
            diagnostics,
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}
