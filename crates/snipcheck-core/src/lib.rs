//! snipcheck core
//!
//! Core domain model with stable, versioned types.
//! Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod block;
pub mod schema;
pub mod registry;
pub mod result;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use block::{CodeBlock, BlockRef, LanguageTag, LineSpan};
pub use schema::{ColumnDef, ForeignKey, SchemaTable, CollectionSeed};
pub use registry::{SchemaRegistry, CollectionRegistry, RegistryError};
pub use result::{ValidationResult, ValidationStatus};
pub use report::{Report, ReportVersion, ReportSummary, DocumentReport};
pub use config::{Config, ConfigError, DialectConfig, LanguageConfig, SeverityThreshold};
