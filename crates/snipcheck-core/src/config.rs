//! Configuration schema (snipcheck.toml)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use crate::block::LanguageTag;
use crate::diagnostic::{DiagnosticCode, Severity};

/// SQL dialect used to tokenize relational snippets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// MySQL (backtick identifiers, `#` comments)
    #[default]
    MySql,

    /// PostgreSQL SQL dialect
    Postgres,

    /// Generic ANSI SQL
    Ansi,
}

/// Fence tags recognised for each query language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Tags marking relational snippets
    #[serde(default = "LanguageConfig::default_sql")]
    pub sql: Vec<String>,

    /// Tags marking document-store snippets
    #[serde(default = "LanguageConfig::default_document")]
    pub document: Vec<String>,
}

impl LanguageConfig {
    fn default_sql() -> Vec<String> {
        ["sql", "mysql", "postgresql", "psql"].iter().map(|s| s.to_string()).collect()
    }

    fn default_document() -> Vec<String> {
        ["mongodb", "mongo", "mongosh", "javascript", "js"].iter().map(|s| s.to_string()).collect()
    }

    /// Classify a fence tag (case-insensitive); `None` means "not a query block"
    pub fn classify(&self, tag: &str) -> Option<LanguageTag> {
        if self.sql.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            Some(LanguageTag::Sql)
        } else if self.document.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            Some(LanguageTag::DocumentQuery)
        } else {
            None
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            sql: Self::default_sql(),
            document: Self::default_document(),
        }
    }
}

/// Severity threshold overrides for specific diagnostic codes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityThreshold {
    /// Map of diagnostic code to severity override
    #[serde(default)]
    pub overrides: HashMap<String, Severity>,
}

impl SeverityThreshold {
    /// Get severity for a diagnostic code, or default
    pub fn get_severity(&self, code: DiagnosticCode, default: Severity) -> Severity {
        self.overrides
            .get(code.as_str())
            .copied()
            .unwrap_or(default)
    }

    /// Set severity override for a code
    pub fn set_override(&mut self, code: DiagnosticCode, severity: Severity) {
        self.overrides.insert(code.as_str().to_string(), severity);
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Reference schema (`.toml`, `.json` or `.sql` DDL)
    #[serde(default)]
    pub schema_path: Option<PathBuf>,

    /// Reference collection seed (JSON)
    #[serde(default)]
    pub seed_path: Option<PathBuf>,

    /// SQL dialect
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Documents to leave out (glob patterns against the document path)
    #[serde(default)]
    pub skip_documents: Vec<String>,

    /// Recognised fence tags
    #[serde(default)]
    pub languages: LanguageConfig,

    /// Severity thresholds
    #[serde(default)]
    pub severity: SeverityThreshold,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_path: None,
            seed_path: None,
            dialect: DialectConfig::default(),
            languages: LanguageConfig::default(),
            severity: SeverityThreshold::default(),
            skip_documents: Vec::new(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;
        config.project_root = project_root_of(path);

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Resolve a configured path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_relative() && !self.project_root.as_os_str().is_empty() {
            self.project_root.join(path)
        } else {
            path.to_path_buf()
        }
    }

    /// Resolved reference schema path
    pub fn schema_file(&self) -> Result<PathBuf, ConfigError> {
        self.schema_path
            .as_deref()
            .map(|p| self.resolve(p))
            .ok_or_else(|| ConfigError::MissingReference("schema_path".to_string()))
    }

    /// Resolved collection seed path
    pub fn seed_file(&self) -> Result<PathBuf, ConfigError> {
        self.seed_path
            .as_deref()
            .map(|p| self.resolve(p))
            .ok_or_else(|| ConfigError::MissingReference("seed_path".to_string()))
    }

    /// Check if a document should be skipped
    pub fn is_document_skipped(&self, document: &str) -> bool {
        self.skip_documents.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, document)
            } else {
                pattern == document
            }
        })
    }
}

/// Directory holding the config file
///
/// A bare file name has an empty parent, which means the working directory.
fn project_root_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple glob matching; `*` matches any run of characters, including `/`
fn glob_match(pattern: &str, text: &str) -> bool {
    if pattern == "*" || pattern == "**" {
        return true;
    }

    let Some(star_pos) = pattern.find('*') else {
        return pattern == text;
    };

    let prefix = &pattern[..star_pos];
    let rest = pattern[star_pos..].trim_start_matches('*');

    let Some(tail) = text.strip_prefix(prefix) else {
        return false;
    };

    if rest.is_empty() {
        return true;
    }

    (0..=tail.len())
        .filter(|&i| tail.is_char_boundary(i))
        .any(|i| glob_match(rest, &tail[i..]))
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No reference configured: set `{0}` in snipcheck.toml or pass it on the command line")]
    MissingReference(String),

    #[error("Invalid reference schema {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("Invalid collection seed {path}: {message}")]
    InvalidSeed { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.dialect, DialectConfig::MySql);
        assert_eq!(config.languages.classify("SQL"), Some(LanguageTag::Sql));
        assert_eq!(config.languages.classify("mongodb"), Some(LanguageTag::DocumentQuery));
        assert_eq!(config.languages.classify("python"), None);
    }

    #[test]
    fn parse_full_config() {
        let config = Config::from_toml(
            r#"
            schema_path = "reference/classicmodels.sql"
            seed_path = "reference/seed.json"
            dialect = "postgres"
            skip_documents = ["drafts/*"]

            [languages]
            sql = ["sql"]
            document = ["mongo"]

            [severity.overrides]
            REF_UNKNOWN_FIELD = "info"
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect, DialectConfig::Postgres);
        assert_eq!(config.languages.classify("mysql"), None);
        assert_eq!(config.languages.classify("Mongo"), Some(LanguageTag::DocumentQuery));
        assert_eq!(
            config.severity.get_severity(DiagnosticCode::RefUnknownField, Severity::Warn),
            Severity::Info
        );
        assert!(config.is_document_skipped("drafts/week1.md"));
        assert!(!config.is_document_skipped("lessons/week1.md"));
    }

    #[test]
    fn missing_reference_is_an_error() {
        let config = Config::default();
        assert!(matches!(config.schema_file(), Err(ConfigError::MissingReference(_))));
        assert!(matches!(config.seed_file(), Err(ConfigError::MissingReference(_))));
    }

    #[test]
    fn relative_paths_resolve_against_root() {
        let mut config = Config::from_toml(r#"schema_path = "schema.toml""#).unwrap();
        config.project_root = PathBuf::from("/course");
        assert_eq!(config.schema_file().unwrap(), PathBuf::from("/course/schema.toml"));
    }

    #[test]
    fn project_root_is_config_directory() {
        assert_eq!(project_root_of(Path::new("course/snipcheck.toml")), PathBuf::from("course"));
        assert_eq!(project_root_of(Path::new("/srv/course/snipcheck.toml")), PathBuf::from("/srv/course"));
    }

    #[test]
    fn bare_config_name_roots_at_working_directory() {
        let root = project_root_of(Path::new("snipcheck.toml"));
        assert!(!root.as_os_str().is_empty());
        assert_eq!(root, std::env::current_dir().unwrap());
    }

    #[test]
    fn malformed_config_is_parse_error() {
        assert!(matches!(Config::from_toml("dialect = 3"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn severity_override() {
        let mut threshold = SeverityThreshold::default();
        threshold.set_override(DiagnosticCode::RefUnresolvedColumn, Severity::Error);

        assert_eq!(
            threshold.get_severity(DiagnosticCode::RefUnresolvedColumn, Severity::Warn),
            Severity::Error
        );
        assert_eq!(
            threshold.get_severity(DiagnosticCode::RefUnknownTable, Severity::Error),
            Severity::Error
        );
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.dialect, parsed.dialect);
        assert_eq!(config.languages, parsed.languages);
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("drafts/*", "drafts/a.md"));
        assert!(glob_match("*.md", "lesson.md"));
        assert!(glob_match("*/solutions/*", "week2/solutions/ex1.md"));
        assert!(!glob_match("drafts/*", "lessons/a.md"));
        assert!(!glob_match("*.md", "lesson.txt"));
    }
}
