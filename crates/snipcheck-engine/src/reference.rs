//! Loading the reference schema and collection seed
//!
//! Both are required before any block is validated; a missing or malformed
//! reference is a [`ConfigError`] and aborts the run.

use snipcheck_core::{CollectionRegistry, ConfigError, DialectConfig, SchemaRegistry};
use snipcheck_sql::DdlSchemaLoader;
use std::path::Path;

/// Load the relational reference schema
///
/// The format follows the extension: `.toml` and `.json` hold a declarative
/// table list, `.sql` and `.ddl` a `CREATE TABLE` script.
pub fn load_schema(path: &Path, dialect: &DialectConfig) -> Result<SchemaRegistry, ConfigError> {
    let contents = read(path)?;
    let invalid = |message: String| ConfigError::InvalidSchema {
        path: path.display().to_string(),
        message,
    };

    let registry = match extension(path).as_str() {
        "toml" => SchemaRegistry::from_toml(&contents).map_err(|e| invalid(e.to_string()))?,
        "json" => SchemaRegistry::from_json(&contents).map_err(|e| invalid(e.to_string()))?,
        "sql" | "ddl" => {
            let tables = DdlSchemaLoader::load(&contents, dialect).map_err(|e| invalid(e.to_string()))?;
            SchemaRegistry::from_tables(tables).map_err(|e| invalid(e.to_string()))?
        }
        other => {
            return Err(invalid(format!(
                "unsupported schema format '{}' (expected .toml, .json or .sql)",
                other
            )))
        }
    };

    tracing::debug!("loaded {} reference tables from {}", registry.len(), path.display());
    Ok(registry)
}

/// Load the collection seed (JSON object of collection name to documents)
pub fn load_seed(path: &Path) -> Result<CollectionRegistry, ConfigError> {
    let contents = read(path)?;
    let registry = CollectionRegistry::from_json(&contents).map_err(|e| ConfigError::InvalidSeed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    tracing::debug!("loaded {} seed collections from {}", registry.len(), path.display());
    Ok(registry)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
