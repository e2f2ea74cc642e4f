//! Reference schema types: relational tables and document collections

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A declared column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name
    pub name: String,

    /// Declared type as written in the reference (e.g. `VARCHAR(50)`)
    #[serde(rename = "type", default)]
    pub declared_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
        }
    }
}

/// A foreign key from one column to a column of another table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKey {
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

/// A table of the reference schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTable {
    /// Table name
    pub name: String,

    /// Ordered list of columns
    pub columns: Vec<ColumnDef>,

    /// Primary key columns
    #[serde(default)]
    pub primary_key: BTreeSet<String>,

    /// Foreign keys
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl SchemaTable {
    /// Create a table without keys
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
            primary_key: BTreeSet::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Set the primary key
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a foreign key
    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Find a column by name (ASCII case-insensitive)
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column names in declaration order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Field names observed across the seed documents of one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSeed {
    pub name: String,
    pub fields: BTreeSet<String>,
}

impl CollectionSeed {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeSet::new(),
        }
    }

    /// Build a seed from example documents
    ///
    /// Nested objects contribute dotted paths (`address.city`) as well as
    /// their top-level key. Arrays of objects contribute the paths of their
    /// elements.
    pub fn from_documents(name: impl Into<String>, documents: &[serde_json::Value]) -> Self {
        let mut seed = Self::new(name);
        for document in documents {
            collect_fields(document, "", &mut seed.fields);
        }
        seed
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }
}

fn collect_fields(value: &serde_json::Value, prefix: &str, fields: &mut BTreeSet<String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                collect_fields(child, &path, fields);
                fields.insert(path);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_fields(item, prefix, fields);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_lookup_ignores_case() {
        let table = SchemaTable::new(
            "customers",
            vec![
                ColumnDef::new("customerNumber", "INT"),
                ColumnDef::new("customerName", "VARCHAR(50)"),
            ],
        )
        .with_primary_key(["customerNumber"]);

        assert!(table.find_column("customernumber").is_some());
        assert!(table.find_column("custId").is_none());
        assert_eq!(table.column_names(), vec!["customerNumber", "customerName"]);
        assert!(table.primary_key.contains("customerNumber"));
    }

    #[test]
    fn seed_collects_nested_paths() {
        let seed = CollectionSeed::from_documents(
            "users",
            &[
                json!({"name": "Ada", "address": {"city": "London"}}),
                json!({"name": "Alan", "tags": [{"label": "math"}]}),
            ],
        );

        assert!(seed.has_field("name"));
        assert!(seed.has_field("address"));
        assert!(seed.has_field("address.city"));
        assert!(seed.has_field("tags.label"));
        assert!(!seed.has_field("city"));
    }
}
