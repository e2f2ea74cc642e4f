//! Read-only reference data: the relational schema registry and the
//! document-store collection registry.
//!
//! Both registries are built once before validation starts. Neither exposes a
//! mutation API; validators only ever hold shared references.

use crate::schema::{CollectionSeed, SchemaTable};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Declarative schema file layout (`schema.toml` / `schema.json`)
#[derive(Debug, Deserialize)]
struct SchemaDefinition {
    tables: Vec<SchemaTable>,
}

/// Relational reference schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    /// Tables keyed by lower-cased name
    tables: BTreeMap<String, SchemaTable>,
}

impl SchemaRegistry {
    /// Build a registry, checking that names are unique and that every
    /// foreign key points at a defined table and column.
    pub fn from_tables(tables: Vec<SchemaTable>) -> Result<Self, RegistryError> {
        if tables.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut by_name = BTreeMap::new();
        for table in tables {
            let key = table.name.to_ascii_lowercase();
            if by_name.contains_key(&key) {
                return Err(RegistryError::DuplicateTable(table.name));
            }
            by_name.insert(key, table);
        }

        let registry = Self { tables: by_name };
        registry.check_foreign_keys()?;
        Ok(registry)
    }

    /// Parse a declarative TOML schema
    pub fn from_toml(toml: &str) -> Result<Self, RegistryError> {
        let definition: SchemaDefinition =
            toml::from_str(toml).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::from_tables(definition.tables)
    }

    /// Parse a declarative JSON schema
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let definition: SchemaDefinition =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;
        Self::from_tables(definition.tables)
    }

    fn check_foreign_keys(&self) -> Result<(), RegistryError> {
        for table in self.tables.values() {
            for fk in &table.foreign_keys {
                let dangling = || RegistryError::DanglingForeignKey {
                    table: table.name.clone(),
                    column: fk.column.clone(),
                    target: format!("{}.{}", fk.referenced_table, fk.referenced_column),
                };

                if table.find_column(&fk.column).is_none()
                    || !self.lookup_column(&fk.referenced_table, &fk.referenced_column)
                {
                    return Err(dangling());
                }
            }
        }
        Ok(())
    }

    /// Look up a table by name
    ///
    /// Matching is ASCII case-insensitive; a schema-qualified name
    /// (`classicmodels.customers`) resolves by its last segment.
    pub fn lookup_table(&self, name: &str) -> Option<&SchemaTable> {
        let bare = name.rsplit('.').next().unwrap_or(name);
        self.tables.get(&bare.to_ascii_lowercase())
    }

    /// Whether `column` exists on `table`
    pub fn lookup_column(&self, table: &str, column: &str) -> bool {
        self.lookup_table(table)
            .map(|t| t.find_column(column).is_some())
            .unwrap_or(false)
    }

    /// All tables, ordered by name
    pub fn tables(&self) -> impl Iterator<Item = &SchemaTable> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Document-store reference seed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, CollectionSeed>,
}

impl CollectionRegistry {
    pub fn from_seeds(seeds: Vec<CollectionSeed>) -> Self {
        Self {
            collections: seeds.into_iter().map(|s| (s.name.clone(), s)).collect(),
        }
    }

    /// Parse a seed file: a JSON object mapping each collection name to an
    /// array of example documents.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let serde_json::Value::Object(map) = value else {
            return Err(RegistryError::InvalidSeed(
                "top level must be an object of collection name -> documents".to_string(),
            ));
        };

        let mut seeds = Vec::with_capacity(map.len());
        for (name, documents) in map {
            let serde_json::Value::Array(documents) = documents else {
                return Err(RegistryError::InvalidSeed(format!(
                    "collection '{}' must map to an array of documents",
                    name
                )));
            };
            seeds.push(CollectionSeed::from_documents(name, &documents));
        }

        Ok(Self::from_seeds(seeds))
    }

    /// Look up a collection (case-sensitive, like the store it models)
    pub fn lookup_collection(&self, name: &str) -> Option<&CollectionSeed> {
        self.collections.get(name)
    }

    pub fn has_field(&self, collection: &str, field: &str) -> bool {
        self.lookup_collection(collection)
            .map(|c| c.has_field(field))
            .unwrap_or(false)
    }

    /// All collections, ordered by name
    pub fn collections(&self) -> impl Iterator<Item = &CollectionSeed> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

/// Errors building reference data
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Reference schema defines no tables")]
    Empty,

    #[error("Table '{0}' is defined more than once")]
    DuplicateTable(String),

    #[error("Foreign key {table}.{column} references undefined column {target}")]
    DanglingForeignKey {
        table: String,
        column: String,
        target: String,
    },

    #[error("Invalid collection seed: {0}")]
    InvalidSeed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ForeignKey};

    const SCHEMA: &str = r#"
        [[tables]]
        name = "customers"
        primary_key = ["customerNumber"]
        columns = [
            { name = "customerNumber", type = "INT" },
            { name = "customerName", type = "VARCHAR(50)" },
        ]

        [[tables]]
        name = "orders"
        primary_key = ["orderNumber"]
        columns = [
            { name = "orderNumber", type = "INT" },
            { name = "customerNumber", type = "INT" },
        ]
        foreign_keys = [
            { column = "customerNumber", referenced_table = "customers", referenced_column = "customerNumber" },
        ]
    "#;

    #[test]
    fn toml_schema_lookup() {
        let registry = SchemaRegistry::from_toml(SCHEMA).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup_table("customers").is_some());
        assert!(registry.lookup_table("CUSTOMERS").is_some());
        assert!(registry.lookup_table("classicmodels.orders").is_some());
        assert!(registry.lookup_table("widgets").is_none());
        assert!(registry.lookup_column("customers", "customerNumber"));
        assert!(!registry.lookup_column("customers", "custId"));
        assert!(!registry.lookup_column("widgets", "id"));
    }

    #[test]
    fn json_schema_lookup() {
        let json = r#"{"tables": [{"name": "offices", "columns": [{"name": "officeCode", "type": "VARCHAR(10)"}]}]}"#;
        let registry = SchemaRegistry::from_json(json).unwrap();
        assert!(registry.lookup_column("offices", "officecode"));
    }

    #[test]
    fn rejects_empty_and_duplicate_tables() {
        assert!(matches!(SchemaRegistry::from_tables(vec![]), Err(RegistryError::Empty)));

        let dup = vec![
            SchemaTable::new("t", vec![ColumnDef::new("a", "INT")]),
            SchemaTable::new("T", vec![ColumnDef::new("b", "INT")]),
        ];
        assert!(matches!(
            SchemaRegistry::from_tables(dup),
            Err(RegistryError::DuplicateTable(_))
        ));
    }

    #[test]
    fn rejects_dangling_foreign_key() {
        let tables = vec![SchemaTable::new("orders", vec![ColumnDef::new("customerNumber", "INT")])
            .with_foreign_key(ForeignKey::new("customerNumber", "customers", "customerNumber"))];

        let err = SchemaRegistry::from_tables(tables).unwrap_err();
        assert!(err.to_string().contains("customers.customerNumber"));
    }

    #[test]
    fn seed_registry_from_json() {
        let json = r#"{
            "users": [{"name": "Ada", "age": 36}, {"name": "Alan", "email": "a@b.c"}],
            "posts": []
        }"#;
        let registry = CollectionRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup_collection("users").is_some());
        assert!(registry.lookup_collection("Users").is_none());
        assert!(registry.has_field("users", "email"));
        assert!(!registry.has_field("posts", "title"));
    }

    #[test]
    fn seed_registry_rejects_non_array() {
        let err = CollectionRegistry::from_json(r#"{"users": {"name": "Ada"}}"#).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSeed(_)));
    }
}
