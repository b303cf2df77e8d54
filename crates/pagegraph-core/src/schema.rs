//! Schema definitions and lookup.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::SchemaName;

/// One property a schema allows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub required: bool,
}

/// Type definition governing which properties a subject may carry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schema {
    pub name: SchemaName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl Schema {
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Resolves schema names to definitions.
pub trait SchemaLookup: Send + Sync {
    fn schema(&self, name: &SchemaName) -> Option<Schema>;
}

/// In-memory schema store.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<SchemaName, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of schemas.
    pub fn from_json(json: &str) -> Result<Self> {
        let schemas: Vec<Schema> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for schema in schemas {
            registry.insert(schema);
        }
        Ok(registry)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CoreError::SchemaFile {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), count = registry.len(), "Loaded schemas");
        Ok(registry)
    }

    pub fn insert(&mut self, schema: Schema) {
        self.schemas.insert(schema.name.clone(), schema);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaLookup for SchemaRegistry {
    fn schema(&self, name: &SchemaName) -> Option<Schema> {
        self.schemas.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCHEMAS: &str = r#"[
        {"name": "Company", "description": "A business",
         "properties": [
            {"name": "Website", "type": "url"},
            {"name": "Founded", "type": "number", "required": true}
         ]},
        {"name": "Person"}
    ]"#;

    #[test]
    fn test_registry_from_json() {
        let registry = SchemaRegistry::from_json(SCHEMAS).unwrap();
        assert_eq!(registry.len(), 2);

        let company = registry.schema(&SchemaName::from("Company")).unwrap();
        assert_eq!(company.property("Founded").unwrap().type_name, "number");
        assert!(company.property("Founded").unwrap().required);
        assert!(company.property("Missing").is_none());

        let person = registry.schema(&SchemaName::from("Person")).unwrap();
        assert!(person.properties.is_empty());
        assert!(registry.schema(&SchemaName::from("Product")).is_none());
    }

    #[test]
    fn test_registry_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCHEMAS.as_bytes()).unwrap();

        let registry = SchemaRegistry::from_json_file(file.path()).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SchemaRegistry::from_json_file("/nonexistent/schemas.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/schemas.json"));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SchemaRegistry::from_json("{not json"),
            Err(CoreError::Serialization(_))
        ));
    }
}
