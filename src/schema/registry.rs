//! Schema registry - embedded JSON schemas

use rust_embed::Embed;
use std::collections::HashMap;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

/// Schema for catalog files
pub const CATALOG_SCHEMA: &str = "catalog";

/// Registry of JSON schemas for input validation
pub struct SchemaRegistry {
    schemas: HashMap<String, serde_json::Value>,
}

impl SchemaRegistry {
    /// Create a new schema registry with embedded schemas
    pub fn new() -> Self {
        let mut schemas = HashMap::new();

        for filename in EmbeddedSchemas::iter() {
            let Some(name) = filename.strip_suffix(".schema.json") else {
                continue;
            };
            if let Some(file) = EmbeddedSchemas::get(&filename) {
                match serde_json::from_slice(&file.data) {
                    Ok(schema) => {
                        schemas.insert(name.to_string(), schema);
                    }
                    Err(e) => tracing::warn!(schema = name, error = %e, "skipping unreadable schema"),
                }
            }
        }

        Self { schemas }
    }

    /// Get the JSON schema by name
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.schemas.get(name)
    }

    pub fn has_schema(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Check `instance` against a schema, collecting every violation
    ///
    /// An unknown schema name validates nothing and passes.
    pub fn validate(&self, name: &str, instance: &serde_json::Value) -> Result<(), Vec<String>> {
        let Some(schema) = self.get(name) else {
            return Ok(());
        };
        let validator = jsonschema::validator_for(schema).map_err(|e| vec![e.to_string()])?;
        let errors: Vec<String> = validator
            .iter_errors(instance)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{}: {}", path, e)
                }
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_schema_is_embedded() {
        let registry = SchemaRegistry::new();
        assert!(registry.has_schema(CATALOG_SCHEMA));
    }

    #[test]
    fn test_valid_catalog_passes() {
        let registry = SchemaRegistry::new();
        let catalog = json!({
            "sizes": ["S", "M"],
            "points": [{
                "name_eng": "Chest 1/2",
                "tolerance_key": 1,
                "tol_minus": "1/4",
                "tol_plus": 0.25,
                "sizes": [{"size": "S", "nominal": "20 1/2"}]
            }]
        });
        assert!(registry.validate(CATALOG_SCHEMA, &catalog).is_ok());
    }

    #[test]
    fn test_invalid_catalog_lists_errors() {
        let registry = SchemaRegistry::new();
        let catalog = json!({
            "points": [{"name_eng": "Chest", "sizes": [{"nominal": "20"}]}],
            "colour": "red"
        });
        let errors = registry.validate(CATALOG_SCHEMA, &catalog).unwrap_err();
        assert!(errors.len() >= 2);
        assert!(errors.iter().any(|e| e.contains("/points/0/sizes/0")));
    }
}
