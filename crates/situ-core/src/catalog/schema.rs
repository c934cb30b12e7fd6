//! JSON Schema validation for puzzle catalogs.
//!
//! Catalogs are validated against assets/catalog.schema.json before any
//! pattern is compiled.

use std::sync::OnceLock;
use thiserror::Error;

/// Embedded catalog schema (loaded at compile time).
const CATALOG_SCHEMA_JSON: &str = include_str!("../../../../assets/catalog.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

/// Errors from schema loading.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to load schema: {0}")]
    LoadError(String),
}

fn get_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(CATALOG_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a catalog JSON value against the schema.
///
/// Returns every validation error, each suffixed with its instance path.
pub fn validate_catalog_schema(catalog_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(catalog_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> serde_json::Value {
        serde_json::json!({
            "puzzles": [{
                "id": 1,
                "slug": "frozen-river",
                "question": "How did the dog cross?",
                "answer": "The river was frozen.",
                "rules": [
                    { "id": "R1", "verdict": "compatible", "pattern": "ice" }
                ]
            }]
        })
    }

    #[test]
    fn test_minimal_catalog_passes() {
        assert!(validate_catalog_schema(&minimal()).is_ok());
    }

    #[test]
    fn test_empty_catalog_fails() {
        let value = serde_json::json!({ "puzzles": [] });
        assert!(validate_catalog_schema(&value).is_err());
    }

    #[test]
    fn test_unknown_verdict_fails() {
        let mut value = minimal();
        value["puzzles"][0]["rules"][0]["verdict"] = serde_json::json!("partial");
        let errors = validate_catalog_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_bad_slug_fails() {
        let mut value = minimal();
        value["puzzles"][0]["slug"] = serde_json::json!("Frozen River");
        assert!(validate_catalog_schema(&value).is_err());
    }

    #[test]
    fn test_additional_properties_fail() {
        let mut value = minimal();
        value["puzzles"][0]["hint"] = serde_json::json!("think cold");
        assert!(validate_catalog_schema(&value).is_err());
    }
}
