//! JSON Schema validation for the source configuration

use anyhow::{Result, anyhow};
use jsonschema::Validator;
use serde_json::Value;

/// Compile the embedded JSON schema for the source configuration
pub fn get_schema() -> Result<Validator> {
    let schema_str = include_str!("../../docs/schema.json");
    let schema: Value = serde_json::from_str(schema_str)
        .map_err(|e| anyhow!("Failed to parse embedded JSON schema: {e}"))?;

    jsonschema::draft7::new(&schema).map_err(|e| anyhow!("Failed to compile JSON schema: {e}"))
}

/// Validate a configuration value against the schema
pub fn validate_against_schema(config: &Value) -> Result<()> {
    let schema = get_schema()?;

    let error_messages: Vec<String> = schema
        .iter_errors(config)
        .map(|e| format!("  - {e}"))
        .collect();

    if !error_messages.is_empty() {
        return Err(anyhow!(
            "Configuration validation failed:\n{}",
            error_messages.join("\n")
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn embedded_schema_compiles() {
        assert!(get_schema().is_ok());
    }

    #[test]
    fn rejects_empty_source_set() {
        let config = json!({
            "sourceSets": [{ "alias": "set", "sources": [] }]
        });
        assert!(validate_against_schema(&config).is_err());
    }

    #[test]
    fn rejects_alias_with_spaces() {
        let config = json!({
            "sources": [{ "alias": "bad alias", "sourceType": "git", "path": "/" }]
        });
        assert!(validate_against_schema(&config).is_err());
    }

    #[test]
    fn accepts_minimal_document() {
        let config = json!({
            "sources": [{
                "alias": "child",
                "sourceType": "git",
                "url": "https://example.com/org/child.git",
                "path": "/"
            }]
        });
        assert!(validate_against_schema(&config).is_ok());
    }
}
