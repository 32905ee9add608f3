//! Prompt manifest schema check.
//!
//! The raw document is matched against `schema/prompt_manifest.schema.json`
//! before serde sees it, so a bad manifest reports all of its problems at once
//! instead of the first field serde trips over.

use std::sync::OnceLock;
use thiserror::Error;

const MANIFEST_SCHEMA_JSON: &str = include_str!("../../schema/prompt_manifest.schema.json");

/// Compiled on first use. A broken embedded schema is kept as its message.
static MANIFEST_VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Manifest schema unavailable: {0}")]
    LoadError(String),
}

fn compile_schema() -> Result<jsonschema::Validator, String> {
    let schema: serde_json::Value = serde_json::from_str(MANIFEST_SCHEMA_JSON)
        .map_err(|e| format!("embedded schema is not JSON: {}", e))?;
    jsonschema::options()
        .build(&schema)
        .map_err(|e| format!("embedded schema does not compile: {}", e))
}

fn manifest_validator() -> Result<&'static jsonschema::Validator, SchemaError> {
    MANIFEST_VALIDATOR
        .get_or_init(compile_schema)
        .as_ref()
        .map_err(|e| SchemaError::LoadError(e.clone()))
}

/// Validate a manifest JSON value against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_manifest_schema(manifest_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = manifest_validator().map_err(|e| vec![e.to_string()])?;

    let errors: Vec<String> = validator
        .iter_errors(manifest_json)
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

    #[test]
    fn test_minimal_manifest_passes() {
        let value = serde_json::json!({
            "version": "v1",
            "prompts": [
                { "name": "paris", "type": "location", "text": "Where is Paris?" }
            ]
        });
        assert!(validate_manifest_schema(&value).is_ok());
    }

    #[test]
    fn test_prompt_without_text_fails() {
        let value = serde_json::json!({
            "version": "v1",
            "prompts": [ { "name": "paris", "type": "location" } ]
        });
        let errors = validate_manifest_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_lowercase_currency_fails() {
        let value = serde_json::json!({
            "prompts": [
                { "name": "fx", "type": "exchange_rate", "text": "USD to EUR?", "base_currency": "usd" }
            ]
        });
        assert!(validate_manifest_schema(&value).is_err());
    }

    #[test]
    fn test_negative_tolerance_fails() {
        let value = serde_json::json!({
            "prompts": [
                { "name": "w", "type": "weather", "text": "Weather?", "validation": { "max_diff_c": -1 } }
            ]
        });
        assert!(validate_manifest_schema(&value).is_err());
    }

    #[test]
    fn test_version_with_path_separator_fails() {
        let value = serde_json::json!({
            "version": "../outside",
            "prompts": [ { "name": "p", "text": "x" } ]
        });
        assert!(validate_manifest_schema(&value).is_err());
    }

    #[test]
    fn test_name_with_path_separator_fails() {
        let value = serde_json::json!({
            "prompts": [ { "name": "../escape", "text": "x" } ]
        });
        assert!(validate_manifest_schema(&value).is_err());
    }
}
