//! YAML document loading: the source configuration and values files

use crate::config::SourceConfig;
use crate::error::GraftError;
use crate::system::System;
use crate::template::TemplateValues;
use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::debug;

/// Load and parse the source configuration from file
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - The file is empty or not valid YAML
/// - The document fails schema or semantic validation
pub fn load_source_config(system: &dyn System, path: &str) -> Result<SourceConfig> {
    let content = read_document(system, path, "Source configuration")?;

    let config = parse_source_config(&content).with_context(|| {
        format!(
            "Failed to parse source configuration in file: {path}\n\
            Please check the syntax and structure of your configuration file"
        )
    })?;
    debug!(
        path,
        sources = config.sources.len(),
        source_sets = config.source_sets.len(),
        "loaded source configuration"
    );

    Ok(config)
}

/// Parse and validate a source configuration document
pub fn parse_source_config(content: &str) -> Result<SourceConfig> {
    let config: SourceConfig =
        serde_yaml::from_str(content).map_err(|e| GraftError::configuration(e.to_string()))?;

    let config_value = serde_json::to_value(&config)
        .context("Failed to convert configuration to JSON for validation")?;

    crate::config::schema::validate_against_schema(&config_value)
        .map_err(|e| GraftError::configuration(e.to_string()))?;

    crate::config::validation::validate_config(&config)
        .map_err(|e| GraftError::configuration(e.to_string()))?;

    Ok(config)
}

/// Load a values document from file
///
/// # Errors
///
/// Returns an error if:
/// - The file does not exist, cannot be read, or is empty
/// - The YAML is not a mapping of strings and nested mappings
pub fn load_values_file(system: &dyn System, path: &str) -> Result<TemplateValues> {
    let content = read_document(system, path, "Values file")?;

    TemplateValues::from_yaml_str(&content)
        .map_err(|e| GraftError::configuration(e.to_string()))
        .with_context(|| format!("Failed to parse values file: {path}"))
}

fn read_document(system: &dyn System, path: &str, what: &str) -> Result<String> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        return Err(GraftError::configuration(format!("{what} not found: {path}")).into());
    }

    let content = system
        .read_to_string(path_obj)
        .with_context(|| format!("Failed to read {}: {path}", what.to_lowercase()))?;

    if content.trim().is_empty() {
        return Err(GraftError::configuration(format!("{what} is empty: {path}")).into());
    }

    Ok(content)
}
