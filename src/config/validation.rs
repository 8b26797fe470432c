//! Configuration validation logic

use crate::config::{Source, SourceConfig, SourceType};
use crate::sources::git::Transport;
use crate::utils::path::source_subpath;
use anyhow::{Result, anyhow};
use std::collections::HashSet;

/// Validate a complete source configuration
///
/// # Errors
///
/// Returns an error if:
/// - Two auths, sources or source sets share an alias
/// - A source is missing a field its type requires
/// - A git URL uses an unsupported form
/// - A source path escapes the fetched root
#[inline]
pub fn validate_config(config: &SourceConfig) -> Result<()> {
    ensure_unique(
        "source auth",
        config.source_auths.iter().map(|a| a.auth_alias.as_str()),
    )?;
    ensure_unique("source", config.sources.iter().map(|s| s.alias.as_str()))?;
    ensure_unique(
        "source set",
        config.source_sets.iter().map(|s| s.alias.as_str()),
    )?;

    for source in &config.sources {
        validate_source(source)?;
    }

    for set in &config.source_sets {
        if set.sources.is_empty() {
            return Err(anyhow!(
                "Source set '{}': must list at least one source",
                set.alias
            ));
        }
    }

    Ok(())
}

fn ensure_unique<'cfg>(kind: &str, aliases: impl Iterator<Item = &'cfg str>) -> Result<()> {
    let mut seen = HashSet::new();
    for alias in aliases {
        if alias.trim().is_empty() {
            return Err(anyhow!("A {kind} alias cannot be empty"));
        }
        if !seen.insert(alias) {
            return Err(anyhow!("Duplicate {kind} alias: '{alias}'"));
        }
    }
    Ok(())
}

/// Validate a single source definition
fn validate_source(source: &Source) -> Result<()> {
    let context = format!("Source '{}'", source.alias);

    match source.source_type {
        SourceType::Git => {
            let url = required_url(source).map_err(|e| anyhow!("{context}: {e}"))?;
            Transport::detect(url).map_err(|e| anyhow!("{context}: {e}"))?;
        }
        SourceType::Blob => {
            required_url(source).map_err(|e| anyhow!("{context}: {e}"))?;
        }
        SourceType::File => {}
    }

    source_subpath(&source.path).map_err(|e| anyhow!("{context}: {e}"))?;

    Ok(())
}

fn required_url(source: &Source) -> Result<&str> {
    source
        .url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| anyhow!("a url is required for {} sources", source.source_type))
}
