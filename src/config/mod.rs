//! Configuration management module
//!
//! Holds the source configuration model, its YAML loading, JSON schema
//! validation and semantic checks.

pub mod schema;
pub mod validation;
pub mod yaml;

use crate::system::System;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Kind of storage a source is fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum SourceType {
    Git,
    File,
    Blob,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::Git => "git",
            Self::File => "file",
            Self::Blob => "blob",
        };
        f.write_str(name)
    }
}

/// Named credential bundle referenced by sources
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAuth {
    pub auth_alias: String,

    #[serde(default)]
    pub user_name: String,

    /// Personal access token, may be overridden from the environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pat: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SourceAuth {
    /// Token usable for HTTP basic auth: the PAT, falling back to `token`
    #[must_use]
    pub fn http_secret(&self) -> Option<&str> {
        self.pat
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.token.as_deref().filter(|s| !s.is_empty()))
    }

    /// SSH private key path, if one is configured
    #[must_use]
    pub fn ssh_key(&self) -> Option<&str> {
        self.ssh_key_path.as_deref().filter(|s| !s.is_empty())
    }
}

// Secrets never end up in logs
impl fmt::Debug for SourceAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SourceAuth")
            .field("auth_alias", &self.auth_alias)
            .field("user_name", &self.user_name)
            .field("pat", &redact(&self.pat))
            .field("ssh_key_path", &self.ssh_key_path)
            .field("key", &redact(&self.key))
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// A single fetchable origin of files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub alias: String,

    pub source_type: SourceType,

    /// Location of the repository or bucket (git and blob only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Sub-path extracted after fetching; the fetched tree is rooted here
    #[serde(default = "default_source_path")]
    pub path: String,

    /// Branch or tag to clone (git only, defaults to the remote HEAD)
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_auth_alias: Option<String>,
}

fn default_source_path() -> String {
    "/".to_owned()
}

/// Named, ordered group of sources forming one project template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSet {
    pub alias: String,

    pub sources: Vec<String>,

    /// Default template values, keyed by dotted path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

/// Root of the source configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default)]
    pub source_auths: Vec<SourceAuth>,

    #[serde(default)]
    pub sources: Vec<Source>,

    #[serde(default)]
    pub source_sets: Vec<SourceSet>,
}

impl SourceConfig {
    /// Load, schema-check and validate a configuration file
    pub fn load_from_file(system: &dyn System, path: &str) -> anyhow::Result<Self> {
        yaml::load_source_config(system, path)
    }
}

/// What the caller asked to build: a set alias or an explicit source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    SourceSet(String),
    Sources(Vec<String>),
}

impl Selection {
    /// Build a selection from the two mutually exclusive CLI inputs
    pub fn from_parts(
        source_set: Option<String>,
        sources: Vec<String>,
    ) -> Result<Self, ResolutionError> {
        match (source_set, sources.is_empty()) {
            (Some(_), false) => Err(ResolutionError::ConflictingSelection),
            (Some(set), true) => Ok(Self::SourceSet(set)),
            (None, false) => Ok(Self::Sources(sources)),
            (None, true) => Err(ResolutionError::EmptySelection),
        }
    }
}

/// Failure to expand a selection into target sources
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolutionError {
    #[error("source set not found: {alias}")]
    UnknownSourceSet { alias: String },

    #[error("source not found: {alias}")]
    UnknownSource { alias: String },

    #[error("source auth not found: {auth_alias} (referenced by source {source_alias})")]
    UnknownAuth {
        source_alias: String,
        auth_alias: String,
    },

    #[error("either a source set or a list of sources must be selected")]
    EmptySelection,

    #[error("a source set and a list of sources cannot both be selected")]
    ConflictingSelection,
}
