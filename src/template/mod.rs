//! Template discovery, key extraction and rendering
//!
//! Files ending in `.template` are parsed with a text/template style parser.
//! Only plain field references (`{{ .A.B }}`) are supported; everything else
//! is reported as an unsupported construct.

pub mod extract;
pub mod parse;
pub mod render;
pub mod service;
pub mod values;

pub use service::TemplateService;
pub use values::{TemplateValues, Value};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the template pipeline
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TemplateError {
    #[error("template root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse template {}: line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("node {node} not supported in {}", path.display())]
    UnsupportedConstruct { path: PathBuf, node: String },

    #[error("templates use unsupported constructs: {}", join_messages(errors))]
    UnsupportedConstructs { errors: Vec<TemplateError> },

    #[error("error executing template {}: map has no entry for key \"{key}\"", path.display())]
    MissingValue { path: PathBuf, key: String },

    #[error("error executing template {}: value for key \"{key}\" is a map, not a string", path.display())]
    NotALeaf { path: PathBuf, key: String },

    #[error("values are missing for required keys: {}", keys.join(", "))]
    MissingValues { keys: Vec<String> },

    #[error("failed to write template {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error renaming template file {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn join_messages(errors: &[TemplateError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
