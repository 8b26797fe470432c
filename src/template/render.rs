//! Template execution against a values map
//!
//! Only text and single field references can be rendered. A missing key is
//! always an error.

use super::TemplateError;
use super::extract::field_reference;
use super::parse::{Node, Template};
use super::values::{LookupError, TemplateValues};
use std::path::Path;

/// Render `template` into a string
///
/// # Errors
///
/// Returns an error if:
/// - A referenced key is absent from `values` or reaches through a string
/// - A referenced key resolves to a nested map instead of a string
/// - The template contains a construct other than text and field references
pub fn render(
    path: &Path,
    template: &Template,
    values: &TemplateValues,
) -> Result<String, TemplateError> {
    let mut out = String::new();

    for node in &template.root {
        if let Node::Text(ref text) = *node {
            out.push_str(text);
            continue;
        }

        let Some(keys) = field_reference(node) else {
            return Err(TemplateError::UnsupportedConstruct {
                path: path.to_path_buf(),
                node: node.to_string(),
            });
        };

        let value = values.lookup(keys).map_err(|err| match err {
            LookupError::Missing { path: key } | LookupError::NotANode { path: key } => {
                TemplateError::MissingValue {
                    path: path.to_path_buf(),
                    key,
                }
            }
            LookupError::NotALeaf { path: key } => TemplateError::NotALeaf {
                path: path.to_path_buf(),
                key,
            },
        })?;
        out.push_str(value);
    }

    Ok(out)
}
