//! Static key extraction
//!
//! Walks the root node list of a parsed template and records every field
//! path it references in a requirement skeleton, without executing anything.

use super::parse::{Arg, Node, Template};
use super::values::TemplateValues;

/// Field path of a node that is a single bare field reference (`{{.A.B}}`)
///
/// Returns `None` for any other node: text, control flow, declarations,
/// pipelines of several commands, commands with several arguments and
/// non-field arguments.
#[must_use]
pub fn field_reference(node: &Node) -> Option<&[String]> {
    let Node::Action { pipeline, .. } = node else {
        return None;
    };
    if !pipeline.decl.is_empty() {
        return None;
    }
    match pipeline.commands.as_slice() {
        [command] => match command.args.as_slice() {
            [Arg::Field(path)] => Some(path.as_slice()),
            _ => None,
        },
        _ => None,
    }
}

/// Add every key `template` requires to `skeleton`
///
/// Text nodes are skipped. Unsupported nodes do not stop the scan; they are
/// returned, rendered back to template syntax, in the order they appear.
pub fn extract_keys(template: &Template, skeleton: &mut TemplateValues) -> Vec<String> {
    let mut unsupported = Vec::new();

    for node in &template.root {
        if let Node::Text(_) = *node {
            continue;
        }
        match field_reference(node) {
            Some(path) => skeleton.require_path(path),
            None => unsupported.push(node.to_string()),
        }
    }

    unsupported
}
