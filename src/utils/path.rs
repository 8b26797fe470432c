//! Path manipulation and validation utilities

use crate::error::GraftError;
use anyhow::Result;
use std::path::{Component, Path, PathBuf};

/// Extension carried by files that must be rendered
pub const TEMPLATE_EXTENSION: &str = "template";

/// Name of the version-control metadata directory skipped during walks
pub const VCS_DIR_NAME: &str = ".git";

/// Normalize a path by resolving `.` and `..` components
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep leading '..' so callers can detect an escape
                match components.last() {
                    Some(Component::Normal(_)) => {
                        components.pop();
                    }
                    _ => components.push(component),
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Turn a source's declared `path` into a location relative to the fetched root
///
/// `""`, `"."` and `"/"` all select the root. Leading slashes are treated as
/// relative to the source, never to the host filesystem. Paths that climb out
/// of the root are rejected.
pub fn source_subpath(path: &str) -> Result<PathBuf> {
    let trimmed = path.trim().trim_start_matches('/');
    let normalized = normalize_path(Path::new(trimmed));

    if normalized
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(GraftError::configuration(format!(
            "Path contains unsafe directory traversal: '{path}' -> '{}'",
            normalized.display()
        ))
        .into());
    }

    Ok(normalized)
}

/// Check whether a path carries the template extension
///
/// A file named exactly `.template` has no stem to render into, so it is
/// copied as a plain file rather than treated as a template.
#[must_use]
pub fn is_template_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == TEMPLATE_EXTENSION)
}

/// Drop the trailing `.template` extension, if present
#[must_use]
pub fn strip_template_suffix(path: &Path) -> PathBuf {
    if is_template_file(path) {
        path.with_extension("")
    } else {
        path.to_path_buf()
    }
}

/// Check whether any component below `root` is the VCS metadata directory
#[must_use]
pub fn is_within_vcs_dir(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str() == VCS_DIR_NAME)
}
