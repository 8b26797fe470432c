//! Copying fetched trees into the target filesystem

use crate::system::System;
use crate::utils::path::is_within_vcs_dir;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

/// A file or directory that could not be copied
#[derive(Error, Debug)]
#[error("failed to copy {}: {source}", path.display())]
pub struct CopyError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Recursively copy `source_root` of `source` into `dest_root` of `dest`
///
/// Relative structure is preserved and existing files are overwritten.
/// Version control metadata (`.git`) is never copied. Returns the number of
/// files written.
pub fn copy_tree(
    source: &dyn System,
    source_root: &Path,
    dest: &dyn System,
    dest_root: &Path,
) -> Result<usize, CopyError> {
    let entries = source.walk_dir(source_root).map_err(at(source_root))?;
    dest.create_dir_all(dest_root).map_err(at(dest_root))?;

    let mut files_copied = 0;
    for entry in entries {
        if is_within_vcs_dir(&entry.path, source_root) {
            continue;
        }
        let Ok(relative) = entry.path.strip_prefix(source_root) else {
            continue;
        };
        let target = dest_root.join(relative);

        if entry.is_dir {
            dest.create_dir_all(&target).map_err(at(&target))?;
        } else if entry.is_file {
            if let Some(parent) = target.parent() {
                dest.create_dir_all(parent).map_err(at(parent))?;
            }
            let contents = source.read(&entry.path).map_err(at(&entry.path))?;
            dest.write(&target, &contents).map_err(at(&target))?;
            files_copied += 1;
        }
    }

    Ok(files_copied)
}

fn at(path: &Path) -> impl FnOnce(io::Error) -> CopyError + use<> {
    let path = path.to_path_buf();
    move |source| CopyError { path, source }
}

/// Target filesystem shared by concurrent merges
///
/// Each [`copy_into`](Self::copy_into) call holds one lock for its whole
/// walk, so two merges never interleave. When two sources write the same
/// path the later merge wins.
pub struct SafeFs<'fs> {
    target: &'fs dyn System,
    lock: Mutex<()>,
}

impl<'fs> SafeFs<'fs> {
    #[must_use]
    pub fn new(target: &'fs dyn System) -> Self {
        Self {
            target,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn target(&self) -> &'fs dyn System {
        self.target
    }

    /// Copy everything under `source_root` of `source` into `dest_root`
    pub fn copy_into(
        &self,
        source: &dyn System,
        source_root: &Path,
        dest_root: &Path,
    ) -> Result<usize, CopyError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let copied = copy_tree(source, source_root, self.target, dest_root)?;
        debug!(
            files = copied,
            dest = %dest_root.display(),
            "merged source tree"
        );
        Ok(copied)
    }
}
