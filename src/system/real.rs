//! Real system implementation using `std::env` and `std::fs`

use super::{System, WalkEntry};
use crate::utils::path::VCS_DIR_NAME;
use std::env::VarError;
use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Production implementation of System trait
///
/// Directly delegates to the standard library's environment and filesystem
/// functions.
#[derive(Debug, Clone, Copy)]
pub struct RealSystem;

impl RealSystem {
    /// Create a new `RealSystem` instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RealSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for RealSystem {
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        std::env::var(key)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn walk_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>> {
        if !path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Directory not found: {}", path.display()),
            ));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || e.file_name() != VCS_DIR_NAME);
        for entry in walker {
            let entry = entry.map_err(io::Error::other)?;
            let file_type = entry.file_type();
            entries.push(WalkEntry {
                path: entry.into_path(),
                is_file: file_type.is_file(),
                is_dir: file_type.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn walk_dir_lists_nested_entries_sorted() {
        let system = RealSystem::new();
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        system.create_dir_all(&root.join("b/nested")).unwrap();
        system.write(&root.join("a.txt"), b"a").unwrap();
        system.write(&root.join("b/nested/c.txt"), b"c").unwrap();

        let entries = system.walk_dir(root).unwrap();
        let relative: Vec<_> = entries
            .iter()
            .map(|e| e.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                Path::new("a.txt").to_path_buf(),
                Path::new("b").to_path_buf(),
                Path::new("b/nested").to_path_buf(),
                Path::new("b/nested/c.txt").to_path_buf(),
            ]
        );
        assert!(entries[0].is_file);
        assert!(entries[1].is_dir);
    }

    #[test]
    fn walk_dir_does_not_descend_into_git() {
        let system = RealSystem::new();
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        system.create_dir_all(&root.join(".git/refs/heads")).unwrap();
        system.write(&root.join(".git/HEAD"), b"ref: refs/heads/main").unwrap();
        system.create_dir_all(&root.join("sub/.git")).unwrap();
        system.write(&root.join("sub/.git/config"), b"").unwrap();
        system.write(&root.join("sub/keep.txt"), b"keep").unwrap();

        let relative: Vec<_> = system
            .walk_dir(root)
            .unwrap()
            .iter()
            .map(|e| e.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            relative,
            vec![
                Path::new("sub").to_path_buf(),
                Path::new("sub/keep.txt").to_path_buf(),
            ]
        );
    }

    #[test]
    fn walk_dir_on_missing_directory_fails() {
        let system = RealSystem::new();
        let temp_dir = TempDir::new().unwrap();
        let err = system.walk_dir(&temp_dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn rename_moves_file() {
        let system = RealSystem::new();
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("main.tf.template");
        let to = temp_dir.path().join("main.tf");
        system.write(&from, b"x").unwrap();

        system.rename(&from, &to).unwrap();

        assert!(!system.exists(&from));
        assert_eq!(system.read_to_string(&to).unwrap(), "x");
    }
}
