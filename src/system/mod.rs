//! System abstraction for environment and filesystem operations
//!
//! This module provides a unified trait for all external system interactions.
//! Fetched sources are handed around as in-memory filesystems behind the same
//! trait, so the merge and template code never care where bytes came from.

use std::env::VarError;
use std::io;
use std::path::{Path, PathBuf};

pub mod memory;
pub mod real;

pub use memory::MemorySystem;
pub use real::RealSystem;

/// Entry from directory walking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    pub is_file: bool,
    pub is_dir: bool,
}

/// Unified trait for system operations (environment + filesystem)
///
/// # Implementations
/// - `RealSystem`: delegates to `std::env` and `std::fs`
/// - `MemorySystem`: in-memory storage, used for fetched sources and in tests
pub trait System: Send + Sync {
    // ==================== Environment Operations ====================

    /// Get an environment variable
    fn env_var(&self, key: &str) -> Result<String, VarError>;

    // ==================== Filesystem Operations ====================

    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read entire file contents as bytes
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write bytes to a file, creating or truncating it
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Recursively create a directory and all parent directories
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Rename a file, replacing the destination if it exists
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;

    /// Check if a path points to a directory
    fn is_dir(&self, path: &Path) -> bool;

    /// Recursively walk a directory, returning all entries
    ///
    /// Entries are sorted by path and exclude the root itself. `.git`
    /// directories below the root are neither listed nor descended into.
    /// Fails with `NotFound` when `path` is not a directory.
    fn walk_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>>;
}
