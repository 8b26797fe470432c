//! In-memory system implementation
//!
//! Backs the virtual filesystem that every source client returns, and doubles
//! as an isolated filesystem for tests.

use super::{System, WalkEntry};
use crate::utils::path::is_within_vcs_dir;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::env::VarError;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory implementation of the System trait
///
/// Cloning a `MemorySystem` yields another handle onto the same storage.
///
/// # Example
/// ```
/// use graftset::system::{MemorySystem, System};
/// use std::path::Path;
///
/// let system = MemorySystem::new()
///     .with_env("HOME", "/home/user")
///     .with_file("/test/file.txt", b"Hello, world!")
///     .with_dir("/test/subdir");
///
/// assert_eq!(system.env_var("HOME").unwrap(), "/home/user");
/// assert!(system.exists(Path::new("/test/file.txt")));
/// ```
#[derive(Debug, Clone)]
pub struct MemorySystem {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug)]
struct MemoryState {
    env_vars: HashMap<String, String>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    dirs: BTreeSet<PathBuf>,
}

impl MemorySystem {
    /// Create an empty filesystem containing only `/`
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                env_vars: HashMap::new(),
                files: BTreeMap::new(),
                dirs: BTreeSet::from([PathBuf::from("/")]),
            })),
        }
    }

    /// Set an environment variable (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_env(self, key: &str, value: &str) -> Self {
        self.write_state()
            .env_vars
            .insert(key.to_owned(), value.to_owned());
        self
    }

    /// Add a file with contents, creating parent directories (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> Self {
        let path_buf = path.as_ref().to_path_buf();
        {
            let mut state = self.write_state();
            if let Some(parent) = path_buf.parent() {
                ensure_parent_dirs(&mut state.dirs, parent);
            }
            state.files.insert(path_buf, contents.to_vec());
        }
        self
    }

    /// Add a directory and its ancestors (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> Self {
        ensure_parent_dirs(&mut self.write_state().dirs, path.as_ref());
        self
    }

    fn read_state(&self) -> RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemorySystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_parent_dirs(dirs: &mut BTreeSet<PathBuf>, path: &Path) {
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        dirs.insert(ancestor.to_path_buf());
    }
}

fn not_found(what: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{what} not found: {}", path.display()),
    )
}

impl System for MemorySystem {
    #[inline]
    fn env_var(&self, key: &str) -> Result<String, VarError> {
        self.read_state()
            .env_vars
            .get(key)
            .cloned()
            .ok_or(VarError::NotPresent)
    }

    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.read_state()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("File", path))
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.write_state();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }
        if state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("Path is a directory: {}", path.display()),
            ));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    #[inline]
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.write_state();
        if let Some(file) = path.ancestors().find(|a| state.files.contains_key(*a)) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("Path exists but is not a directory: {}", file.display()),
            ));
        }
        ensure_parent_dirs(&mut state.dirs, path);
        Ok(())
    }

    #[inline]
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.write_state();

        if let Some(parent) = to.parent()
            && !parent.as_os_str().is_empty()
            && !state.dirs.contains(parent)
        {
            return Err(not_found("Parent directory", parent));
        }

        let contents = state
            .files
            .remove(from)
            .ok_or_else(|| not_found("File", from))?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        let state = self.read_state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.read_state().files.contains_key(path)
    }

    #[inline]
    fn is_dir(&self, path: &Path) -> bool {
        self.read_state().dirs.contains(path)
    }

    #[inline]
    fn walk_dir(&self, path: &Path) -> io::Result<Vec<WalkEntry>> {
        let state = self.read_state();

        if !state.dirs.contains(path) {
            return Err(not_found("Directory", path));
        }

        let mut entries: Vec<WalkEntry> = state
            .dirs
            .iter()
            .filter(|dir| {
                dir.starts_with(path) && dir.as_path() != path && !is_within_vcs_dir(dir, path)
            })
            .map(|dir| WalkEntry {
                path: dir.clone(),
                is_file: false,
                is_dir: true,
            })
            .chain(
                state
                    .files
                    .keys()
                    .filter(|file| file.starts_with(path) && !is_within_vcs_dir(file, path))
                    .map(|file| WalkEntry {
                        path: file.clone(),
                        is_file: true,
                        is_dir: false,
                    }),
            )
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }
}
