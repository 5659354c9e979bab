//! Filesystem seam
//!
//! Kernel tunables live in pseudo-files under `/proc` and `/sys`. All reads
//! and writes go through the [`Fs`] trait so checkers and commands can run
//! against [`MemFs`] in tests, or against a fake tree via [`OsFs::with_root`].

use crate::error::AccessError;
use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Minimal file access used by checkers and commands
pub trait Fs: Send + Sync {
    /// Read the whole file as text
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace the file's contents
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// The real filesystem, optionally re-rooted under a directory
#[derive(Debug, Clone, Default)]
pub struct OsFs {
    root: Option<PathBuf>,
}

impl OsFs {
    /// Access paths as given
    pub fn new() -> Self {
        Self { root: None }
    }

    /// Resolve absolute paths under `root` (e.g. a copy of `/proc/sys`)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Map a logical path to the path actually opened
    ///
    /// Under a root, `..` components are rejected so the path cannot
    /// leave the root.
    pub fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let Some(root) = &self.root else {
            return Ok(path.to_path_buf());
        };
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} escapes {}", path.display(), root.display()),
            ));
        }
        Ok(root.join(path.strip_prefix("/").unwrap_or(path)))
    }
}

impl Fs for OsFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(self.resolve(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.resolve(path)?)?;
        // procfs expects the whole value in a single write
        let mut buf = String::with_capacity(contents.len() + 1);
        buf.push_str(contents);
        buf.push('\n');
        file.write_all(buf.as_bytes())
    }
}

/// In-memory filesystem for tests and simulations
///
/// Clones share the same contents, so a test can keep a handle while a
/// checker and an executor hold others.
#[derive(Debug, Clone, Default)]
pub struct MemFs {
    inner: Arc<Mutex<MemFsInner>>,
}

#[derive(Debug, Default)]
struct MemFsInner {
    files: HashMap<PathBuf, String>,
    read_only: HashSet<PathBuf>,
    writes: usize,
}

impl MemFs {
    /// Create an empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a filesystem holding a single file
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::new();
        fs.insert(path, contents);
        fs
    }

    /// Set a file's contents without counting it as a write
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.lock().files.insert(path.into(), contents.into());
    }

    /// Make writes to `path` fail with `PermissionDenied`
    pub fn set_read_only(&self, path: impl Into<PathBuf>) {
        self.lock().read_only.insert(path.into());
    }

    /// Current contents of a file
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    /// Number of successful writes performed through [`Fs::write`]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn lock(&self) -> MutexGuard<'_, MemFsInner> {
        // A panicking test thread must not hide the state from the others
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Fs for MemFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.lock().files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        let mut inner = self.lock();
        if inner.read_only.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }
        inner.files.insert(path.to_path_buf(), format!("{contents}\n"));
        inner.writes += 1;
        Ok(())
    }
}

/// Read a file holding a single integer, ignoring surrounding whitespace
pub fn read_int_from_file(fs: &dyn Fs, path: &Path) -> Result<i64, AccessError> {
    let raw = fs.read_to_string(path).map_err(|source| AccessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let trimmed = raw.trim();
    trimmed.parse::<i64>().map_err(|source| AccessError::Parse {
        path: path.to_path_buf(),
        raw: trimmed.to_string(),
        source,
    })
}
