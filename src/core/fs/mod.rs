//! # Filesystem Module
//!
//! The filesystem surface the traversal engine and the duplicator work
//! against. `LocalFileSystem` is the real implementation; tests wrap it to
//! inject failures.

mod local;

pub use local::LocalFileSystem;

use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// What kind of entry a path names (after resolving links)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// Attributes of a filesystem entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Size in bytes (0 for directories on most platforms)
    pub size: u64,
    /// Dot-prefixed on Unix, hidden attribute on Windows
    pub hidden: bool,
    /// System attribute (Windows only)
    pub system: bool,
}

impl EntryMetadata {
    /// Hidden or system entries, the ones `skip_system_files` leaves behind.
    pub fn is_hidden_or_system(&self) -> bool {
        self.hidden || self.system
    }
}

/// A directory or file discovered while listing a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEntry {
    /// Absolute path of the entry
    pub path: PathBuf,
    pub kind: EntryKind,
    /// The entry is a symbolic link (or junction) to `kind`
    pub is_link: bool,
    pub metadata: EntryMetadata,
}

impl FsEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }
}

/// A child that was enumerated but could not be described, e.g. removed
/// between the directory read and its stat
#[derive(Debug)]
pub struct FailedEntry {
    pub path: PathBuf,
    pub source: io::Error,
}

/// Children of one directory
#[derive(Debug, Default)]
pub struct Listing {
    /// Sorted by file name
    pub entries: Vec<FsEntry>,
    pub failures: Vec<FailedEntry>,
}

/// Filesystem operations needed by the traversal engine and the duplicator.
///
/// Implement this trait to run against something other than the local disk
/// (e.g., to inject failures in tests).
pub trait FileSystem: Send + Sync {
    /// List the immediate children of `dir`, excluding `.` and `..`, sorted
    /// by file name.
    ///
    /// Fails only when `dir` itself cannot be enumerated. A child that
    /// cannot be described lands in `Listing::failures`.
    fn list_children(&self, dir: &Path) -> io::Result<Listing>;

    /// Metadata of `path`, following links
    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata>;

    /// Whether anything (including a dangling link) occupies `path`
    fn exists(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;

    /// Read a whole file into memory
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.open_read(path)?.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create a file that must not exist yet. Fails with
    /// `ErrorKind::AlreadyExists` if something occupies `path`.
    fn create_new_file(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Create `path` or truncate the existing file
    fn create_or_truncate_file(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Copy permission bits from `from` onto `to`
    fn copy_permissions(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy access and modification times from `from` onto `to`
    fn copy_times(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// Whether a file name is hidden by Unix convention
pub fn is_dot_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
