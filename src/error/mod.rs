//! # Error Module
//!
//! Error types for tree duplication.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - every message names the path involved
//! - **Fatal vs recoverable** - only a missing or unreadable root stops a run;
//!   everything else is reported per entry

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum DuplicateFinderError {
    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Duplication error: {0}")]
    Duplicate(#[from] DuplicateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to serialize output: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the directory traversal engine
#[derive(Error, Debug)]
pub enum TraversalError {
    #[error("Directory not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Symbolic link loop at {path}")]
    SymlinkLoop { path: PathBuf },

    #[error("A traversal is already running on this engine")]
    AlreadyRunning,

    #[error("Failed to start traversal worker: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Traversal worker thread panicked")]
    WorkerPanicked,
}

impl TraversalError {
    /// Classify an I/O failure while listing `path`.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => TraversalError::PermissionDenied { path },
            _ => TraversalError::ReadDirectory { path, source },
        }
    }
}

/// Errors raised while comparing two entries
#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the image codec
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Per-entry errors during duplication. These never abort a run.
#[derive(Error, Debug)]
pub enum DuplicateError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {source_path} to {destination}: {source}")]
    Copy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to apply attributes to {path}: {source}")]
    Attributes {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error("Failed to resolve collision at {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to convert {path} to TIFF: {reason}")]
    Convert { path: PathBuf, reason: String },

    #[error("Source and destination are the same file: {path}")]
    SameFile { path: PathBuf },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DuplicateFinderError>;
