//! # Traversal Module
//!
//! Walks a directory tree and reports every directory and file it finds to
//! a `TraversalObserver`.
//!
//! ## Guarantees
//! - Pre-order: a directory is reported before anything inside it, and its
//!   subdirectories are walked before its files are reported
//! - Deterministic order: children are visited sorted by file name
//! - Cooperative cancellation: an observer returning `Flow::Cancel`, or
//!   `TraversalEngine::stop()` from any thread, ends the run at the next
//!   checkpoint with `EndReason::Cancelled`
//! - Only an unreadable root is fatal; a failing subdirectory is reported and
//!   skipped
//!
//! ## Example
//! ```rust,ignore
//! use tree_duplicator::core::traversal::{TraversalEngine, TraversalRequest, CollectingObserver};
//!
//! let request = TraversalRequest::new("/data")?.top_level_only();
//! let mut observer = CollectingObserver::default();
//! let outcome = TraversalEngine::new().run(&request, &mut observer)?;
//! println!("{} files", outcome.files_found);
//! ```

mod engine;
mod observers;

pub use engine::{TraversalEngine, TraversalHandle};
pub use observers::{ChannelObserver, CollectingObserver};

use crate::core::fs::FsEntry;
use crate::error::TraversalError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// How deep a traversal goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    /// Immediate children of the root only
    TopLevel,
    #[default]
    AllDescendants,
}

/// What to do with symbolic links (and junctions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// Neither report nor descend
    #[default]
    Ignore,
    /// Report, and descend into linked directories
    Follow,
    /// Report as-is. Linked directories are still descended; the target is
    /// not distinguished from a plain directory.
    Return,
}

/// Which notifications are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventMask {
    Files,
    Directories,
    #[default]
    Both,
}

impl EventMask {
    pub fn includes_files(self) -> bool {
        matches!(self, EventMask::Files | EventMask::Both)
    }

    pub fn includes_directories(self) -> bool {
        matches!(self, EventMask::Directories | EventMask::Both)
    }
}

/// Parameters of one traversal run. Validated on construction and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalRequest {
    root: PathBuf,
    depth: Depth,
    directory_links: LinkPolicy,
    file_links: LinkPolicy,
    mask: EventMask,
}

impl TraversalRequest {
    /// Build a request rooted at `root`, which must be an existing directory.
    /// The root is stored as an absolute, canonical path.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, TraversalError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(TraversalError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        if !root.is_dir() {
            return Err(TraversalError::RootNotDirectory {
                path: root.to_path_buf(),
            });
        }
        let root = fs::canonicalize(root)
            .map_err(|source| TraversalError::from_io(root.to_path_buf(), source))?;

        Ok(Self {
            root,
            depth: Depth::default(),
            directory_links: LinkPolicy::default(),
            file_links: LinkPolicy::default(),
            mask: EventMask::default(),
        })
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn top_level_only(self) -> Self {
        self.depth(Depth::TopLevel)
    }

    pub fn directory_links(mut self, policy: LinkPolicy) -> Self {
        self.directory_links = policy;
        self
    }

    pub fn file_links(mut self, policy: LinkPolicy) -> Self {
        self.file_links = policy;
        self
    }

    pub fn events(mut self, mask: EventMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn recursion(&self) -> Depth {
        self.depth
    }

    pub fn directory_link_policy(&self) -> LinkPolicy {
        self.directory_links
    }

    pub fn file_link_policy(&self) -> LinkPolicy {
        self.file_links
    }

    pub fn mask(&self) -> EventMask {
        self.mask
    }
}

/// Observer verdict after a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the whole traversal
    Cancel,
    /// Do not descend into this directory. Same as `Continue` for files.
    SkipSubtree,
}

/// Receives notifications from a traversal.
///
/// All methods have no-op defaults so observers implement only what they
/// need. Notifications are delivered on the thread running the traversal.
pub trait TraversalObserver {
    fn on_directory(&mut self, _entry: &FsEntry) -> Flow {
        Flow::Continue
    }

    fn on_file(&mut self, _entry: &FsEntry) -> Flow {
        Flow::Continue
    }

    /// A directory could not be listed (or a link loop was found). The run
    /// continues unless this is the root.
    fn on_error(&mut self, _path: &Path, _error: &TraversalError) {}

    /// Called once with the terminal outcome
    fn on_finished(&mut self, _outcome: &TraversalOutcome) {}
}

/// Why a traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Finished,
    Cancelled,
    /// The root could not be listed
    FatalError,
}

/// Terminal summary of a traversal run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalOutcome {
    pub end: EndReason,
    /// Directory notifications delivered
    pub directories_found: usize,
    /// Directories whose children were all processed, the root included
    pub directories_visited: usize,
    /// File notifications delivered
    pub files_found: usize,
    pub errors: usize,
}

impl TraversalOutcome {
    pub fn is_finished(&self) -> bool {
        self.end == EndReason::Finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.end == EndReason::Cancelled
    }
}

/// Stop flag of one run, settable from any thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
