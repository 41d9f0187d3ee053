//! # Collision Module
//!
//! Decides what happens when a copy would land on an existing entry.
//!
//! | Policy | Identical content | Different content |
//! |---|---|---|
//! | `OverwriteExistingFiles` | overwrite | overwrite |
//! | `KeepExistingFiles` | skip | skip |
//! | `RenameAnyExistingFiles` | rename | rename |
//! | `RenameDifferentExistingFiles` | skip | rename |
//!
//! Renamed copies get a `_N` suffix before the extension
//! (`photo.jpg` -> `photo_1.jpg`). Every candidate is checked against the
//! filesystem, and the returned path is the one the copy is written to.

use crate::core::fs::FileSystem;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on suffix candidates tried for one file
pub const MAX_RENAME_ATTEMPTS: usize = 10_000;

/// Policy for destination paths that are already occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionAction {
    OverwriteExistingFiles,
    KeepExistingFiles,
    RenameAnyExistingFiles,
    /// Skip identical files, keep both copies of different ones
    #[default]
    RenameDifferentExistingFiles,
}

/// What to do with one colliding copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionDecision {
    Skip,
    Overwrite,
    /// Write to `path`, which is `existing` with `suffix` inserted
    RenameWithSuffix { suffix: String, path: PathBuf },
}

/// Applies a `CollisionAction` to individual collisions
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver {
    policy: CollisionAction,
}

impl CollisionResolver {
    pub fn new(policy: CollisionAction) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CollisionAction {
        self.policy
    }

    /// Whether deciding requires knowing if the contents are identical
    pub fn needs_comparison(&self) -> bool {
        self.policy == CollisionAction::RenameDifferentExistingFiles
    }

    /// Decide what to do about a copy onto `existing`.
    pub fn resolve(
        &self,
        fs: &dyn FileSystem,
        existing: &Path,
        identical: bool,
    ) -> io::Result<CollisionDecision> {
        match self.policy {
            CollisionAction::OverwriteExistingFiles => Ok(CollisionDecision::Overwrite),
            CollisionAction::KeepExistingFiles => Ok(CollisionDecision::Skip),
            CollisionAction::RenameAnyExistingFiles => rename(fs, existing),
            CollisionAction::RenameDifferentExistingFiles if identical => {
                Ok(CollisionDecision::Skip)
            }
            CollisionAction::RenameDifferentExistingFiles => rename(fs, existing),
        }
    }
}

fn rename(fs: &dyn FileSystem, existing: &Path) -> io::Result<CollisionDecision> {
    let (suffix, path) = unique_sibling(fs, existing, 1)?;
    Ok(CollisionDecision::RenameWithSuffix { suffix, path })
}

/// Find the first `<stem>_<n>.<ext>` next to `path`, counting from `start`,
/// that nothing occupies.
pub fn unique_sibling(
    fs: &dyn FileSystem,
    path: &Path,
    start: usize,
) -> io::Result<(String, PathBuf)> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    let parent = path.parent().unwrap_or(Path::new(""));

    for counter in start..start.saturating_add(MAX_RENAME_ATTEMPTS) {
        let suffix = format!("_{}", counter);
        let new_name = match &ext {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext),
            None => format!("{}{}", stem, suffix),
        };
        let candidate = parent.join(new_name);
        if !fs.exists(&candidate) {
            return Ok((suffix, candidate));
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} after {} attempts", path.display(), MAX_RENAME_ATTEMPTS),
    ))
}

/// Counter of a suffix produced by `unique_sibling`
pub fn suffix_counter(suffix: &str) -> Option<usize> {
    suffix.strip_prefix('_')?.parse().ok()
}
