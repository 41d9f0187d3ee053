//! # Duplicator Module
//!
//! Copies a directory tree into a destination, skipping content that is
//! already there.
//!
//! ## Per-entry flow
//! 1. **Traverse** - the traversal engine reports source directories and files
//! 2. **Mirror** - each directory is created at the destination if missing
//! 3. **Copy** - files with a free destination path are copied directly
//! 4. **Compare** - occupied destinations are compared with the source
//! 5. **Resolve** - the collision policy picks skip, overwrite or rename
//!
//! A failing entry is logged and counted; it never stops the run. Only an
//! unreadable source root does.

mod executor;

pub use executor::{Duplicator, DuplicatorBuilder};

use crate::core::collision::CollisionAction;
use crate::core::traversal::{Depth, LinkPolicy, TraversalOutcome, TraversalRequest};
use crate::error::TraversalError;
use crate::events::DuplicateSummary;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for a duplication run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateOptions {
    /// What to do when a destination file already exists
    pub collision: CollisionAction,
    /// Create the directories only
    pub directory_structure_only: bool,
    pub skip_zero_byte_files: bool,
    /// Leave out hidden and system files and directories (with their contents)
    pub skip_system_files: bool,
    /// Walk all descendants, not just the top level
    pub recursive: bool,
    pub directory_links: LinkPolicy,
    pub file_links: LinkPolicy,
    /// Compare images by pixels, allowing for rotation
    pub compare_images: bool,
    /// Images in different storage formats are never identical
    pub compare_image_format: bool,
    /// Write image files as `.tiff`
    pub convert_images_to_tiff: bool,
    pub preserve_permissions: bool,
    pub preserve_timestamps: bool,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            collision: CollisionAction::default(),
            directory_structure_only: false,
            skip_zero_byte_files: false,
            skip_system_files: false,
            recursive: true,
            directory_links: LinkPolicy::Ignore,
            file_links: LinkPolicy::Ignore,
            compare_images: true,
            compare_image_format: false,
            convert_images_to_tiff: false,
            preserve_permissions: true,
            preserve_timestamps: true,
        }
    }
}

impl DuplicateOptions {
    /// Traversal request for walking `source` under these options
    pub fn traversal_request(&self, source: &Path) -> Result<TraversalRequest, TraversalError> {
        let depth = if self.recursive {
            Depth::AllDescendants
        } else {
            Depth::TopLevel
        };

        Ok(TraversalRequest::new(source)?
            .depth(depth)
            .directory_links(self.directory_links)
            .file_links(self.file_links))
    }
}

/// Result of a duplication run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// How the source traversal ended
    pub outcome: TraversalOutcome,
    /// Files copied to a free destination path
    pub files_copied: usize,
    pub files_overwritten: usize,
    /// Files copied under a suffixed name
    pub files_renamed: usize,
    pub files_skipped: usize,
    /// Hidden/system directories left out with their contents
    pub directories_skipped: usize,
    pub directories_created: usize,
    /// Per-entry failures (non-fatal)
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl DuplicateReport {
    /// Whether the traversal ran to completion. Per-entry errors do not
    /// count against success.
    pub fn succeeded(&self) -> bool {
        self.outcome.is_finished()
    }

    pub fn files_written(&self) -> usize {
        self.files_copied + self.files_overwritten + self.files_renamed
    }

    pub fn summary(&self) -> DuplicateSummary {
        DuplicateSummary {
            outcome: self.outcome,
            files_copied: self.files_copied,
            files_overwritten: self.files_overwritten,
            files_renamed: self.files_renamed,
            files_skipped: self.files_skipped,
            directories_created: self.directories_created,
            errors: self.errors.len(),
            duration_ms: self.duration_ms,
        }
    }
}
