//! Event type definitions for progress reporting.

use crate::core::traversal::TraversalOutcome;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the traversal engine and the duplicator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory walk events
    Traversal(TraversalEvent),
    /// Copy decisions and their results
    Duplicate(DuplicateEvent),
}

/// Events from a traversal run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TraversalEvent {
    /// A directory was reported
    DirectoryFound { path: PathBuf },
    /// A file was reported
    FileFound { path: PathBuf, size: u64 },
    /// A directory could not be listed; the walk continues elsewhere
    Error { path: PathBuf, message: String },
    /// The run ended
    Finished(TraversalOutcome),
}

/// Why a source file was not written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The destination already holds the same content
    Identical,
    /// The collision policy keeps existing files
    KeptExisting,
    /// Empty source file with `skip_zero_byte_files`
    ZeroByte,
    /// Hidden or system entry with `skip_system_files`
    HiddenOrSystem,
    /// `directory_structure_only` is set
    StructureOnly,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Identical => write!(f, "identical content already present"),
            SkipReason::KeptExisting => write!(f, "existing file kept"),
            SkipReason::ZeroByte => write!(f, "empty file"),
            SkipReason::HiddenOrSystem => write!(f, "hidden or system entry"),
            SkipReason::StructureOnly => write!(f, "directory structure only"),
        }
    }
}

/// Events during a duplication run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DuplicateEvent {
    /// Duplication has started
    Started {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Progress update after each file
    Progress(DuplicateProgress),
    /// A mirrored directory was created
    DirectoryCreated { path: PathBuf },
    /// A file was copied to a free destination path
    FileCopied {
        source: PathBuf,
        destination: PathBuf,
        bytes: u64,
    },
    /// An existing destination file was replaced
    FileOverwritten {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A file was copied under a new name to avoid a collision
    FileRenamed {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A file or subtree was left out
    Skipped { path: PathBuf, reason: SkipReason },
    /// An entry failed; duplication continues
    Error { path: PathBuf, message: String },
    /// Duplication ended
    Completed { summary: DuplicateSummary },
}

/// Running totals during duplication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateProgress {
    /// Source files reported so far
    pub files_found: usize,
    /// Files written (copied, overwritten or renamed)
    pub files_written: usize,
    pub files_skipped: usize,
    /// File just processed
    pub current_path: PathBuf,
}

/// Summary of a duplication run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub outcome: TraversalOutcome,
    pub files_copied: usize,
    pub files_overwritten: usize,
    pub files_renamed: usize,
    pub files_skipped: usize,
    pub directories_created: usize,
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traversal::EndReason;

    #[test]
    fn events_are_serializable() {
        let event = Event::Duplicate(DuplicateEvent::Progress(DuplicateProgress {
            files_found: 10,
            files_written: 7,
            files_skipped: 3,
            current_path: PathBuf::from("/data/a.txt"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Duplicate(DuplicateEvent::Progress(p)) => {
                assert_eq!(p.files_written, 7);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn summary_carries_traversal_outcome() {
        let summary = DuplicateSummary {
            outcome: TraversalOutcome {
                end: EndReason::Cancelled,
                directories_found: 2,
                directories_visited: 1,
                files_found: 5,
                errors: 0,
            },
            files_copied: 5,
            files_overwritten: 0,
            files_renamed: 0,
            files_skipped: 0,
            directories_created: 2,
            errors: 0,
            duration_ms: 12,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"cancelled\""));
    }

    #[test]
    fn skip_reason_is_readable() {
        assert_eq!(SkipReason::ZeroByte.to_string(), "empty file");
    }
}
