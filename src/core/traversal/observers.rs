//! Ready-made observers.

use super::{Flow, TraversalObserver, TraversalOutcome};
use crate::core::fs::FsEntry;
use crate::error::TraversalError;
use crate::events::{EventSender, TraversalEvent};
use std::path::{Path, PathBuf};

/// Forwards every notification to an event channel.
///
/// Never cancels on its own; stop the run through the engine or the
/// `TraversalHandle` instead.
#[derive(Clone)]
pub struct ChannelObserver {
    events: EventSender,
}

impl ChannelObserver {
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TraversalObserver for ChannelObserver {
    fn on_directory(&mut self, entry: &FsEntry) -> Flow {
        self.events.traversal(TraversalEvent::DirectoryFound {
            path: entry.path.clone(),
        });
        Flow::Continue
    }

    fn on_file(&mut self, entry: &FsEntry) -> Flow {
        self.events.traversal(TraversalEvent::FileFound {
            path: entry.path.clone(),
            size: entry.size(),
        });
        Flow::Continue
    }

    fn on_error(&mut self, path: &Path, error: &TraversalError) {
        self.events.traversal(TraversalEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
    }

    fn on_finished(&mut self, outcome: &TraversalOutcome) {
        self.events.traversal(TraversalEvent::Finished(*outcome));
    }
}

/// Records paths in notification order. Can cancel after a number of
/// notifications or refuse to descend into directories with a given name.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    /// Directories and files, interleaved as delivered
    pub order: Vec<PathBuf>,
    pub directories: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
    pub errors: Vec<(PathBuf, String)>,
    pub outcome: Option<TraversalOutcome>,
    cancel_after: Option<usize>,
    skip_name: Option<String>,
}

impl CollectingObserver {
    /// Cancel on the `n`th notification
    pub fn cancelling_after(n: usize) -> Self {
        Self {
            cancel_after: Some(n),
            ..Default::default()
        }
    }

    /// Do not descend into directories named `name`
    pub fn skipping(name: impl Into<String>) -> Self {
        Self {
            skip_name: Some(name.into()),
            ..Default::default()
        }
    }

    fn record(&mut self, path: &Path) -> Flow {
        self.order.push(path.to_path_buf());
        match self.cancel_after {
            Some(n) if self.order.len() >= n => Flow::Cancel,
            _ => Flow::Continue,
        }
    }
}

impl TraversalObserver for CollectingObserver {
    fn on_directory(&mut self, entry: &FsEntry) -> Flow {
        self.directories.push(entry.path.clone());
        let flow = self.record(&entry.path);

        let skip = self
            .skip_name
            .as_deref()
            .is_some_and(|name| entry.path.file_name().is_some_and(|n| n == name));
        if flow == Flow::Continue && skip {
            return Flow::SkipSubtree;
        }
        flow
    }

    fn on_file(&mut self, entry: &FsEntry) -> Flow {
        self.files.push(entry.path.clone());
        self.record(&entry.path)
    }

    fn on_error(&mut self, path: &Path, error: &TraversalError) {
        self.errors.push((path.to_path_buf(), error.to_string()));
    }

    fn on_finished(&mut self, outcome: &TraversalOutcome) {
        self.outcome = Some(*outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::{EntryKind, EntryMetadata};
    use crate::core::traversal::EndReason;
    use crate::events::{Event, EventChannel};

    fn file(path: &str) -> FsEntry {
        FsEntry {
            path: PathBuf::from(path),
            kind: EntryKind::File,
            is_link: false,
            metadata: EntryMetadata {
                size: 3,
                ..Default::default()
            },
        }
    }

    #[test]
    fn channel_observer_forwards_notifications() {
        let (sender, receiver) = EventChannel::new();
        let mut observer = ChannelObserver::new(sender);

        assert_eq!(observer.on_file(&file("/data/a.txt")), Flow::Continue);
        observer.on_finished(&TraversalOutcome {
            end: EndReason::Finished,
            directories_found: 0,
            directories_visited: 1,
            files_found: 1,
            errors: 0,
        });

        let events = receiver.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Event::Traversal(TraversalEvent::FileFound { size: 3, .. })
        ));
        assert!(matches!(events[1], Event::Traversal(TraversalEvent::Finished(_))));
    }

    #[test]
    fn collecting_observer_cancels_on_count() {
        let mut observer = CollectingObserver::cancelling_after(2);
        assert_eq!(observer.on_file(&file("a")), Flow::Continue);
        assert_eq!(observer.on_file(&file("b")), Flow::Cancel);
    }
}
