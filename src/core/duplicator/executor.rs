//! Duplication run: a traversal observer that mirrors what it is shown.

use super::{DuplicateOptions, DuplicateReport};
use crate::core::codec::{is_image_path, ImageCodec, StandardCodec};
use crate::core::collision::{
    suffix_counter, unique_sibling, CollisionAction, CollisionDecision, CollisionResolver,
};
use crate::core::comparator::ContentComparator;
use crate::core::fs::{FileSystem, FsEntry, LocalFileSystem};
use crate::core::traversal::{Flow, TraversalEngine, TraversalObserver, TraversalOutcome};
use crate::error::{DuplicateError, DuplicateFinderError, TraversalError};
use crate::events::{null_sender, DuplicateEvent, DuplicateProgress, EventSender, SkipReason};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Renamed targets taken by someone else between resolution and creation
/// are retried this many times.
const MAX_RENAME_RACES: usize = 16;

/// Builder for a `Duplicator`
pub struct DuplicatorBuilder {
    options: DuplicateOptions,
    fs: Option<Arc<dyn FileSystem>>,
    codec: Option<Arc<dyn ImageCodec>>,
}

impl DuplicatorBuilder {
    pub fn new() -> Self {
        Self {
            options: DuplicateOptions::default(),
            fs: None,
            codec: None,
        }
    }

    /// Replace all options at once
    pub fn options(mut self, options: DuplicateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn collision(mut self, action: CollisionAction) -> Self {
        self.options.collision = action;
        self
    }

    pub fn directory_structure_only(mut self, enabled: bool) -> Self {
        self.options.directory_structure_only = enabled;
        self
    }

    pub fn skip_zero_byte_files(mut self, enabled: bool) -> Self {
        self.options.skip_zero_byte_files = enabled;
        self
    }

    pub fn skip_system_files(mut self, enabled: bool) -> Self {
        self.options.skip_system_files = enabled;
        self
    }

    pub fn recursive(mut self, enabled: bool) -> Self {
        self.options.recursive = enabled;
        self
    }

    pub fn compare_images(mut self, enabled: bool) -> Self {
        self.options.compare_images = enabled;
        self
    }

    pub fn convert_images_to_tiff(mut self, enabled: bool) -> Self {
        self.options.convert_images_to_tiff = enabled;
        self
    }

    /// Run against another filesystem implementation
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> Duplicator {
        let fs = self
            .fs
            .unwrap_or_else(|| Arc::new(LocalFileSystem::new()));
        let codec = self.codec.unwrap_or_else(|| Arc::new(StandardCodec));
        let comparator = ContentComparator::new(Arc::clone(&codec))
            .with_image_comparison(self.options.compare_images)
            .with_format_check(self.options.compare_image_format);

        Duplicator {
            resolver: CollisionResolver::new(self.options.collision),
            options: self.options,
            engine: TraversalEngine::with_filesystem(fs),
            codec,
            comparator,
        }
    }
}

impl Default for DuplicatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Duplicates directory trees
pub struct Duplicator {
    options: DuplicateOptions,
    engine: TraversalEngine,
    codec: Arc<dyn ImageCodec>,
    comparator: ContentComparator,
    resolver: CollisionResolver,
}

impl Duplicator {
    pub fn builder() -> DuplicatorBuilder {
        DuplicatorBuilder::new()
    }

    pub fn options(&self) -> &DuplicateOptions {
        &self.options
    }

    /// The engine driving the source traversal. Clone it to `stop()` a run
    /// from another thread.
    pub fn engine(&self) -> &TraversalEngine {
        &self.engine
    }

    /// Ask the active run to stop after the current entry
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Duplicate without event reporting
    pub fn duplicate(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> Result<DuplicateReport, DuplicateFinderError> {
        self.duplicate_with_events(source, destination, &null_sender())
    }

    /// Duplicate `source` into `destination`, reporting each decision.
    ///
    /// Errors only when the run cannot start: a missing source, a
    /// destination root that cannot be created or is the source itself, or
    /// another run already active on this duplicator.
    pub fn duplicate_with_events(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
        events: &EventSender,
    ) -> Result<DuplicateReport, DuplicateFinderError> {
        let start_time = Instant::now();
        let request = self.options.traversal_request(source.as_ref())?;
        let fs = Arc::clone(self.engine.filesystem());

        let destination = destination.as_ref();
        let destination_root = fs
            .create_dir_all(destination)
            .and_then(|_| fs.canonicalize(destination))
            .map_err(|source| DuplicateError::CreateDirectory {
                path: destination.to_path_buf(),
                source,
            })?;
        if destination_root.as_path() == request.root() {
            return Err(DuplicateFinderError::Config(format!(
                "destination {} is the source directory",
                destination_root.display()
            )));
        }

        info!(
            source = %request.root().display(),
            destination = %destination_root.display(),
            policy = ?self.options.collision,
            "duplication started"
        );
        events.duplicate(DuplicateEvent::Started {
            source: request.root().to_path_buf(),
            destination: destination_root.clone(),
        });

        let mut run = DuplicateRun::new(
            self,
            fs.as_ref(),
            request.root(),
            &destination_root,
            events,
        );
        let outcome = self.engine.run(&request, &mut run)?;
        let report = run.finish(outcome, start_time.elapsed());

        info!(
            end = ?report.outcome.end,
            written = report.files_written(),
            skipped = report.files_skipped,
            errors = report.errors.len(),
            "duplication ended"
        );
        events.duplicate(DuplicateEvent::Completed {
            summary: report.summary(),
        });

        Ok(report)
    }
}

/// Bytes to write for one file
enum Payload {
    /// Stream the source file as-is
    Stream,
    /// Pre-encoded TIFF
    Encoded(Vec<u8>),
}

/// Observer state for one duplication run
struct DuplicateRun<'a> {
    duplicator: &'a Duplicator,
    options: &'a DuplicateOptions,
    fs: &'a dyn FileSystem,
    source_root: &'a Path,
    destination_root: &'a Path,
    events: &'a EventSender,
    files_found: usize,
    files_copied: usize,
    files_overwritten: usize,
    files_renamed: usize,
    files_skipped: usize,
    directories_skipped: usize,
    directories_created: usize,
    errors: Vec<String>,
    /// Directories whose attributes are applied once the walk is over, so
    /// writing their children does not disturb them
    pending_directories: Vec<(PathBuf, PathBuf)>,
}

impl<'a> DuplicateRun<'a> {
    fn new(
        duplicator: &'a Duplicator,
        fs: &'a dyn FileSystem,
        source_root: &'a Path,
        destination_root: &'a Path,
        events: &'a EventSender,
    ) -> Self {
        Self {
            duplicator,
            options: &duplicator.options,
            fs,
            source_root,
            destination_root,
            events,
            files_found: 0,
            files_copied: 0,
            files_overwritten: 0,
            files_renamed: 0,
            files_skipped: 0,
            directories_skipped: 0,
            directories_created: 0,
            errors: Vec::new(),
            pending_directories: Vec::new(),
        }
    }

    fn finish(mut self, outcome: TraversalOutcome, elapsed: Duration) -> DuplicateReport {
        let pending = std::mem::take(&mut self.pending_directories);
        for (source, target) in pending.iter().rev() {
            if let Err(e) = self.apply_attributes(source, target) {
                self.fail(source, e);
            }
        }

        DuplicateReport {
            outcome,
            files_copied: self.files_copied,
            files_overwritten: self.files_overwritten,
            files_renamed: self.files_renamed,
            files_skipped: self.files_skipped,
            directories_skipped: self.directories_skipped,
            directories_created: self.directories_created,
            errors: self.errors,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    fn fail(&mut self, path: &Path, error: DuplicateError) {
        warn!(path = %path.display(), error = %error, "entry failed");
        self.events.duplicate(DuplicateEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
        self.errors.push(error.to_string());
    }

    fn skip_file(&mut self, path: &Path, reason: SkipReason) {
        debug!(path = %path.display(), %reason, "skipped");
        self.files_skipped += 1;
        self.events.duplicate(DuplicateEvent::Skipped {
            path: path.to_path_buf(),
            reason,
        });
    }

    fn mirror(&self, path: &Path) -> Result<PathBuf, DuplicateError> {
        path.strip_prefix(self.source_root)
            .map(|relative| self.destination_root.join(relative))
            .map_err(|_| DuplicateError::Copy {
                source_path: path.to_path_buf(),
                destination: self.destination_root.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "entry outside the source root"),
            })
    }

    fn mirror_directory(&mut self, entry: &FsEntry) -> Result<(), DuplicateError> {
        let target = self.mirror(&entry.path)?;

        if !self.fs.is_dir(&target) {
            match self.fs.create_dir(&target) {
                Ok(()) => {
                    self.directories_created += 1;
                    self.events.duplicate(DuplicateEvent::DirectoryCreated {
                        path: target.clone(),
                    });
                }
                // Created by someone else since the check
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && self.fs.is_dir(&target) => {}
                Err(source) => {
                    return Err(DuplicateError::CreateDirectory {
                        path: target,
                        source,
                    })
                }
            }
        }

        self.pending_directories.push((entry.path.clone(), target));
        Ok(())
    }

    fn apply_attributes(&self, source: &Path, target: &Path) -> Result<(), DuplicateError> {
        let attributes = |e| DuplicateError::Attributes {
            path: target.to_path_buf(),
            source: e,
        };
        if self.options.preserve_timestamps {
            self.fs.copy_times(source, target).map_err(attributes)?;
        }
        if self.options.preserve_permissions {
            self.fs.copy_permissions(source, target).map_err(attributes)?;
        }
        Ok(())
    }

    fn process_file(&mut self, entry: &FsEntry) -> Result<(), DuplicateError> {
        if self.options.directory_structure_only {
            self.skip_file(&entry.path, SkipReason::StructureOnly);
            return Ok(());
        }
        if self.options.skip_zero_byte_files && entry.size() == 0 {
            self.skip_file(&entry.path, SkipReason::ZeroByte);
            return Ok(());
        }
        if self.options.skip_system_files && entry.metadata.is_hidden_or_system() {
            self.skip_file(&entry.path, SkipReason::HiddenOrSystem);
            return Ok(());
        }

        let convert = self.options.convert_images_to_tiff && is_image_path(&entry.path);
        let mirrored = self.mirror(&entry.path)?;
        let target = if convert {
            mirrored.with_extension("tiff")
        } else {
            mirrored
        };

        if !self.fs.exists(&target) {
            let payload = self.payload(&entry.path, convert)?;
            match self.fs.create_new_file(&target) {
                Ok(writer) => {
                    let bytes = self.fill(writer, &entry.path, &target, &payload)?;
                    self.files_copied += 1;
                    self.events.duplicate(DuplicateEvent::FileCopied {
                        source: entry.path.clone(),
                        destination: target.clone(),
                        bytes,
                    });
                    return self.apply_attributes(&entry.path, &target);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(path = %target.display(), "destination appeared, resolving collision");
                }
                Err(source) => {
                    return Err(DuplicateError::Copy {
                        source_path: entry.path.clone(),
                        destination: target,
                        source,
                    })
                }
            }
        }

        self.resolve_collision(entry, &target, convert)
    }

    fn resolve_collision(
        &mut self,
        entry: &FsEntry,
        target: &Path,
        convert: bool,
    ) -> Result<(), DuplicateError> {
        if self.same_file(&entry.path, target) {
            return Err(DuplicateError::SameFile {
                path: target.to_path_buf(),
            });
        }

        let duplicator = self.duplicator;
        let resolver = &duplicator.resolver;
        let identical = if resolver.needs_comparison() {
            duplicator
                .comparator
                .compare(self.fs, &entry.path, target)?
                .identical
        } else {
            false
        };

        let decision = resolver
            .resolve(self.fs, target, identical)
            .map_err(|source| DuplicateError::Resolve {
                path: target.to_path_buf(),
                source,
            })?;

        match decision {
            CollisionDecision::Skip => {
                let reason = if identical {
                    SkipReason::Identical
                } else {
                    SkipReason::KeptExisting
                };
                self.skip_file(&entry.path, reason);
                Ok(())
            }
            CollisionDecision::Overwrite => {
                let payload = self.payload(&entry.path, convert)?;
                let writer = self
                    .fs
                    .create_or_truncate_file(target)
                    .map_err(|source| DuplicateError::Copy {
                        source_path: entry.path.clone(),
                        destination: target.to_path_buf(),
                        source,
                    })?;
                self.fill(writer, &entry.path, target, &payload)?;
                self.files_overwritten += 1;
                self.events.duplicate(DuplicateEvent::FileOverwritten {
                    source: entry.path.clone(),
                    destination: target.to_path_buf(),
                });
                self.apply_attributes(&entry.path, target)
            }
            CollisionDecision::RenameWithSuffix { suffix, path } => {
                let payload = self.payload(&entry.path, convert)?;
                let renamed = self.write_renamed(entry, target, suffix, path, &payload)?;
                self.files_renamed += 1;
                self.events.duplicate(DuplicateEvent::FileRenamed {
                    source: entry.path.clone(),
                    destination: renamed.clone(),
                });
                self.apply_attributes(&entry.path, &renamed)
            }
        }
    }

    /// Whether both paths resolve to one file, e.g. through a link at the
    /// destination. Writing one would truncate the other.
    fn same_file(&self, source: &Path, target: &Path) -> bool {
        match (self.fs.canonicalize(source), self.fs.canonicalize(target)) {
            (Ok(source), Ok(target)) => source == target,
            _ => false,
        }
    }

    /// Create the renamed copy, moving on to the next free suffix if the
    /// chosen name gets taken first.
    fn write_renamed(
        &self,
        entry: &FsEntry,
        target: &Path,
        mut suffix: String,
        mut path: PathBuf,
        payload: &Payload,
    ) -> Result<PathBuf, DuplicateError> {
        for _ in 0..MAX_RENAME_RACES {
            match self.fs.create_new_file(&path) {
                Ok(writer) => {
                    self.fill(writer, &entry.path, &path, payload)?;
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let next = suffix_counter(&suffix).unwrap_or(0) + 1;
                    (suffix, path) = unique_sibling(self.fs, target, next).map_err(|source| {
                        DuplicateError::Resolve {
                            path: target.to_path_buf(),
                            source,
                        }
                    })?;
                }
                Err(source) => {
                    return Err(DuplicateError::Copy {
                        source_path: entry.path.clone(),
                        destination: path,
                        source,
                    })
                }
            }
        }

        Err(DuplicateError::Resolve {
            path: target.to_path_buf(),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "renamed destination kept being taken",
            ),
        })
    }

    fn payload(&self, source: &Path, convert: bool) -> Result<Payload, DuplicateError> {
        if !convert {
            return Ok(Payload::Stream);
        }

        let convert_error = |reason: String| DuplicateError::Convert {
            path: source.to_path_buf(),
            reason,
        };
        let bytes = self
            .fs
            .read(source)
            .map_err(|e| convert_error(e.to_string()))?;
        let codec = &self.duplicator.codec;
        let image = codec.decode(&bytes).map_err(|e| convert_error(e.to_string()))?;
        let tiff = codec
            .encode_tiff(&image)
            .map_err(|e| convert_error(e.to_string()))?;
        Ok(Payload::Encoded(tiff))
    }

    /// Write the payload into a freshly opened target. A failed write leaves
    /// no partial file behind.
    fn fill(
        &self,
        mut writer: Box<dyn Write + Send>,
        source: &Path,
        target: &Path,
        payload: &Payload,
    ) -> Result<u64, DuplicateError> {
        let written = match payload {
            Payload::Stream => self
                .fs
                .open_read(source)
                .and_then(|mut reader| io::copy(&mut reader, &mut writer)),
            Payload::Encoded(bytes) => writer.write_all(bytes).map(|_| bytes.len() as u64),
        }
        .and_then(|n| writer.flush().map(|_| n));
        drop(writer);

        written.map_err(|e| {
            let _ = self.fs.remove_file(target);
            DuplicateError::Copy {
                source_path: source.to_path_buf(),
                destination: target.to_path_buf(),
                source: e,
            }
        })
    }

    fn report_progress(&self, current: &Path) {
        self.events
            .duplicate(DuplicateEvent::Progress(DuplicateProgress {
                files_found: self.files_found,
                files_written: self.files_copied + self.files_overwritten + self.files_renamed,
                files_skipped: self.files_skipped,
                current_path: current.to_path_buf(),
            }));
    }
}

impl TraversalObserver for DuplicateRun<'_> {
    fn on_directory(&mut self, entry: &FsEntry) -> Flow {
        if entry.path == self.destination_root {
            debug!(path = %entry.path.display(), "not descending into the destination");
            return Flow::SkipSubtree;
        }
        if self.options.skip_system_files && entry.metadata.is_hidden_or_system() {
            debug!(path = %entry.path.display(), "skipping hidden or system directory");
            self.directories_skipped += 1;
            self.events.duplicate(DuplicateEvent::Skipped {
                path: entry.path.clone(),
                reason: SkipReason::HiddenOrSystem,
            });
            return Flow::SkipSubtree;
        }

        match self.mirror_directory(entry) {
            Ok(()) => Flow::Continue,
            Err(e) => {
                self.fail(&entry.path, e);
                Flow::SkipSubtree
            }
        }
    }

    fn on_file(&mut self, entry: &FsEntry) -> Flow {
        self.files_found += 1;
        if let Err(e) = self.process_file(entry) {
            self.fail(&entry.path, e);
        }
        self.report_progress(&entry.path);
        Flow::Continue
    }

    fn on_error(&mut self, path: &Path, error: &TraversalError) {
        self.events.duplicate(DuplicateEvent::Error {
            path: path.to_path_buf(),
            message: error.to_string(),
        });
        self.errors.push(error.to_string());
    }
}
