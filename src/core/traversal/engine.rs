//! The traversal engine: synchronous and background runs over a
//! `FileSystem`.

use super::{
    CancellationToken, Depth, EndReason, Flow, LinkPolicy, TraversalObserver, TraversalOutcome,
    TraversalRequest,
};
use crate::core::fs::{FileSystem, FsEntry, Listing, LocalFileSystem};
use crate::error::TraversalError;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

/// Runs traversals, one at a time.
///
/// Cloning gives another handle to the same engine, so a clone can `stop()`
/// a run started elsewhere.
#[derive(Clone)]
pub struct TraversalEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    fs: Arc<dyn FileSystem>,
    /// Stop flag of the active run, `None` while idle
    active: Mutex<Option<CancellationToken>>,
}

/// Clears the active run when it ends, including by panic
struct RunGuard {
    inner: Arc<EngineInner>,
    token: CancellationToken,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *active = None;
    }
}

impl TraversalEngine {
    /// Engine over the local filesystem
    pub fn new() -> Self {
        Self::with_filesystem(Arc::new(LocalFileSystem::new()))
    }

    pub fn with_filesystem(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                fs,
                active: Mutex::new(None),
            }),
        }
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.inner.fs
    }

    /// Ask the active run to stop at its next checkpoint. Safe from any
    /// thread; does not wait. Does nothing while idle.
    pub fn stop(&self) {
        debug!("traversal stop requested");
        let active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = active.as_ref() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Claim the engine for one run with a fresh stop flag
    fn begin(&self) -> Result<RunGuard, TraversalError> {
        let mut active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(TraversalError::AlreadyRunning);
        }
        let token = CancellationToken::new();
        *active = Some(token.clone());

        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
            token,
        })
    }

    /// Run a traversal on the calling thread.
    ///
    /// Returns `Err(AlreadyRunning)` without doing anything if another run
    /// is active on this engine.
    pub fn run(
        &self,
        request: &TraversalRequest,
        observer: &mut dyn TraversalObserver,
    ) -> Result<TraversalOutcome, TraversalError> {
        let guard = self.begin()?;
        Ok(self.execute(request, observer, &guard.token))
    }

    /// Run a traversal on a dedicated worker thread.
    ///
    /// The observer moves to the worker and is handed back by
    /// `TraversalHandle::join`.
    pub fn start_async<O>(
        &self,
        request: TraversalRequest,
        mut observer: O,
    ) -> Result<TraversalHandle<O>, TraversalError>
    where
        O: TraversalObserver + Send + 'static,
    {
        let guard = self.begin()?;
        let cancel = guard.token.clone();
        let engine = self.clone();

        let join = thread::Builder::new()
            .name("tree-traversal".to_string())
            .spawn(move || {
                let outcome = engine.execute(&request, &mut observer, &guard.token);
                drop(guard);
                (outcome, observer)
            })
            .map_err(TraversalError::Spawn)?;

        Ok(TraversalHandle {
            join,
            cancel,
        })
    }

    fn execute(
        &self,
        request: &TraversalRequest,
        observer: &mut dyn TraversalObserver,
        cancel: &CancellationToken,
    ) -> TraversalOutcome {
        let root = request.root();
        info!(root = %root.display(), "traversal started");

        let mut run = RunContext::new(request, self.inner.fs.as_ref(), cancel);

        let outcome = match self.inner.fs.list_children(root) {
            Ok(listing) => {
                if run.track_ancestors {
                    run.ancestors.push(root.to_path_buf());
                }
                run.walk(listing, observer);
                run.outcome()
            }
            Err(source) => {
                let error = TraversalError::from_io(root.to_path_buf(), source);
                warn!(root = %root.display(), error = %error, "cannot list traversal root");
                observer.on_error(root, &error);
                TraversalOutcome {
                    end: EndReason::FatalError,
                    directories_found: 0,
                    directories_visited: 0,
                    files_found: 0,
                    errors: 1,
                }
            }
        };

        info!(
            root = %root.display(),
            end = ?outcome.end,
            directories = outcome.directories_visited,
            files = outcome.files_found,
            errors = outcome.errors,
            "traversal ended"
        );
        observer.on_finished(&outcome);
        outcome
    }
}

impl Default for TraversalEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a background traversal
pub struct TraversalHandle<O> {
    join: JoinHandle<(TraversalOutcome, O)>,
    cancel: CancellationToken,
}

impl<O> TraversalHandle<O> {
    /// Request cancellation; `join` to wait for the worker to wind down.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the run to end and take back the observer.
    pub fn join(self) -> Result<(TraversalOutcome, O), TraversalError> {
        self.join.join().map_err(|_| TraversalError::WorkerPanicked)
    }
}

/// State owned by a single run and threaded through the recursion
struct RunContext<'a> {
    request: &'a TraversalRequest,
    fs: &'a dyn FileSystem,
    cancel: &'a CancellationToken,
    directories_found: usize,
    directories_visited: usize,
    files_found: usize,
    errors: usize,
    cancelled: bool,
    /// Loops are only possible through followed links
    track_ancestors: bool,
    /// Canonical paths of the directories on the current descent path
    ancestors: Vec<PathBuf>,
}

impl<'a> RunContext<'a> {
    fn new(
        request: &'a TraversalRequest,
        fs: &'a dyn FileSystem,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            request,
            fs,
            cancel,
            directories_found: 0,
            directories_visited: 0,
            files_found: 0,
            errors: 0,
            cancelled: false,
            track_ancestors: request.directory_link_policy() != LinkPolicy::Ignore,
            ancestors: Vec::new(),
        }
    }

    fn outcome(&self) -> TraversalOutcome {
        TraversalOutcome {
            end: if self.cancelled {
                EndReason::Cancelled
            } else {
                EndReason::Finished
            },
            directories_found: self.directories_found,
            directories_visited: self.directories_visited,
            files_found: self.files_found,
            errors: self.errors,
        }
    }

    /// Checkpoint. Latches once cancellation is seen.
    fn should_stop(&mut self) -> bool {
        if !self.cancelled && self.cancel.is_cancelled() {
            self.cancelled = true;
        }
        self.cancelled
    }

    fn report(&mut self, observer: &mut dyn TraversalObserver, path: &Path, error: TraversalError) {
        self.errors += 1;
        warn!(path = %path.display(), error = %error, "skipping entry");
        observer.on_error(path, &error);
    }

    /// Process one listed directory. Returns `false` once cancelled.
    fn walk(&mut self, listing: Listing, observer: &mut dyn TraversalObserver) -> bool {
        for failure in listing.failures {
            if self.should_stop() {
                return false;
            }
            let error = TraversalError::from_io(failure.path.clone(), failure.source);
            self.report(observer, &failure.path, error);
        }

        let (directories, files): (Vec<_>, Vec<_>) =
            listing.entries.into_iter().partition(FsEntry::is_dir);

        for entry in &directories {
            if self.should_stop() {
                return false;
            }
            if entry.is_link && self.request.directory_link_policy() == LinkPolicy::Ignore {
                trace!(path = %entry.path.display(), "ignoring directory link");
                continue;
            }

            let flow = if self.request.mask().includes_directories() {
                self.directories_found += 1;
                observer.on_directory(entry)
            } else {
                Flow::Continue
            };

            if flow == Flow::Cancel {
                self.cancelled = true;
                return false;
            }
            if self.should_stop() {
                return false;
            }
            if flow == Flow::SkipSubtree || self.request.recursion() == Depth::TopLevel {
                continue;
            }
            if !self.descend(entry, observer) {
                return false;
            }
        }

        if self.request.mask().includes_files() {
            for entry in &files {
                if self.should_stop() {
                    return false;
                }
                if entry.is_link && self.request.file_link_policy() == LinkPolicy::Ignore {
                    trace!(path = %entry.path.display(), "ignoring file link");
                    continue;
                }

                self.files_found += 1;
                if observer.on_file(entry) == Flow::Cancel {
                    self.cancelled = true;
                    return false;
                }
                if self.should_stop() {
                    return false;
                }
            }
        }

        self.directories_visited += 1;
        true
    }

    /// Walk into a subdirectory. A failure to list it is reported and
    /// swallowed; only cancellation returns `false`.
    fn descend(&mut self, entry: &FsEntry, observer: &mut dyn TraversalObserver) -> bool {
        if self.should_stop() {
            return false;
        }

        let mut pushed = false;
        if self.track_ancestors {
            match self.fs.canonicalize(&entry.path) {
                Ok(real) if self.ancestors.contains(&real) => {
                    let error = TraversalError::SymlinkLoop {
                        path: entry.path.clone(),
                    };
                    self.report(observer, &entry.path, error);
                    return true;
                }
                Ok(real) => {
                    self.ancestors.push(real);
                    pushed = true;
                }
                Err(source) => {
                    let error = TraversalError::from_io(entry.path.clone(), source);
                    self.report(observer, &entry.path, error);
                    return true;
                }
            }
        }

        let completed = match self.fs.list_children(&entry.path) {
            Ok(listing) => self.walk(listing, observer),
            Err(source) => {
                let error = TraversalError::from_io(entry.path.clone(), source);
                self.report(observer, &entry.path, error);
                true
            }
        };

        if pushed {
            self.ancestors.pop();
        }
        completed
    }
}
