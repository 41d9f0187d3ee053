//! # CLI Module
//!
//! Command-line interface for the tree duplicator.
//!
//! ## Usage
//! ```bash
//! # Mirror a tree, keeping both copies of files that differ
//! tree-dup copy ~/Photos /mnt/backup/Photos
//!
//! # Replace whatever is already at the destination
//! tree-dup copy ~/Photos /mnt/backup/Photos --on-conflict overwrite
//!
//! # Start from saved options, override one of them
//! tree-dup copy ~/Photos /mnt/backup/Photos --options dup.json --skip-system
//!
//! # List what a copy would walk
//! tree-dup scan ~/Photos --only directories
//!
//! # Check whether two files hold the same content
//! tree-dup compare a.jpg b.jpg --images
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;
use tree_duplicator::core::collision::CollisionAction;
use tree_duplicator::core::comparator::ContentComparator;
use tree_duplicator::core::duplicator::{DuplicateOptions, DuplicateReport, Duplicator};
use tree_duplicator::core::fs::LocalFileSystem;
use tree_duplicator::core::traversal::{
    ChannelObserver, EventMask, LinkPolicy, TraversalEngine, TraversalOutcome, TraversalRequest,
};
use tree_duplicator::error::{DuplicateFinderError, Result};
use tree_duplicator::events::{DuplicateEvent, Event, EventChannel, TraversalEvent};

/// Tree Duplicator - Copy directory trees without copying twice
#[derive(Parser, Debug)]
#[command(name = "tree-dup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Duplicate a directory tree into a destination
    Copy {
        /// Directory to copy from
        source: PathBuf,

        /// Directory to copy into (created if missing)
        destination: PathBuf,

        /// What to do when a destination file already exists
        #[arg(long)]
        on_conflict: Option<Conflict>,

        /// Create the directories only
        #[arg(long)]
        structure_only: bool,

        /// Leave out zero-byte files
        #[arg(long)]
        skip_empty: bool,

        /// Leave out hidden and system files and directories
        #[arg(long)]
        skip_system: bool,

        /// Copy the top level of the source only
        #[arg(long)]
        top_level_only: bool,

        /// How to treat symbolic links to directories
        #[arg(long)]
        dir_links: Option<Links>,

        /// How to treat symbolic links to files
        #[arg(long)]
        file_links: Option<Links>,

        /// Compare images byte-for-byte instead of by pixels
        #[arg(long)]
        no_image_compare: bool,

        /// Treat images stored in different formats as different
        #[arg(long)]
        compare_format: bool,

        /// Write image files as TIFF
        #[arg(long)]
        to_tiff: bool,

        /// Do not copy permissions and attributes
        #[arg(long)]
        no_permissions: bool,

        /// Do not copy modification and access times
        #[arg(long)]
        no_timestamps: bool,

        /// JSON file with options; flags given here take precedence
        #[arg(long)]
        options: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List the entries a traversal reports
    Scan {
        /// Directory to walk
        root: PathBuf,

        /// Walk the top level only
        #[arg(long)]
        top_level_only: bool,

        /// How to treat symbolic links to directories
        #[arg(long, default_value = "ignore")]
        dir_links: Links,

        /// How to treat symbolic links to files
        #[arg(long, default_value = "ignore")]
        file_links: Links,

        /// Which entries to report
        #[arg(long, default_value = "both")]
        only: Only,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Tell whether two files hold the same content
    Compare {
        a: PathBuf,
        b: PathBuf,

        /// Compare images by pixels, allowing for rotation
        #[arg(long)]
        images: bool,

        /// Treat images stored in different formats as different
        #[arg(long)]
        compare_format: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Conflict {
    /// Replace the existing file
    Overwrite,
    /// Leave the existing file, do not copy
    Keep,
    /// Copy under a new name whenever the path is taken
    Rename,
    /// Skip identical files, copy different ones under a new name (default)
    RenameDifferent,
}

impl From<Conflict> for CollisionAction {
    fn from(conflict: Conflict) -> Self {
        match conflict {
            Conflict::Overwrite => CollisionAction::OverwriteExistingFiles,
            Conflict::Keep => CollisionAction::KeepExistingFiles,
            Conflict::Rename => CollisionAction::RenameAnyExistingFiles,
            Conflict::RenameDifferent => CollisionAction::RenameDifferentExistingFiles,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Links {
    /// Leave links out
    Ignore,
    /// Report links and descend into linked directories
    Follow,
    /// Report links as they are
    Return,
}

impl From<Links> for LinkPolicy {
    fn from(links: Links) -> Self {
        match links {
            Links::Ignore => LinkPolicy::Ignore,
            Links::Follow => LinkPolicy::Follow,
            Links::Return => LinkPolicy::Return,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Only {
    Files,
    Directories,
    Both,
}

impl From<Only> for EventMask {
    fn from(only: Only) -> Self {
        match only {
            Only::Files => EventMask::Files,
            Only::Directories => EventMask::Directories,
            Only::Both => EventMask::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Flags of the `copy` command, applied on top of the base options
struct CopyFlags {
    on_conflict: Option<Conflict>,
    structure_only: bool,
    skip_empty: bool,
    skip_system: bool,
    top_level_only: bool,
    dir_links: Option<Links>,
    file_links: Option<Links>,
    no_image_compare: bool,
    compare_format: bool,
    to_tiff: bool,
    no_permissions: bool,
    no_timestamps: bool,
}

impl CopyFlags {
    fn apply(&self, options: &mut DuplicateOptions) {
        if let Some(conflict) = self.on_conflict {
            options.collision = conflict.into();
        }
        if let Some(links) = self.dir_links {
            options.directory_links = links.into();
        }
        if let Some(links) = self.file_links {
            options.file_links = links.into();
        }
        options.directory_structure_only |= self.structure_only;
        options.skip_zero_byte_files |= self.skip_empty;
        options.skip_system_files |= self.skip_system;
        options.compare_image_format |= self.compare_format;
        options.convert_images_to_tiff |= self.to_tiff;
        if self.top_level_only {
            options.recursive = false;
        }
        if self.no_image_compare {
            options.compare_images = false;
        }
        if self.no_permissions {
            options.preserve_permissions = false;
        }
        if self.no_timestamps {
            options.preserve_timestamps = false;
        }
    }
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Copy {
            source,
            destination,
            on_conflict,
            structure_only,
            skip_empty,
            skip_system,
            top_level_only,
            dir_links,
            file_links,
            no_image_compare,
            compare_format,
            to_tiff,
            no_permissions,
            no_timestamps,
            options,
            output,
            verbose,
        } => {
            tree_duplicator::init_tracing(if verbose { "debug" } else { "warn" });

            let mut base = match options {
                Some(path) => load_options(&path)?,
                None => DuplicateOptions::default(),
            };
            let flags = CopyFlags {
                on_conflict,
                structure_only,
                skip_empty,
                skip_system,
                top_level_only,
                dir_links,
                file_links,
                no_image_compare,
                compare_format,
                to_tiff,
                no_permissions,
                no_timestamps,
            };
            flags.apply(&mut base);

            run_copy(&source, &destination, base, output, verbose)
        }
        Commands::Scan {
            root,
            top_level_only,
            dir_links,
            file_links,
            only,
            output,
        } => {
            tree_duplicator::init_tracing("warn");

            let mut request = TraversalRequest::new(&root)?
                .directory_links(dir_links.into())
                .file_links(file_links.into())
                .events(only.into());
            if top_level_only {
                request = request.top_level_only();
            }

            run_scan(request, output)
        }
        Commands::Compare {
            a,
            b,
            images,
            compare_format,
        } => {
            tree_duplicator::init_tracing("warn");
            run_compare(&a, &b, images, compare_format)
        }
    }
}

fn load_options(path: &Path) -> Result<DuplicateOptions> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        DuplicateFinderError::Config(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        DuplicateFinderError::Config(format!("invalid options in {}: {}", path.display(), e))
    })
}

fn run_copy(
    source: &Path,
    destination: &Path,
    options: DuplicateOptions,
    output: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let term = Term::stderr();

    if matches!(output, OutputFormat::Pretty) {
        term.write_line(&format!(
            "{} {}",
            style("Tree Duplicator").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let duplicator = Duplicator::builder().options(options).build();
    let (sender, receiver) = EventChannel::new();

    // Spinner for pretty output; the total is unknown until the walk ends
    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} files {msg}")
        {
            pb.set_style(template);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Duplicate(DuplicateEvent::Progress(p)) => {
                    pb.set_position(p.files_found as u64);
                    pb.set_message(format!(
                        "({} written, {} skipped) {}",
                        p.files_written,
                        p.files_skipped,
                        p.current_path
                            .file_name()
                            .unwrap_or_default()
                            .to_string_lossy()
                    ));
                }
                Event::Duplicate(DuplicateEvent::FileRenamed { source, destination }) if verbose => {
                    pb.println(format!(
                        "  {} {} -> {}",
                        style("renamed").yellow(),
                        source.display(),
                        destination.display()
                    ));
                }
                Event::Duplicate(DuplicateEvent::Skipped { path, reason }) if verbose => {
                    pb.println(format!(
                        "  {} {} ({})",
                        style("skipped").dim(),
                        path.display(),
                        reason
                    ));
                }
                Event::Duplicate(DuplicateEvent::Error { path, message }) => {
                    pb.println(format!(
                        "  {} {}: {}",
                        style("error").red(),
                        path.display(),
                        message
                    ));
                }
                Event::Duplicate(DuplicateEvent::Completed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = duplicator.duplicate_with_events(source, destination, &sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;
    match output {
        OutputFormat::Pretty => print_pretty_report(&term, &report, verbose),
        OutputFormat::Json => print_json(&report)?,
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_pretty_report(term: &Term, report: &DuplicateReport, verbose: bool) {
    let headline = if report.succeeded() {
        format!("{} Copy Complete", style("✓").green().bold())
    } else if report.outcome.is_cancelled() {
        format!("{} Copy Cancelled", style("!").yellow().bold())
    } else {
        format!("{} Copy Failed", style("✗").red().bold())
    };
    term.write_line(&headline).ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} files found in {:.1}s",
        style(report.outcome.files_found).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} copied, {} overwritten, {} renamed",
        style(report.files_copied).green(),
        style(report.files_overwritten).yellow(),
        style(report.files_renamed).yellow()
    ))
    .ok();
    term.write_line(&format!(
        "  {} skipped",
        style(report.files_skipped).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} directories created",
        style(report.directories_created).cyan()
    ))
    .ok();

    if report.directories_skipped > 0 {
        term.write_line(&format!(
            "  {} directories left out",
            style(report.directories_skipped).dim()
        ))
        .ok();
    }

    if !report.errors.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{} {}",
            style(report.errors.len()).red().bold(),
            style("entries failed").red()
        ))
        .ok();
        let shown = if verbose { report.errors.len() } else { 5 };
        for error in report.errors.iter().take(shown) {
            term.write_line(&format!("    {}", error)).ok();
        }
        if report.errors.len() > shown {
            term.write_line(&format!(
                "    {}",
                style(format!("... {} more (use --verbose)", report.errors.len() - shown)).dim()
            ))
            .ok();
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    println!("{}", text);
    Ok(())
}

fn run_scan(request: TraversalRequest, output: OutputFormat) -> Result<ExitCode> {
    let engine = TraversalEngine::with_filesystem(std::sync::Arc::new(LocalFileSystem::new()));
    let (sender, receiver) = EventChannel::new();
    let handle = engine.start_async(request, ChannelObserver::new(sender))?;

    let mut entries = Vec::new();
    let mut outcome: Option<TraversalOutcome> = None;
    while let Some(event) = receiver.recv() {
        match event {
            Event::Traversal(TraversalEvent::DirectoryFound { path }) => {
                if matches!(output, OutputFormat::Pretty) {
                    println!("{}{}", path.display(), std::path::MAIN_SEPARATOR);
                }
                entries.push(serde_json::json!({ "kind": "directory", "path": path }));
            }
            Event::Traversal(TraversalEvent::FileFound { path, size }) => {
                if matches!(output, OutputFormat::Pretty) {
                    println!("{}", path.display());
                }
                entries.push(serde_json::json!({ "kind": "file", "path": path, "size": size }));
            }
            Event::Traversal(TraversalEvent::Error { path, message }) => {
                eprintln!("{} {}: {}", style("error").red(), path.display(), message);
            }
            Event::Traversal(TraversalEvent::Finished(finished)) => {
                outcome = Some(finished);
                break;
            }
            _ => {}
        }
    }

    let (joined, _observer) = handle.join()?;
    let outcome = outcome.unwrap_or(joined);

    match output {
        OutputFormat::Pretty => {
            eprintln!(
                "{} {} directories, {} files, {} errors",
                style(format!("{:?}", outcome.end)).bold(),
                outcome.directories_found,
                outcome.files_found,
                outcome.errors
            );
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "outcome": outcome,
            "entries": entries,
        }))?,
    }

    Ok(if outcome.is_finished() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_compare(a: &Path, b: &Path, images: bool, compare_format: bool) -> Result<ExitCode> {
    let fs = LocalFileSystem::new();
    let comparator = ContentComparator::default()
        .with_image_comparison(images)
        .with_format_check(compare_format);

    let result = comparator.compare(&fs, a, b)?;
    let verdict = if result.identical {
        style("identical").green().bold()
    } else {
        style("different").yellow().bold()
    };
    println!("{} ({:?})", verdict, result.method);

    Ok(if result.identical {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_loaded_options() {
        let mut options = DuplicateOptions {
            collision: CollisionAction::KeepExistingFiles,
            skip_system_files: true,
            ..Default::default()
        };
        let flags = CopyFlags {
            on_conflict: Some(Conflict::Overwrite),
            structure_only: false,
            skip_empty: true,
            skip_system: false,
            top_level_only: true,
            dir_links: Some(Links::Follow),
            file_links: None,
            no_image_compare: true,
            compare_format: false,
            to_tiff: false,
            no_permissions: false,
            no_timestamps: true,
        };

        flags.apply(&mut options);

        assert_eq!(options.collision, CollisionAction::OverwriteExistingFiles);
        assert!(options.skip_system_files);
        assert!(options.skip_zero_byte_files);
        assert!(!options.recursive);
        assert_eq!(options.directory_links, LinkPolicy::Follow);
        assert_eq!(options.file_links, LinkPolicy::Ignore);
        assert!(!options.compare_images);
        assert!(options.preserve_permissions);
        assert!(!options.preserve_timestamps);
    }

    #[test]
    fn copy_command_parses() {
        let cli = Cli::try_parse_from([
            "tree-dup",
            "copy",
            "src",
            "dst",
            "--on-conflict",
            "rename-different",
            "--skip-system",
        ])
        .unwrap();

        match cli.command {
            Commands::Copy {
                on_conflict,
                skip_system,
                ..
            } => {
                assert!(matches!(on_conflict, Some(Conflict::RenameDifferent)));
                assert!(skip_system);
            }
            _ => panic!("expected copy"),
        }
    }
}
