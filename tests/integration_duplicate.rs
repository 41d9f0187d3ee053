//! Integration tests for the duplicator.
//!
//! These tests run full copies against real temporary directories:
//! - Mirroring a fresh tree
//! - Each collision policy against a pre-populated destination
//! - Skip options (zero-byte, hidden, structure-only)
//! - Rotated images and TIFF conversion

use image::{imageops, Rgba, RgbaImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tree_duplicator::core::collision::CollisionAction;
use tree_duplicator::core::duplicator::Duplicator;
use tree_duplicator::core::traversal::EndReason;
use tree_duplicator::events::{DuplicateEvent, Event, EventChannel, SkipReason};
use tree_duplicator::DuplicateFinderError;

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Source tree `{ a.txt = "hi", sub/b.txt = "yo" }`
fn sample_source() -> TempDir {
    let source = TempDir::new().unwrap();
    write(&source.path().join("a.txt"), b"hi");
    write(&source.path().join("sub").join("b.txt"), b"yo");
    source
}

/// A small image with no rotational symmetry
fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 40) as u8, (y * 60) as u8, ((x + y) * 10) as u8, 255])
    })
}

#[test]
fn mirrors_a_fresh_tree() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.outcome.end, EndReason::Finished);
    assert_eq!(report.outcome.files_found, 2);
    assert_eq!(report.outcome.directories_visited, 2);
    assert_eq!(report.outcome.errors, 0);
    assert_eq!(report.files_copied, 2);
    assert_eq!(report.directories_created, 1);
    assert!(report.errors.is_empty());

    assert_eq!(fs::read(destination.path().join("a.txt")).unwrap(), b"hi");
    assert_eq!(
        fs::read(destination.path().join("sub").join("b.txt")).unwrap(),
        b"yo"
    );
}

#[test]
fn creates_a_missing_destination_root() {
    let source = sample_source();
    let parent = TempDir::new().unwrap();
    let destination = parent.path().join("nested").join("copy");

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), &destination)
        .unwrap();

    assert!(report.succeeded());
    assert!(destination.join("sub").join("b.txt").is_file());
}

#[test]
fn identical_file_is_skipped() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"hi");

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_skipped, 1);
    assert_eq!(report.files_copied, 1);
    assert_eq!(report.files_renamed, 0);
    assert!(!destination.path().join("a_1.txt").exists());
}

#[test]
fn different_file_is_copied_under_a_new_name() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"old");

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_renamed, 1);
    assert_eq!(fs::read(destination.path().join("a.txt")).unwrap(), b"old");
    assert_eq!(fs::read(destination.path().join("a_1.txt")).unwrap(), b"hi");
}

#[test]
fn rename_skips_taken_suffixes() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"old");
    write(&destination.path().join("a_1.txt"), b"older");

    Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(fs::read(destination.path().join("a_1.txt")).unwrap(), b"older");
    assert_eq!(fs::read(destination.path().join("a_2.txt")).unwrap(), b"hi");
}

#[test]
fn overwrite_policy_replaces_existing_files() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"old");

    let report = Duplicator::builder()
        .collision(CollisionAction::OverwriteExistingFiles)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_overwritten, 1);
    assert_eq!(fs::read(destination.path().join("a.txt")).unwrap(), b"hi");
    assert!(!destination.path().join("a_1.txt").exists());
}

#[test]
fn keep_policy_leaves_existing_files_alone() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"old");

    let report = Duplicator::builder()
        .collision(CollisionAction::KeepExistingFiles)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_skipped, 1);
    assert_eq!(fs::read(destination.path().join("a.txt")).unwrap(), b"old");
    assert!(!destination.path().join("a_1.txt").exists());
}

#[test]
fn rename_any_policy_renames_identical_files_too() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"hi");

    let report = Duplicator::builder()
        .collision(CollisionAction::RenameAnyExistingFiles)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_renamed, 1);
    assert_eq!(fs::read(destination.path().join("a_1.txt")).unwrap(), b"hi");
}

#[test]
fn zero_byte_files_are_skipped_but_still_found() {
    let source = sample_source();
    write(&source.path().join("empty.txt"), b"");
    let destination = TempDir::new().unwrap();

    let report = Duplicator::builder()
        .skip_zero_byte_files(true)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.outcome.files_found, 3);
    assert_eq!(report.files_skipped, 1);
    assert!(!destination.path().join("empty.txt").exists());
}

#[test]
fn structure_only_creates_directories_without_files() {
    let source = sample_source();
    write(&source.path().join("sub").join("deeper").join("c.txt"), b"c");
    let destination = TempDir::new().unwrap();

    let report = Duplicator::builder()
        .directory_structure_only(true)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_written(), 0);
    assert_eq!(report.directories_created, 2);
    assert!(destination.path().join("sub").join("deeper").is_dir());
    assert!(!destination.path().join("a.txt").exists());
}

#[test]
fn hidden_entries_are_left_out_when_requested() {
    let source = sample_source();
    write(&source.path().join(".secret"), b"shh");
    write(&source.path().join(".cache").join("blob.bin"), b"blob");
    let destination = TempDir::new().unwrap();

    let report = Duplicator::builder()
        .skip_system_files(true)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.directories_skipped, 1);
    assert!(!destination.path().join(".secret").exists());
    assert!(!destination.path().join(".cache").exists());
    assert!(destination.path().join("a.txt").exists());
}

#[test]
fn top_level_only_copies_direct_children() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();

    let report = Duplicator::builder()
        .recursive(false)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.outcome.files_found, 1);
    assert!(destination.path().join("sub").is_dir());
    assert!(!destination.path().join("sub").join("b.txt").exists());
}

#[test]
fn destination_inside_source_is_not_copied_into_itself() {
    let source = sample_source();
    let destination = source.path().join("backup");

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), &destination)
        .unwrap();

    assert!(report.succeeded());
    assert!(destination.join("a.txt").exists());
    assert!(!destination.join("backup").exists());
}

#[test]
fn second_run_skips_everything() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    let duplicator = Duplicator::builder().build();

    duplicator.duplicate(source.path(), destination.path()).unwrap();
    let report = duplicator.duplicate(source.path(), destination.path()).unwrap();

    assert_eq!(report.files_written(), 0);
    assert_eq!(report.files_skipped, 2);
}

#[test]
fn rotated_image_counts_as_identical() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    let original = gradient(4, 3);
    original.save(source.path().join("photo.png")).unwrap();
    imageops::rotate90(&original)
        .save(destination.path().join("photo.png"))
        .unwrap();

    let report = Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_skipped, 1);
    assert!(!destination.path().join("photo_1.png").exists());
}

#[test]
fn rotated_image_differs_when_image_comparison_is_off() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    let original = gradient(4, 3);
    original.save(source.path().join("photo.png")).unwrap();
    imageops::rotate180(&original)
        .save(destination.path().join("photo.png"))
        .unwrap();

    let report = Duplicator::builder()
        .compare_images(false)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_renamed, 1);
    assert!(destination.path().join("photo_1.png").exists());
}

#[test]
fn images_convert_to_tiff_once() {
    let source = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();
    gradient(5, 2).save(source.path().join("photo.png")).unwrap();
    write(&source.path().join("notes.txt"), b"not an image");

    let duplicator = Duplicator::builder().convert_images_to_tiff(true).build();
    let first = duplicator.duplicate(source.path(), destination.path()).unwrap();

    assert_eq!(first.files_copied, 2);
    let converted = destination.path().join("photo.tiff");
    assert!(converted.exists());
    assert!(!destination.path().join("photo.png").exists());
    assert_eq!(image::open(&converted).unwrap().to_rgba8(), gradient(5, 2));
    assert!(destination.path().join("notes.txt").exists());

    let second = duplicator.duplicate(source.path(), destination.path()).unwrap();
    assert_eq!(second.files_written(), 0);
    assert_eq!(second.files_skipped, 2);
}

#[test]
fn missing_source_is_an_error() {
    let parent = TempDir::new().unwrap();
    let destination = TempDir::new().unwrap();

    let result = Duplicator::builder()
        .build()
        .duplicate(parent.path().join("missing"), destination.path());

    assert!(matches!(result, Err(DuplicateFinderError::Traversal(_))));
}

#[test]
fn events_describe_each_decision() {
    let source = sample_source();
    let destination = TempDir::new().unwrap();
    write(&destination.path().join("a.txt"), b"hi");
    let (sender, receiver) = EventChannel::new();

    Duplicator::builder()
        .build()
        .duplicate_with_events(source.path(), destination.path(), &sender)
        .unwrap();
    drop(sender);

    let events: Vec<Event> = receiver.iter().collect();
    assert!(matches!(
        events.first(),
        Some(Event::Duplicate(DuplicateEvent::Started { .. }))
    ));
    assert!(matches!(
        events.last(),
        Some(Event::Duplicate(DuplicateEvent::Completed { summary })) if summary.files_skipped == 1
    ));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Duplicate(DuplicateEvent::Skipped {
            reason: SkipReason::Identical,
            ..
        })
    )));
    assert!(events.iter().any(|event| matches!(
        event,
        Event::Duplicate(DuplicateEvent::FileCopied { bytes: 2, .. })
    )));
}

#[test]
fn duplicating_a_directory_onto_itself_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(&dir.path().join("a.txt"), b"precious");

    let result = Duplicator::builder()
        .collision(CollisionAction::OverwriteExistingFiles)
        .build()
        .duplicate(dir.path(), dir.path());

    assert!(matches!(result, Err(DuplicateFinderError::Config(_))));
    assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"precious");
}

#[cfg(unix)]
#[test]
fn destination_linked_to_the_source_file_is_not_truncated() {
    let source = TempDir::new().unwrap();
    write(&source.path().join("a.txt"), b"precious");
    let destination = TempDir::new().unwrap();
    std::os::unix::fs::symlink(
        source.path().join("a.txt"),
        destination.path().join("a.txt"),
    )
    .unwrap();

    let report = Duplicator::builder()
        .collision(CollisionAction::OverwriteExistingFiles)
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    assert_eq!(report.files_overwritten, 0);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(fs::read(source.path().join("a.txt")).unwrap(), b"precious");
}

#[cfg(unix)]
#[test]
fn permissions_follow_the_source() {
    use std::os::unix::fs::PermissionsExt;

    let source = sample_source();
    let script = source.path().join("run.sh");
    write(&script, b"#!/bin/sh\n");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();
    let destination = TempDir::new().unwrap();

    Duplicator::builder()
        .build()
        .duplicate(source.path(), destination.path())
        .unwrap();

    let mode = fs::metadata(destination.path().join("run.sh"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o750);
}
