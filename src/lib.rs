//! # Tree Duplicator
//!
//! Duplicates directory trees without copying the same content twice.
//!
//! ## Core Philosophy
//! - **Never lose data** - an existing destination file is only replaced
//!   when the policy says so; the default keeps both copies of different files
//! - **Same content, no copy** - identical files (and rotated copies of the
//!   same image) already at the destination are skipped
//! - **Keep going** - one unreadable directory or failed copy is reported,
//!   not fatal
//!
//! ## Architecture
//! - `core` - traversal engine, comparator, collision resolver, duplicator
//! - `events` - event-driven progress reporting (GUI-ready)
//! - `error` - error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DuplicateFinderError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. The filter comes
/// from `RUST_LOG`, falling back to `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
