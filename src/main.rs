//! # tree-dup CLI
//!
//! Command-line interface for the tree duplicator.
//!
//! ## Usage
//! ```bash
//! tree-dup copy ~/Photos /mnt/backup/Photos
//! tree-dup copy ~/Photos /mnt/backup/Photos --on-conflict keep --skip-system
//! tree-dup scan ~/Photos --top-level-only
//! tree-dup compare a.jpg b.jpg --images
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
