//! # Core Module
//!
//! The UI-agnostic duplication engine.
//!
//! ## Modules
//! - `fs` - Filesystem operations behind a trait
//! - `codec` - Image decoding and TIFF encoding
//! - `comparator` - Decides whether two entries hold the same content
//! - `collision` - Decides what to do when a destination is occupied
//! - `traversal` - Walks directory trees with cancellation
//! - `duplicator` - Orchestrates the full copy

pub mod codec;
pub mod collision;
pub mod comparator;
pub mod duplicator;
pub mod fs;
pub mod traversal;

// Re-export commonly used types
pub use collision::{CollisionAction, CollisionDecision, CollisionResolver};
pub use comparator::{ComparisonMethod, ComparisonResult, ContentComparator};
pub use duplicator::{DuplicateOptions, DuplicateReport, Duplicator};
pub use traversal::{
    CancellationToken, EndReason, Flow, TraversalEngine, TraversalObserver, TraversalOutcome,
    TraversalRequest,
};
