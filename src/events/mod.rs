//! # Events Module
//!
//! Event-driven progress reporting for any front-end.
//!
//! ## Design
//! The traversal engine and the duplicator emit events through channels,
//! so a CLI, GUI or log sink can subscribe without the core knowing about
//! it.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Duplicate(DuplicateEvent::FileCopied { destination, .. }) = event {
//!             println!("copied {}", destination.display());
//!         }
//!     }
//! });
//!
//! duplicator.duplicate_with_events(source, destination, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
