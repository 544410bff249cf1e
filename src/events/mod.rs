//! # Events Module
//!
//! Event-driven progress reporting, so the core never touches UI state.
//!
//! ## Design
//! Ingestion and relocation emit events through a channel; any shell
//! (CLI, GUI) subscribes on its own thread and renders progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Relocate(RelocateEvent::FileCompleted { progress, .. }) = event {
//!             println!("{}/{}", progress.files_completed, progress.files_total);
//!         }
//!     }
//! });
//!
//! session.relocate_all(&archive_root, &sender, &CancelToken::new())?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, CancelToken, EventChannel, EventReceiver, EventSender};
pub use types::*;
