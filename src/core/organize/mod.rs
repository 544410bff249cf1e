//! Archive organization.
//!
//! Plans `year/month/device` targets, resolves name conflicts and moves
//! files with copy-verify-delete, one batch at a time.

mod batch;
mod conflict;
mod planner;
mod relocator;
mod session;
mod types;

pub use batch::relocate_batch;
pub use conflict::{files_identical, ConflictResolver, Resolution};
pub use planner::{device_label_for, device_segment, PathPlanner, OTHER_DEVICE};
pub use relocator::{copy_preserving, CopyFn, Relocator, RemoveFn};
pub use session::{IngestReport, IngestSession};
pub use types::*;
