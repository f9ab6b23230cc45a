//! File-upload subsystem: drop screening, upload slots, the batch store, and
//! the manager that drives concurrent cancellable uploads over it.

pub mod drop_surface;

mod api;
mod batch;
mod error;
mod manager;
mod slot;

pub use batch::{FileField, SettledFiles, UploadBatch};
pub use drop_surface::{CandidateFile, DropOutcome, RejectedFile};
pub use error::UploadError;
pub use manager::{UploadDoneFn, UploadManager};
pub use slot::{PreviewSource, SlotId, SlotPhase, UploadSlot};
