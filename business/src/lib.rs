//! Business layer of the flagdrop client: dropped-file screening, concurrent
//! flag-icon uploads with per-file progress and cancellation, and the settled
//! add/delete reconciliation reported back to the owning form.
//!
//! The layer is UI-free by design. Rendering code reads slot data (progress
//! percent, error text, preview source) out of the manager's store and draws
//! whatever it likes; nothing here depends on a widget toolkit.

pub mod config;
pub mod http;
pub mod uploader;

pub use config::UploaderConfig;
pub use http::{Client, HttpError, Response};
pub use uploader::{
    CandidateFile, DropOutcome, FileField, PreviewSource, RejectedFile, SettledFiles, SlotId,
    SlotPhase, UploadBatch, UploadError, UploadManager, UploadSlot,
};
