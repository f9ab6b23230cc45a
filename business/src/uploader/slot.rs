//! One file's upload lifecycle record.
//!
//! Phase machine: `queued(1%) -> uploading(1..=99%) -> committed | failed`,
//! with `pre-existing(100%)` as a separate construction-time state and
//! removal as an overlay that excludes the slot from display and from
//! settlement accounting. Progress hits 100 only on a terminal outcome,
//! never from byte progress alone.

use super::drop_surface::CandidateFile;

/// Stable identifier for a slot, valid for the slot's whole lifetime.
///
/// Request callbacks correlate to slots by this id, never by position, so
/// later removals can never redirect a stale callback onto another file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u64);

impl SlotId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Where the display layer should source this slot's thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewSource {
    /// Render from the bytes retained on the slot; no server copy exists yet.
    Local,
    /// Render from a server-hosted URL.
    Remote { url: String },
}

/// Coarse display phase derived from slot data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPhase {
    Queued,
    Uploading { percent: u8 },
    Committed,
    Failed,
    PreExisting,
    Removed,
}

/// One file the user dropped (or that was attached before this session),
/// tracked until the surrounding form is done with the field.
#[derive(Debug, Clone)]
pub struct UploadSlot {
    id: SlotId,
    /// Name of the file as dropped, or the stored name for pre-existing files.
    filename: String,
    /// Raw bytes, retained for the local preview until a server copy exists.
    bytes: Option<Vec<u8>>,
    preview: PreviewSource,
    pre_existing: bool,
    /// Server-assigned filename; empty until the upload succeeds.
    committed_name: String,
    /// 0-100; in-flight transfers cap at 99, terminal outcomes use 100.
    progress: u8,
    removed: bool,
    error: Option<String>,
}

impl UploadSlot {
    /// Slot for a file already attached to the record before this session.
    pub(crate) fn pre_existing(id: SlotId, filename: String, preview_url: String) -> Self {
        Self {
            id,
            committed_name: filename.clone(),
            filename,
            bytes: None,
            preview: PreviewSource::Remote { url: preview_url },
            pre_existing: true,
            progress: 100,
            removed: false,
            error: None,
        }
    }

    /// Slot for a freshly dropped file, queued at 1% so the display can tell
    /// it apart from an untouched slot.
    pub(crate) fn queued(id: SlotId, file: &CandidateFile) -> Self {
        Self {
            id,
            filename: file.filename.clone(),
            bytes: Some(file.bytes.clone()),
            preview: PreviewSource::Local,
            pre_existing: false,
            committed_name: String::new(),
            progress: 1,
            removed: false,
            error: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn preview(&self) -> &PreviewSource {
        &self.preview
    }

    /// Bytes for the local preview; `None` once released.
    pub fn preview_bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub fn is_pre_existing(&self) -> bool {
        self.pre_existing
    }

    pub fn committed_name(&self) -> &str {
        &self.committed_name
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Reached a terminal progress value (success, failure, or untouched
    /// pre-existing).
    pub fn is_settled(&self) -> bool {
        self.progress == 100
    }

    pub fn phase(&self) -> SlotPhase {
        if self.removed {
            SlotPhase::Removed
        } else if self.error.is_some() {
            SlotPhase::Failed
        } else if !self.committed_name.is_empty() && !self.pre_existing {
            SlotPhase::Committed
        } else if self.pre_existing {
            SlotPhase::PreExisting
        } else if self.progress <= 1 {
            SlotPhase::Queued
        } else {
            SlotPhase::Uploading {
                percent: self.progress,
            }
        }
    }

    /// This slot's committed name belongs in the owner's add list.
    pub(crate) fn contributes_add(&self) -> bool {
        !self.removed && !self.pre_existing && !self.committed_name.is_empty()
    }

    /// This slot's original filename belongs in the owner's delete list.
    pub(crate) fn contributes_delete(&self) -> bool {
        self.removed && self.pre_existing
    }

    /// Apply byte progress. Ignored once removed or settled, so a late
    /// transfer callback can never resurrect a terminal slot.
    pub(crate) fn set_progress(&mut self, percent: u8) {
        if self.removed || self.is_settled() {
            return;
        }
        self.progress = percent.clamp(1, 99);
    }

    /// Terminal success: record the server filename and swap the preview to
    /// the temporary-storage URL, releasing the local bytes. Returns false
    /// when the slot was already removed or settled.
    pub(crate) fn commit(&mut self, filename: String, preview_url: String) -> bool {
        if self.removed || self.is_settled() {
            return false;
        }
        self.committed_name = filename;
        self.preview = PreviewSource::Remote { url: preview_url };
        self.bytes = None;
        self.progress = 100;
        true
    }

    /// Terminal failure: record the user-displayable error text. Returns
    /// false when the slot was already removed or settled.
    pub(crate) fn fail(&mut self, message: String) -> bool {
        if self.removed || self.is_settled() {
            return false;
        }
        self.error = Some(message);
        self.progress = 100;
        true
    }

    /// Mark removed. An incomplete upload also drops its local preview
    /// bytes. Returns false when already removed.
    pub(crate) fn mark_removed(&mut self) -> bool {
        if self.removed {
            return false;
        }
        if self.progress < 100 {
            self.bytes = None;
        }
        self.removed = true;
        true
    }
}
