//! The ordered slot collection for one upload field, plus settlement math.
//!
//! Slots are appended in drop order and never physically deleted; removal is
//! a flag. The batch is settled once it has been touched (a drop or removal
//! happened this session) and every non-removed slot sits at a terminal
//! progress value. Each settlement is reported to the owner exactly once;
//! any later slot activity re-arms the report.

use super::drop_surface::CandidateFile;
use super::slot::{SlotId, UploadSlot};
use crate::config::UploaderConfig;

/// A committed field value: a scalar for single-file fields, a list
/// otherwise. Scalars may be empty ("no file").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileField {
    Single(String),
    Many(Vec<String>),
}

impl FileField {
    fn collapse(names: Vec<String>, single: bool) -> Self {
        if single {
            Self::Single(names.into_iter().next_back().unwrap_or_default())
        } else {
            Self::Many(names)
        }
    }

    /// Scalar accessor; `None` for multi-file fields.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(name) => Some(name),
            Self::Many(_) => None,
        }
    }

    /// List accessor; `None` for single-file fields.
    pub fn as_many(&self) -> Option<&[String]> {
        match self {
            Self::Single(_) => None,
            Self::Many(names) => Some(names),
        }
    }
}

/// Authoritative settled state handed to the owner: filenames to attach to
/// the record and pre-existing filenames to delete server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledFiles {
    pub to_add: FileField,
    pub to_delete: FileField,
}

/// The full ordered collection of slots for one upload field.
#[derive(Debug, Clone, Default)]
pub struct UploadBatch {
    slots: Vec<UploadSlot>,
    next_slot: u64,
    /// Whether any drop or removal happened this session. Untouched batches
    /// (edit forms freshly seeded from initial files) never settle.
    touched: bool,
    /// The current settlement has already been reported to the owner.
    settle_reported: bool,
    /// Messages for files the drop surface refused, most recent drop only.
    rejection_notices: Vec<String>,
}

impl UploadBatch {
    /// Batch pre-populated with the record's existing files.
    pub fn seeded(config: &UploaderConfig) -> Self {
        let mut batch = Self::default();
        for filename in &config.initial_files {
            let id = batch.next_id();
            batch.slots.push(UploadSlot::pre_existing(
                id,
                filename.clone(),
                config.real_preview_url(filename),
            ));
        }
        batch
    }

    fn next_id(&mut self) -> SlotId {
        let id = SlotId::new(self.next_slot);
        self.next_slot += 1;
        id
    }

    /// All slots in insertion order, removed ones included.
    pub fn slots(&self) -> &[UploadSlot] {
        &self.slots
    }

    /// Slots the display should show.
    pub fn visible_slots(&self) -> impl Iterator<Item = &UploadSlot> {
        self.slots.iter().filter(|slot| !slot.is_removed())
    }

    /// Number of slots not marked removed.
    pub fn live_count(&self) -> usize {
        self.visible_slots().count()
    }

    pub fn live_slot_ids(&self) -> Vec<SlotId> {
        self.visible_slots().map(UploadSlot::id).collect()
    }

    pub fn slot(&self, id: SlotId) -> Option<&UploadSlot> {
        self.slots.iter().find(|slot| slot.id() == id)
    }

    fn slot_mut(&mut self, id: SlotId) -> Option<&mut UploadSlot> {
        self.slots.iter_mut().find(|slot| slot.id() == id)
    }

    pub fn rejection_notices(&self) -> &[String] {
        &self.rejection_notices
    }

    pub(crate) fn set_rejection_notices(&mut self, notices: Vec<String>) {
        self.rejection_notices = notices;
    }

    /// Append a queued slot for an accepted file and return its id.
    pub(crate) fn allocate(&mut self, file: &CandidateFile) -> SlotId {
        let id = self.next_id();
        self.slots.push(UploadSlot::queued(id, file));
        self.touched = true;
        self.settle_reported = false;
        id
    }

    pub(crate) fn apply_progress(&mut self, id: SlotId, percent: u8) {
        if let Some(slot) = self.slot_mut(id) {
            slot.set_progress(percent);
        }
    }

    pub(crate) fn apply_commit(&mut self, id: SlotId, filename: String, preview_url: String) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.commit(filename, preview_url) {
                self.settle_reported = false;
            }
        }
    }

    pub(crate) fn apply_failure(&mut self, id: SlotId, message: String) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.fail(message) {
                self.settle_reported = false;
            }
        }
    }

    /// Mark a slot removed. Returns false for unknown or already-removed
    /// slots, making removal idempotent.
    pub(crate) fn remove(&mut self, id: SlotId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        if !slot.mark_removed() {
            return false;
        }
        self.touched = true;
        self.settle_reported = false;
        true
    }

    /// Every non-removed slot has reached a terminal progress value.
    pub fn is_settled(&self) -> bool {
        self.touched
            && !self.slots.is_empty()
            && self.visible_slots().all(UploadSlot::is_settled)
    }

    /// Report the current settlement once.
    ///
    /// Returns `Some` only on the first call after the batch (re)settles;
    /// callers invoke the owner callback with the result. Must run under the
    /// store lock so two racing completions cannot both claim the report.
    pub(crate) fn take_settlement(&mut self, max_slots: usize) -> Option<SettledFiles> {
        if !self.is_settled() || self.settle_reported {
            return None;
        }
        self.settle_reported = true;
        Some(self.settled_files(max_slots))
    }

    /// The authoritative add/delete lists for the current state.
    pub fn settled_files(&self, max_slots: usize) -> SettledFiles {
        let single = max_slots <= 1;
        let to_add = self
            .slots
            .iter()
            .filter(|slot| slot.contributes_add())
            .map(|slot| slot.committed_name().to_owned())
            .collect();
        let to_delete = self
            .slots
            .iter()
            .filter(|slot| slot.contributes_delete())
            .map(|slot| slot.committed_name().to_owned())
            .collect();
        SettledFiles {
            to_add: FileField::collapse(to_add, single),
            to_delete: FileField::collapse(to_delete, single),
        }
    }
}
