//! The upload manager: drop acceptance, concurrent per-file uploads,
//! cancellation, and settlement reporting.
//!
//! All shared state lives in one `Store<UploadBatch>`; request callbacks
//! mutate it by id under the store lock, so completions arriving in the same
//! tick serialize instead of clobbering each other. The owner callback fires
//! exactly once per (re)entry into the settled state and only ever *after*
//! the user has touched the batch.
//!
//! Spawning happens on the ambient tokio runtime; `accept_drop` must be
//! called from within one.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use flagdrop_states::{Store, TaskHandle, TaskId};

use super::api;
use super::batch::{SettledFiles, UploadBatch};
use super::drop_surface::{self, CandidateFile};
use super::error::UploadError;
use super::slot::SlotId;
use crate::config::UploaderConfig;
use crate::http::Client;

/// Owner callback, invoked with the authoritative add/delete lists each time
/// the batch settles.
pub type UploadDoneFn = Arc<dyn Fn(SettledFiles) + Send + Sync>;

/// Work produced by one drop, computed atomically against the batch.
struct DropPlan {
    replaced: Vec<SlotId>,
    spawned: Vec<(SlotId, CandidateFile)>,
}

/// Drives one upload field: owns the slot batch, one in-flight request per
/// dropped file, and the settled-state report to the owning form.
///
/// Cheap to clone; clones share the same batch and task set.
#[derive(Clone)]
pub struct UploadManager {
    config: Arc<UploaderConfig>,
    client: Client,
    store: Store<UploadBatch>,
    tasks: Arc<Mutex<HashMap<SlotId, TaskHandle>>>,
    on_upload_done: UploadDoneFn,
}

impl UploadManager {
    /// Build a manager seeded from the config's initial files.
    ///
    /// `client` should come from [`Client::with_bearer`] with the session's
    /// access token; it is used for every upload request.
    pub fn new(
        config: UploaderConfig,
        client: Client,
        on_upload_done: impl Fn(SettledFiles) + Send + Sync + 'static,
    ) -> Self {
        let store = Store::new(UploadBatch::seeded(&config));
        Self {
            config: Arc::new(config),
            client,
            store,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            on_upload_done: Arc::new(on_upload_done),
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    /// Snapshot of the current batch for display.
    pub fn batch(&self) -> UploadBatch {
        self.store.snapshot()
    }

    /// Change signal: one `()` per batch mutation (progress included).
    pub fn subscribe(&self) -> flume::Receiver<()> {
        self.store.subscribe()
    }

    /// Batch-level messages from the most recent drop's rejected files.
    pub fn rejection_notices(&self) -> Vec<String> {
        self.store.read(|batch| batch.rejection_notices().to_vec())
    }

    /// Accept a dropped batch of candidate files.
    ///
    /// Candidates are screened against the accepted types and the remaining
    /// capacity; each accepted file gets a slot and an immediately spawned
    /// upload request. With `max_slots == 1` the new file replaces the
    /// current one, cancelling it first if still in flight. Returns the
    /// rejection messages for the files that were refused.
    pub fn accept_drop(&self, candidates: Vec<CandidateFile>) -> Vec<String> {
        let capacity = if self.config.is_multiple() {
            self.store
                .read(|batch| self.config.max_slots.saturating_sub(batch.live_count()))
        } else {
            1
        };

        let mut outcome = drop_surface::screen(candidates, &self.config.accepted_types, capacity);
        let messages = outcome.rejection_messages();
        if !messages.is_empty() {
            log::debug!(
                target: "flagdrop::uploader",
                "drop rejected {} file(s)",
                messages.len()
            );
        }

        let accepted = std::mem::take(&mut outcome.accepted);
        let replace = !self.config.is_multiple() && !accepted.is_empty();
        let plan = self.store.update(|batch| {
            batch.set_rejection_notices(messages.clone());
            let mut plan = DropPlan {
                replaced: Vec::new(),
                spawned: Vec::new(),
            };
            if replace {
                for id in batch.live_slot_ids() {
                    if batch.remove(id) {
                        plan.replaced.push(id);
                    }
                }
            }
            for file in accepted {
                let id = batch.allocate(&file);
                plan.spawned.push((id, file));
            }
            plan
        });

        for id in plan.replaced {
            if let Some(handle) = self.tasks_lock().remove(&id) {
                handle.cancel();
            }
        }
        for (id, file) in plan.spawned {
            log::debug!(
                target: "flagdrop::uploader",
                "upload start slot={} file={}",
                id.raw(),
                file.filename
            );
            self.spawn_upload(id, file);
        }

        messages
    }

    /// Remove a slot, cancelling its request if one is still outstanding.
    ///
    /// Idempotent: removing an unknown or already-removed slot does nothing.
    /// Removal can itself settle the batch (the remaining live slots may all
    /// be terminal), in which case the owner callback fires.
    pub fn remove_slot(&self, id: SlotId) {
        let removed = self.store.update(|batch| batch.remove(id));
        if !removed {
            return;
        }
        if let Some(handle) = self.tasks_lock().remove(&id) {
            handle.cancel();
        }
        log::debug!(target: "flagdrop::uploader", "slot removed slot={}", id.raw());
        self.check_settled();
    }

    fn spawn_upload(&self, id: SlotId, file: CandidateFile) {
        let handle = TaskHandle::new(TaskId::new(id.raw()));
        let token = handle.token();
        self.tasks_lock().insert(id, handle);

        let manager = self.clone();
        tokio::spawn(async move {
            let progress_store = manager.store.clone();
            let progress = move |percent| {
                progress_store.update(|batch| batch.apply_progress(id, percent));
            };
            let result =
                api::upload_file(&manager.client, &manager.config, file, progress, token).await;
            manager.finish_upload(id, result);
        });
    }

    fn finish_upload(&self, id: SlotId, result: Result<String, UploadError>) {
        match result {
            Ok(filename) => {
                log::debug!(
                    target: "flagdrop::uploader",
                    "upload committed slot={} filename={filename}",
                    id.raw()
                );
                let preview_url = self.config.temp_preview_url(&filename);
                self.store
                    .update(|batch| batch.apply_commit(id, filename, preview_url));
            }
            Err(UploadError::Cancelled) => {
                // The slot was removed before the request settled; there is
                // nothing left to record.
                log::trace!(target: "flagdrop::uploader", "upload cancelled slot={}", id.raw());
            }
            Err(err) => {
                log::warn!(
                    target: "flagdrop::uploader",
                    "upload failed slot={} error={err}",
                    id.raw()
                );
                self.store
                    .update(|batch| batch.apply_failure(id, err.display_message()));
            }
        }
        self.tasks_lock().remove(&id);
        self.check_settled();
    }

    fn check_settled(&self) {
        let settled = self
            .store
            .update(|batch| batch.take_settlement(self.config.max_slots));
        if let Some(files) = settled {
            log::debug!(target: "flagdrop::uploader", "batch settled");
            (self.on_upload_done)(files);
        }
    }

    fn tasks_lock(&self) -> MutexGuard<'_, HashMap<SlotId, TaskHandle>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
