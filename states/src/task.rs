//! Task identity and cooperative cancellation.
//!
//! Every spawned network request gets a [`TaskHandle`] wrapping a
//! `CancellationToken` from `tokio_util`. Cancellation is cooperative: the
//! request future should `tokio::select!` on `token.cancelled()` and settle
//! as cancelled rather than being torn down from outside.

use tokio_util::sync::CancellationToken;

/// Unique identifier for a spawned task.
///
/// Generations are allocated by the owner of the tasks (monotonically
/// increasing), so a late callback can be matched against the task it
/// belongs to even after other tasks have come and gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    generation: u64,
}

impl TaskId {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to an in-flight task with cooperative cancellation.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
}

impl TaskHandle {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            cancel_token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Token for the task future to select on.
    pub fn token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Request cancellation. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            log::trace!(target: "flagdrop_states::task", "cancel task generation={}", self.id.generation());
        }
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
