//! Shared state and task primitives for the flagdrop client.
//!
//! Network callbacks in the upload pipeline interleave on the runtime, so
//! every piece of shared state lives behind a [`Store`]: a single
//! authoritative value that callbacks read-modify-write atomically instead of
//! acting on captured snapshots. [`TaskHandle`] pairs each spawned request
//! with a `CancellationToken` for cooperative cancellation.

mod store;
mod task;

pub use store::Store;
pub use task::{TaskHandle, TaskId};
