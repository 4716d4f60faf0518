//! # Core Traits (Ports)
//!
//! Any storage plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::models::Thread;
use uuid::Uuid;

/// Document persistence contract for threads and their embedded replies.
///
/// A thread is always read and written whole. Concurrent mutate-then-save
/// calls on the same thread are last-write-wins.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn insert_thread(&self, thread: &Thread) -> anyhow::Result<()>;

    /// Loads a thread with all replies in insertion order.
    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>>;

    /// Threads ordered by `bumped_on` descending, at most `limit`.
    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<Thread>>;

    /// Overwrites the stored document, replies included.
    async fn save_thread(&self, thread: &Thread) -> anyhow::Result<()>;

    /// Sets the thread's reported flag. Succeeds whether or not `id` exists.
    async fn mark_reported(&self, id: Uuid) -> anyhow::Result<()>;

    /// Removes the thread and its replies. Returns whether anything was removed.
    async fn delete_thread(&self, id: Uuid) -> anyhow::Result<bool>;
}
