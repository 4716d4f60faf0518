//! # mb-store-memory
//!
//! In-process implementation of `ThreadRepo`.
//! Documents live in a `DashMap` keyed by thread id and are cloned in and out,
//! so callers get the same whole-document semantics as a real store.

use async_trait::async_trait;
use dashmap::DashMap;
use mb_core::models::Thread;
use mb_core::traits::ThreadRepo;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryThreadRepo {
    threads: DashMap<Uuid, Thread>,
}

impl MemoryThreadRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

#[async_trait]
impl ThreadRepo for MemoryThreadRepo {
    async fn insert_thread(&self, thread: &Thread) -> anyhow::Result<()> {
        if self.threads.contains_key(&thread.id) {
            anyhow::bail!("duplicate thread id {}", thread.id);
        }
        self.threads.insert(thread.id, thread.clone());
        Ok(())
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        Ok(self.threads.get(&id).map(|entry| entry.value().clone()))
    }

    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self.threads.iter().map(|e| e.value().clone()).collect();
        threads.sort_by(|a, b| b.bumped_on.cmp(&a.bumped_on));
        threads.truncate(limit);
        Ok(threads)
    }

    /// Re-saving a thread that was deleted in the meantime recreates it, as a
    /// document store's save would.
    async fn save_thread(&self, thread: &Thread) -> anyhow::Result<()> {
        self.threads.insert(thread.id, thread.clone());
        Ok(())
    }

    async fn mark_reported(&self, id: Uuid) -> anyhow::Result<()> {
        if let Some(mut entry) = self.threads.get_mut(&id) {
            entry.reported = true;
        }
        Ok(())
    }

    async fn delete_thread(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.threads.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use mb_core::models::Reply;

    fn thread_at(offset_secs: i64) -> Thread {
        Thread::new(
            format!("t{offset_secs}"),
            "pw".into(),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn insert_then_get() {
        let repo = MemoryThreadRepo::new();
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();
        assert_eq!(repo.get_thread(thread.id).await.unwrap(), Some(thread));
        assert!(repo.get_thread(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let repo = MemoryThreadRepo::new();
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();
        assert!(repo.insert_thread(&thread).await.is_err());
    }

    #[tokio::test]
    async fn list_recent_orders_by_bump_and_limits() {
        let repo = MemoryThreadRepo::new();
        for i in 0..12 {
            repo.insert_thread(&thread_at(i)).await.unwrap();
        }
        let listed = repo.list_recent(10).await.unwrap();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].text, "t11");
        assert!(listed.windows(2).all(|w| w[0].bumped_on >= w[1].bumped_on));
    }

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let repo = MemoryThreadRepo::new();
        let mut thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();

        thread.push_reply(Reply::new("r".into(), "pw".into(), Utc::now()));
        repo.save_thread(&thread).await.unwrap();

        let stored = repo.get_thread(thread.id).await.unwrap().unwrap();
        assert_eq!(stored.replies.len(), 1);
        assert_eq!(stored.bumped_on, thread.bumped_on);
    }

    #[tokio::test]
    async fn mark_reported_ignores_unknown_ids() {
        let repo = MemoryThreadRepo::new();
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();

        repo.mark_reported(Uuid::now_v7()).await.unwrap();
        repo.mark_reported(thread.id).await.unwrap();
        assert!(repo.get_thread(thread.id).await.unwrap().unwrap().reported);
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let repo = MemoryThreadRepo::new();
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();
        assert!(repo.delete_thread(thread.id).await.unwrap());
        assert!(!repo.delete_thread(thread.id).await.unwrap());
        assert!(repo.is_empty());
    }
}
