//! # BoardService
//!
//! The eight board operations: create/list/report/delete for threads and
//! create/view/report/delete for replies. Each one is a single read, a single
//! write, or a read-then-write of one thread document.
//!
//! The board name is accepted everywhere but does not scope storage; all
//! boards share one pool of threads.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    NewPost, Reply, Thread, ThreadSummary, ThreadView, RECENT_THREAD_LIMIT,
};
use crate::traits::ThreadRepo;

/// Result of a password-gated delete. A wrong password is a normal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    IncorrectPassword,
}

#[derive(Clone)]
pub struct BoardService {
    repo: Arc<dyn ThreadRepo>,
}

fn parse_id(raw: Option<&str>, field: &str) -> Result<Uuid> {
    let raw = raw.ok_or_else(|| AppError::ValidationError(format!("{field} is required")))?;
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::ValidationError(format!("{field} is not a valid id: {raw:?}")))
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value.ok_or_else(|| AppError::ValidationError(format!("{field} is required")))
}

impl BoardService {
    pub fn new(repo: Arc<dyn ThreadRepo>) -> Self {
        Self { repo }
    }

    async fn load(&self, id: Uuid) -> Result<Thread> {
        self.repo
            .get_thread(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Thread", id.to_string()))
    }

    #[instrument(skip(self, post), fields(board = %board))]
    pub async fn create_thread(&self, board: &str, post: NewPost) -> Result<Thread> {
        let text = required(post.text, "text")?;
        let delete_password = required(post.delete_password, "delete_password")?;

        let thread = Thread::new(text, delete_password, Utc::now());
        self.repo.insert_thread(&thread).await?;
        info!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    /// The most recently bumped threads, each trimmed to its last few replies.
    #[instrument(skip(self), fields(board = %board))]
    pub async fn list_recent(&self, board: &str) -> Result<Vec<ThreadSummary>> {
        let threads = self.repo.list_recent(RECENT_THREAD_LIMIT).await?;
        Ok(threads.iter().map(ThreadSummary::from).collect())
    }

    /// Flags a thread for moderation. An id that resolves to nothing is not
    /// distinguished from success.
    #[instrument(skip(self), fields(board = %board))]
    pub async fn report_thread(&self, board: &str, thread_id: Option<&str>) -> Result<()> {
        let id = parse_id(thread_id, "thread_id")?;
        self.repo.mark_reported(id).await?;
        info!(thread_id = %id, "thread reported");
        Ok(())
    }

    #[instrument(skip(self, password), fields(board = %board))]
    pub async fn delete_thread(
        &self,
        board: &str,
        thread_id: Option<&str>,
        password: Option<&str>,
    ) -> Result<DeleteOutcome> {
        let id = parse_id(thread_id, "thread_id")?;
        let thread = self.load(id).await?;

        if password != Some(thread.delete_password.as_str()) {
            debug!(thread_id = %id, "thread delete refused");
            return Ok(DeleteOutcome::IncorrectPassword);
        }

        self.repo.delete_thread(id).await?;
        info!(thread_id = %id, "thread deleted");
        Ok(DeleteOutcome::Deleted)
    }

    /// Appends a reply and bumps the parent thread to the reply's time.
    #[instrument(skip(self, post), fields(board = %board))]
    pub async fn create_reply(
        &self,
        board: &str,
        thread_id: Option<&str>,
        post: NewPost,
    ) -> Result<Reply> {
        let id = parse_id(thread_id, "thread_id")?;
        let mut thread = self.load(id).await?;

        let text = required(post.text, "text")?;
        let delete_password = required(post.delete_password, "delete_password")?;
        let reply = Reply::new(text, delete_password, Utc::now());

        thread.push_reply(reply.clone());
        self.repo.save_thread(&thread).await?;
        info!(thread_id = %id, reply_id = %reply.id, "reply created");
        Ok(reply)
    }

    #[instrument(skip(self), fields(board = %board))]
    pub async fn view_thread(&self, board: &str, thread_id: Option<&str>) -> Result<ThreadView> {
        let id = parse_id(thread_id, "thread_id")?;
        let thread = self.load(id).await?;
        Ok(ThreadView::from(&thread))
    }

    #[instrument(skip(self), fields(board = %board))]
    pub async fn report_reply(
        &self,
        board: &str,
        thread_id: Option<&str>,
        reply_id: Option<&str>,
    ) -> Result<()> {
        let id = parse_id(thread_id, "thread_id")?;
        let mut thread = self.load(id).await?;
        let rid = parse_id(reply_id, "reply_id")?;

        let reply = thread
            .reply_mut(rid)
            .ok_or_else(|| AppError::NotFound("Reply", rid.to_string()))?;
        reply.reported = true;

        self.repo.save_thread(&thread).await?;
        info!(thread_id = %id, reply_id = %rid, "reply reported");
        Ok(())
    }

    /// Redacts a reply's text in place. The reply keeps its id, position and
    /// timestamp.
    #[instrument(skip(self, password), fields(board = %board))]
    pub async fn delete_reply(
        &self,
        board: &str,
        thread_id: Option<&str>,
        reply_id: Option<&str>,
        password: Option<&str>,
    ) -> Result<DeleteOutcome> {
        let id = parse_id(thread_id, "thread_id")?;
        let mut thread = self.load(id).await?;
        let rid = parse_id(reply_id, "reply_id")?;

        let reply = thread
            .reply_mut(rid)
            .ok_or_else(|| AppError::NotFound("Reply", rid.to_string()))?;

        if password != Some(reply.delete_password.as_str()) {
            debug!(thread_id = %id, reply_id = %rid, "reply delete refused");
            return Ok(DeleteOutcome::IncorrectPassword);
        }
        reply.redact();

        self.repo.save_thread(&thread).await?;
        info!(thread_id = %id, reply_id = %rid, "reply redacted");
        Ok(DeleteOutcome::Deleted)
    }
}
