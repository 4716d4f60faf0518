//! # mb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `mb-core` thread documents. A thread row plus its ordered reply
//! rows form one document; writes always replace the document as a whole.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use mb_core::models::{Reply, Thread};
use mb_core::traits::ThreadRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

pub struct SqliteThreadRepo {
    pool: SqlitePool,
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn thread_from_row(row: &SqliteRow) -> anyhow::Result<Thread> {
    Ok(Thread {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        created_on: row.try_get("created_on")?,
        bumped_on: row.try_get("bumped_on")?,
        delete_password: row.try_get("delete_password")?,
        reported: row.try_get("reported")?,
        replies: Vec::new(),
    })
}

fn reply_from_row(row: &SqliteRow) -> anyhow::Result<Reply> {
    Ok(Reply {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        created_on: row.try_get("created_on")?,
        delete_password: row.try_get("delete_password")?,
        reported: row.try_get("reported")?,
    })
}

impl SqliteThreadRepo {
    /// Opens (creating if needed) the database at `url` and runs migrations.
    ///
    /// In-memory databases are per-connection in SQLite, so they get a single
    /// connection that is never recycled.
    pub async fn new(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if is_in_memory(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!(in_memory = is_in_memory(url), "sqlite thread store ready");

        Ok(Self { pool })
    }

    async fn load_replies(&self, thread: &mut Thread) -> anyhow::Result<()> {
        let rows = sqlx::query(
            "SELECT id, text, created_on, delete_password, reported FROM replies \
             WHERE thread_id = ? ORDER BY position ASC",
        )
        .bind(thread.id)
        .fetch_all(&self.pool)
        .await?;

        thread.replies = rows.iter().map(reply_from_row).collect::<anyhow::Result<_>>()?;
        Ok(())
    }
}

#[async_trait]
impl ThreadRepo for SqliteThreadRepo {
    async fn insert_thread(&self, thread: &Thread) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO threads (id, text, created_on, bumped_on, delete_password, reported) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(thread.id)
        .bind(&thread.text)
        .bind(thread.created_on)
        .bind(thread.bumped_on)
        .bind(&thread.delete_password)
        .bind(thread.reported)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        let row = sqlx::query(
            "SELECT id, text, created_on, bumped_on, delete_password, reported FROM threads WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let mut thread = match row {
            Some(row) => thread_from_row(&row)?,
            None => return Ok(None),
        };
        self.load_replies(&mut thread).await?;
        Ok(Some(thread))
    }

    async fn list_recent(&self, limit: usize) -> anyhow::Result<Vec<Thread>> {
        let rows = sqlx::query(
            "SELECT id, text, created_on, bumped_on, delete_password, reported FROM threads \
             ORDER BY bumped_on DESC LIMIT ?",
        )
        .bind(i64::try_from(limit)?)
        .fetch_all(&self.pool)
        .await?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut thread = thread_from_row(row)?;
            self.load_replies(&mut thread).await?;
            threads.push(thread);
        }
        Ok(threads)
    }

    /// Upserts the thread row and rewrites its replies in one transaction.
    async fn save_thread(&self, thread: &Thread) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO threads (id, text, created_on, bumped_on, delete_password, reported) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
                text = excluded.text, \
                bumped_on = excluded.bumped_on, \
                delete_password = excluded.delete_password, \
                reported = excluded.reported",
        )
        .bind(thread.id)
        .bind(&thread.text)
        .bind(thread.created_on)
        .bind(thread.bumped_on)
        .bind(&thread.delete_password)
        .bind(thread.reported)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM replies WHERE thread_id = ?")
            .bind(thread.id)
            .execute(&mut *tx)
            .await?;

        for (position, reply) in thread.replies.iter().enumerate() {
            sqlx::query(
                "INSERT INTO replies (thread_id, id, position, text, created_on, delete_password, reported) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(thread.id)
            .bind(reply.id)
            .bind(i64::try_from(position)?)
            .bind(&reply.text)
            .bind(reply.created_on)
            .bind(&reply.delete_password)
            .bind(reply.reported)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn mark_reported(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE threads SET reported = TRUE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_thread(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM replies WHERE thread_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    async fn repo() -> SqliteThreadRepo {
        SqliteThreadRepo::new("sqlite::memory:", 1).await.unwrap()
    }

    fn thread_at(offset_secs: i64) -> Thread {
        Thread::new(
            format!("t{offset_secs}"),
            "pw".into(),
            Utc::now() + Duration::seconds(offset_secs),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_thread() {
        let repo = repo().await;
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.expect("Failed to create thread");

        let stored = repo.get_thread(thread.id).await.unwrap().unwrap();
        assert_eq!(stored.id, thread.id);
        assert_eq!(stored.text, "t0");
        assert_eq!(stored.delete_password, "pw");
        assert!(!stored.reported);
        assert!(stored.replies.is_empty());

        assert!(repo.get_thread(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_keeps_reply_order() {
        let repo = repo().await;
        let mut thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();

        let base = Utc::now();
        for i in 0..4 {
            thread.push_reply(Reply::new(format!("r{i}"), "pw".into(), base + Duration::seconds(i)));
        }
        thread.replies[1].reported = true;
        thread.replies[2].redact();
        repo.save_thread(&thread).await.unwrap();

        let stored = repo.get_thread(thread.id).await.unwrap().unwrap();
        let ids: Vec<_> = stored.replies.iter().map(|r| r.id).collect();
        let expected: Vec<_> = thread.replies.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
        assert!(stored.replies[1].reported);
        assert_eq!(stored.replies[2].text, mb_core::DELETED_TEXT);
        assert_eq!(stored.bumped_on, thread.bumped_on);
    }

    #[tokio::test]
    async fn list_recent_orders_by_bump() {
        let repo = repo().await;
        for i in 0..12 {
            repo.insert_thread(&thread_at(i)).await.unwrap();
        }

        let listed = repo.list_recent(10).await.unwrap();
        assert_eq!(listed.len(), 10);
        assert_eq!(listed[0].text, "t11");
        assert_eq!(listed[9].text, "t2");
    }

    #[tokio::test]
    async fn mark_reported_is_fire_and_forget() {
        let repo = repo().await;
        let thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();

        repo.mark_reported(Uuid::now_v7()).await.unwrap();
        repo.mark_reported(thread.id).await.unwrap();
        assert!(repo.get_thread(thread.id).await.unwrap().unwrap().reported);
    }

    #[tokio::test]
    async fn delete_removes_replies_too() {
        let repo = repo().await;
        let mut thread = thread_at(0);
        repo.insert_thread(&thread).await.unwrap();
        thread.push_reply(Reply::new("r".into(), "pw".into(), Utc::now()));
        repo.save_thread(&thread).await.unwrap();

        assert!(repo.delete_thread(thread.id).await.unwrap());
        assert!(!repo.delete_thread(thread.id).await.unwrap());
        assert!(repo.get_thread(thread.id).await.unwrap().is_none());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM replies")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
