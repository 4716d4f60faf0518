//! # Domain Models
//!
//! These structs represent the core entities of the message board.
//! We use UUID v7 for time-ordered, globally unique identification.
//!
//! The stored records carry credentials and moderation flags, so they are
//! deliberately not `Serialize`. Everything a client sees goes through the
//! projection types at the bottom of this module.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Text a reply is redacted to when its author deletes it.
pub const DELETED_TEXT: &str = "[deleted]";

/// How many threads the board index returns.
pub const RECENT_THREAD_LIMIT: usize = 10;

/// How many trailing replies each thread shows on the board index.
pub const PREVIEW_REPLY_LIMIT: usize = 3;

/// A discussion thread. Owns its replies outright.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
    /// The timestamp used for sorting threads by activity
    pub bumped_on: DateTime<Utc>,
    pub delete_password: String,
    pub reported: bool,
    /// Chronological, append-only. Deleted replies stay in place.
    pub replies: Vec<Reply>,
}

/// A reply embedded in its parent thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub delete_password: String,
    pub reported: bool,
}

/// Client-supplied content for a new thread or reply.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub text: Option<String>,
    pub delete_password: Option<String>,
}

impl Thread {
    pub fn new(text: String, delete_password: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            created_on: now,
            bumped_on: now,
            delete_password,
            reported: false,
            replies: Vec::new(),
        }
    }

    /// Appends a reply and bumps the thread to the reply's creation time.
    pub fn push_reply(&mut self, reply: Reply) {
        self.bumped_on = reply.created_on;
        self.replies.push(reply);
    }

    pub fn reply_mut(&mut self, id: Uuid) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == id)
    }
}

impl Reply {
    pub fn new(text: String, delete_password: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text,
            created_on: now,
            delete_password,
            reported: false,
        }
    }

    /// Replaces the content with the sentinel, keeping id and position.
    pub fn redact(&mut self) {
        self.text = DELETED_TEXT.to_string();
    }
}

// ── Client-facing projections ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
}

/// A thread with every reply, as returned by the single-thread view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyView>,
}

/// A thread as listed on the board index: trailing replies only, plus the
/// total count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub text: String,
    pub created_on: DateTime<Utc>,
    pub bumped_on: DateTime<Utc>,
    pub replies: Vec<ReplyView>,
    pub replycount: usize,
}

impl From<&Reply> for ReplyView {
    fn from(reply: &Reply) -> Self {
        Self {
            id: reply.id,
            text: reply.text.clone(),
            created_on: reply.created_on,
        }
    }
}

impl From<&Thread> for ThreadView {
    fn from(thread: &Thread) -> Self {
        Self {
            id: thread.id,
            text: thread.text.clone(),
            created_on: thread.created_on,
            bumped_on: thread.bumped_on,
            replies: thread.replies.iter().map(ReplyView::from).collect(),
        }
    }
}

impl From<&Thread> for ThreadSummary {
    fn from(thread: &Thread) -> Self {
        let replycount = thread.replies.len();
        let skip = replycount.saturating_sub(PREVIEW_REPLY_LIMIT);
        Self {
            id: thread.id,
            text: thread.text.clone(),
            created_on: thread.created_on,
            bumped_on: thread.bumped_on,
            replies: thread.replies[skip..].iter().map(ReplyView::from).collect(),
            replycount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn thread_with_replies(n: usize) -> Thread {
        let start = Utc::now();
        let mut thread = Thread::new("op".into(), "pw".into(), start);
        for i in 0..n {
            let at = start + Duration::seconds(i as i64 + 1);
            thread.push_reply(Reply::new(format!("reply {i}"), "pw".into(), at));
        }
        thread
    }

    #[test]
    fn new_thread_starts_unbumped_and_clean() {
        let now = Utc::now();
        let thread = Thread::new("hello".into(), "pw".into(), now);
        assert_eq!(thread.created_on, now);
        assert_eq!(thread.bumped_on, now);
        assert!(!thread.reported);
        assert!(thread.replies.is_empty());
    }

    #[test]
    fn push_reply_bumps_to_reply_time() {
        let thread = thread_with_replies(2);
        assert_eq!(thread.bumped_on, thread.replies[1].created_on);
        assert!(thread.bumped_on >= thread.created_on);
    }

    #[test]
    fn summary_keeps_last_three_and_counts_all() {
        let thread = thread_with_replies(5);
        let summary = ThreadSummary::from(&thread);
        assert_eq!(summary.replycount, 5);
        let texts: Vec<_> = summary.replies.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["reply 2", "reply 3", "reply 4"]);
    }

    #[test]
    fn summary_of_short_thread_shows_everything() {
        let summary = ThreadSummary::from(&thread_with_replies(2));
        assert_eq!(summary.replycount, 2);
        assert_eq!(summary.replies.len(), 2);
    }

    #[test]
    fn view_shows_every_reply() {
        let view = ThreadView::from(&thread_with_replies(7));
        assert_eq!(view.replies.len(), 7);
    }

    #[test]
    fn projections_never_carry_secrets() {
        let mut thread = thread_with_replies(4);
        thread.reported = true;
        thread.replies[3].reported = true;

        for value in [
            serde_json::to_value(ThreadView::from(&thread)).unwrap(),
            serde_json::to_value(ThreadSummary::from(&thread)).unwrap(),
        ] {
            let obj = value.as_object().unwrap();
            assert!(obj.contains_key("_id"));
            assert!(!obj.contains_key("delete_password"));
            assert!(!obj.contains_key("reported"));
            for reply in obj["replies"].as_array().unwrap() {
                let reply = reply.as_object().unwrap();
                assert!(reply.contains_key("_id"));
                assert!(!reply.contains_key("delete_password"));
                assert!(!reply.contains_key("reported"));
            }
        }
    }

    #[test]
    fn view_has_no_replycount() {
        let value = serde_json::to_value(ThreadView::from(&thread_with_replies(1))).unwrap();
        assert!(value.get("replycount").is_none());
    }

    #[test]
    fn redact_keeps_identity() {
        let mut thread = thread_with_replies(2);
        let before = thread.replies[0].clone();
        thread.replies[0].redact();
        assert_eq!(thread.replies[0].text, DELETED_TEXT);
        assert_eq!(thread.replies[0].id, before.id);
        assert_eq!(thread.replies[0].created_on, before.created_on);
        assert_eq!(thread.replies.len(), 2);
    }
}
