//! Request field extraction.
//!
//! Clients send either JSON or url-encoded forms, and every operation must
//! answer with text even when the body is garbage. `Fields<T>` therefore never
//! rejects: an unreadable body becomes `T::default()` and the operation's own
//! validation decides what to say. `Board` does the same for the path segment.

use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::{Form, Json};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::convert::Infallible;

/// The `{board}` path segment, decoded.
///
/// A segment that does not decode to UTF-8 is decoded lossily from the raw
/// URI instead of rejecting the request.
#[derive(Debug, Clone)]
pub struct Board(pub String);

impl<S> FromRequestParts<S> for Board
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<String>::from_request_parts(parts, state).await {
            Ok(Path(board)) => Ok(Board(board)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "undecodable board segment");
                let raw = parts.uri.path().rsplit('/').next().unwrap_or_default();
                Ok(Board(percent_decode_str(raw).decode_utf8_lossy().into_owned()))
            }
        }
    }
}

pub struct Fields<T>(pub T);

impl<T, S> FromRequest<S> for Fields<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let parsed = if is_json {
            Json::<T>::from_request(req, state)
                .await
                .map(|Json(v)| v)
                .map_err(|e| e.body_text())
        } else {
            Form::<T>::from_request(req, state)
                .await
                .map(|Form(v)| v)
                .map_err(|e| e.body_text())
        };

        Ok(Fields(parsed.unwrap_or_else(|reason| {
            tracing::debug!(%reason, "unreadable request body, treating as empty");
            T::default()
        })))
    }
}

/// Form values arrive as `""` when a field is left blank; treat that as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Body of `POST /api/threads/{board}`.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadForm {
    pub text: Option<String>,
    pub delete_password: Option<String>,
}

/// Body of `PUT` and `DELETE /api/threads/{board}`.
#[derive(Debug, Default, Deserialize)]
pub struct ThreadTargetForm {
    pub thread_id: Option<String>,
    /// Older clients report threads under this name.
    pub report_id: Option<String>,
    pub delete_password: Option<String>,
}

impl ThreadTargetForm {
    pub fn thread_id(&self) -> Option<&str> {
        present(&self.thread_id)
    }

    pub fn report_target(&self) -> Option<&str> {
        present(&self.thread_id).or_else(|| present(&self.report_id))
    }
}

/// Body of every mutating request on `/api/replies/{board}`.
#[derive(Debug, Default, Deserialize)]
pub struct ReplyForm {
    pub thread_id: Option<String>,
    pub reply_id: Option<String>,
    pub text: Option<String>,
    pub delete_password: Option<String>,
}

impl ReplyForm {
    pub fn thread_id(&self) -> Option<&str> {
        present(&self.thread_id)
    }

    pub fn reply_id(&self) -> Option<&str> {
        present(&self.reply_id)
    }
}

/// Query of `GET /api/replies/{board}`.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub thread_id: Option<String>,
}

impl ViewQuery {
    pub fn thread_id(&self) -> Option<&str> {
        present(&self.thread_id)
    }
}
