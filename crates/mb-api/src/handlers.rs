//! # mb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and `BoardService`.
//! Every outcome, failures included, is answered with a 2xx/3xx response;
//! callers tell results apart by the plain-text body.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mb_core::{AppError, BoardService, DeleteOutcome, NewPost};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tracing::warn;

use crate::extract::{Board, Fields, ReplyForm, ThreadForm, ThreadTargetForm, ViewQuery};

/// State shared across all request handlers.
pub struct AppState {
    pub service: BoardService,
}

type Shared = State<Arc<AppState>>;

const SUCCESS: &str = "success";
const INCORRECT_PASSWORD: &str = "incorrect password";
const REPORTED: &str = "reported";
const ERROR: &str = "error";

/// Bytes escaped when a value is placed in a `Location` path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 303 to `/b/{board}/` followed by any further segments, each percent-encoded.
fn see_other(board: &str, rest: Option<&str>) -> Response {
    let mut location = format!("/b/{}/", utf8_percent_encode(board, SEGMENT));
    if let Some(segment) = rest {
        location.push_str(&format!("{}/", utf8_percent_encode(segment, SEGMENT)));
    }
    match HeaderValue::try_from(location) {
        Ok(location) => (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response(),
        Err(err) => {
            warn!(%err, "unencodable redirect target");
            StatusCode::SEE_OTHER.into_response()
        }
    }
}

fn deletion_text(outcome: DeleteOutcome) -> &'static str {
    match outcome {
        DeleteOutcome::Deleted => SUCCESS,
        DeleteOutcome::IncorrectPassword => INCORRECT_PASSWORD,
    }
}

/// Maps a service failure to text. Not-found always names the entity; any
/// other failure gets the operation's fallback text.
fn failure_text(op: &str, err: AppError, fallback: &'static str) -> Response {
    match err.missing_entity() {
        Some(entity) => format!("{entity} not found").into_response(),
        None => {
            match &err {
                AppError::Internal(_) => warn!(op, %err, "store failure"),
                _ => tracing::debug!(op, %err, "rejected request"),
            }
            fallback.into_response()
        }
    }
}

// ── /api/threads/{board} ────────────────────────────────────────────────────

pub async fn create_thread(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ThreadForm>,
) -> Response {
    let post = NewPost {
        text: form.text,
        delete_password: form.delete_password,
    };
    match state.service.create_thread(&board, post).await {
        Ok(_) => see_other(&board, None),
        Err(err) => failure_text("create_thread", err, "Error creating thread"),
    }
}

pub async fn list_threads(State(state): Shared, Board(board): Board) -> Response {
    match state.service.list_recent(&board).await {
        Ok(threads) => Json(threads).into_response(),
        Err(err) => failure_text("list_threads", err, "Error getting threads"),
    }
}

/// Reporting never reveals whether the thread exists.
pub async fn report_thread(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ThreadTargetForm>,
) -> Response {
    match state.service.report_thread(&board, form.report_target()).await {
        Ok(()) => REPORTED.into_response(),
        Err(err) => failure_text("report_thread", err, ERROR),
    }
}

/// Malformed ids and store failures read as a wrong password.
pub async fn delete_thread(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ThreadTargetForm>,
) -> Response {
    let result = state
        .service
        .delete_thread(&board, form.thread_id(), form.delete_password.as_deref())
        .await;
    match result {
        Ok(outcome) => deletion_text(outcome).into_response(),
        Err(err) => failure_text("delete_thread", err, INCORRECT_PASSWORD),
    }
}

// ── /api/replies/{board} ────────────────────────────────────────────────────

pub async fn create_reply(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ReplyForm>,
) -> Response {
    let thread_id = form.thread_id().map(str::to_owned);
    let post = NewPost {
        text: form.text,
        delete_password: form.delete_password,
    };
    match state.service.create_reply(&board, thread_id.as_deref(), post).await {
        Ok(_) => see_other(&board, thread_id.as_deref()),
        Err(err) => failure_text("create_reply", err, "Error posting reply"),
    }
}

pub async fn view_thread(
    State(state): Shared,
    Board(board): Board,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    match state.service.view_thread(&board, query.thread_id()).await {
        Ok(thread) => Json(thread).into_response(),
        Err(err) => failure_text("view_thread", err, "Error getting thread"),
    }
}

pub async fn report_reply(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ReplyForm>,
) -> Response {
    match state
        .service
        .report_reply(&board, form.thread_id(), form.reply_id())
        .await
    {
        Ok(()) => SUCCESS.into_response(),
        Err(err) => failure_text("report_reply", err, ERROR),
    }
}

pub async fn delete_reply(
    State(state): Shared,
    Board(board): Board,
    Fields(form): Fields<ReplyForm>,
) -> Response {
    let result = state
        .service
        .delete_reply(
            &board,
            form.thread_id(),
            form.reply_id(),
            form.delete_password.as_deref(),
        )
        .await;
    match result {
        Ok(outcome) => deletion_text(outcome).into_response(),
        Err(err) => failure_text("delete_reply", err, INCORRECT_PASSWORD),
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}
