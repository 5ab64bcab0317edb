pub mod create;
pub mod delete;
pub mod get;
pub mod patch;
pub mod routes;

use axum::http::StatusCode;
use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    models::{
        comment::{Comment, CommentThread},
        site::Site,
    },
    privacy::mask_ip,
};

pub const MAX_AUTHOR_NAME_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 4;
pub const MAX_PASSWORD_LEN: usize = 50;
pub const MAX_CONTENT_LEN: usize = 10_000;

/// Comments can be edited or deleted by their author for this long.
pub const EDIT_WINDOW_MINUTES: i64 = 30;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum CommentError {
    #[error("Comment not found")]
    NotFound,

    #[error("Parent comment not found")]
    ParentNotFound,

    #[error("Nested replies are not allowed (max depth is 1)")]
    NestedReply,

    #[error("Wrong password")]
    WrongPassword,

    #[error("Comments can only be changed within {EDIT_WINDOW_MINUTES} minutes of posting")]
    EditWindowExpired,
}

impl ApiRequestError for CommentError {
    fn status_code(&self) -> StatusCode {
        match self {
            CommentError::NotFound | CommentError::ParentNotFound => StatusCode::NOT_FOUND,
            CommentError::NestedReply => StatusCode::BAD_REQUEST,
            CommentError::WrongPassword | CommentError::EditWindowExpired => StatusCode::FORBIDDEN,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CommentError::NotFound | CommentError::ParentNotFound => "COMMENT_NOT_FOUND",
            CommentError::NestedReply => "NESTED_REPLY_NOT_ALLOWED",
            CommentError::WrongPassword => "WRONG_PASSWORD",
            CommentError::EditWindowExpired => "EDIT_TIME_EXPIRED",
        }
    }
}

/// A comment as the widget sees it. The submitter address only appears
/// masked, the secret hash and user agent never.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub content: String,
    pub ip_address_masked: String,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<Vec<CommentView>>,
}

impl From<&Comment> for CommentView {
    fn from(c: &Comment) -> Self {
        CommentView {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            author_name: c.author_name.clone(),
            content: c.content.clone(),
            ip_address_masked: mask_ip(&c.ip_address),
            is_deleted: c.is_deleted,
            created_at: c.created_at,
            updated_at: c.updated_at,
            deleted_at: c.deleted_at,
            replies: None,
        }
    }
}

/// Read time visibility. A deleted top-level comment that has replies stays,
/// blanked, so the thread keeps its shape, even when those replies are deleted
/// too. Deleted replies have no replies of their own and are left out.
pub fn visible_threads(threads: Vec<CommentThread>) -> Vec<CommentView> {
    threads
        .into_iter()
        .filter_map(|thread| {
            if thread.comment.is_deleted && thread.replies.is_empty() {
                return None;
            }

            let replies: Vec<CommentView> = thread
                .replies
                .iter()
                .filter(|r| !r.is_deleted)
                .map(CommentView::from)
                .collect();

            let mut view = CommentView::from(&thread.comment);
            if view.is_deleted {
                view.author_name.clear();
                view.content.clear();
            }
            view.replies = Some(replies);
            Some(view)
        })
        .collect()
}

pub fn within_edit_window(created_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    now - created_at <= TimeDelta::minutes(EDIT_WINDOW_MINUTES)
}

/// Loads a live comment of `site` and checks the caller may still change it.
/// Comments of other sites are reported as missing.
async fn authorize_mutation(
    ctx: &App,
    site: &Site,
    comment_id: i64,
    password: String,
) -> Result<Comment, AppError> {
    let comment = ctx
        .store
        .find_comment(comment_id)
        .await?
        .filter(|c| !c.is_deleted)
        .ok_or(CommentError::NotFound)?;

    let post = ctx
        .store
        .find_post(comment.post_id)
        .await?
        .ok_or(CommentError::NotFound)?;

    if post.site_id != site.id {
        tracing::debug!(
            site_id = site.id,
            comment_id,
            "Comment belongs to another site"
        );
        return Err(CommentError::NotFound.into());
    }

    if !within_edit_window(comment.created_at, chrono::Utc::now().naive_utc()) {
        return Err(CommentError::EditWindowExpired.into());
    }

    if !ctx
        .hasher
        .verify(password, comment.author_password.clone())
        .await?
    {
        return Err(CommentError::WrongPassword.into());
    }

    Ok(comment)
}
