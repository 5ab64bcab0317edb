use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    App,
    error::AppError,
    models::comment::NewComment,
    post::{bump_comment_count, resolve_post},
    ratelimit::CommentRateLimit,
    real_ip::{ClientIp, UserAgent},
    sanitize::strip_markup,
    tenant::CurrentSite,
    validation::{ValidationErrors, char_len},
};

use super::{
    CommentError, CommentView, MAX_AUTHOR_NAME_LEN, MAX_CONTENT_LEN, MAX_PASSWORD_LEN,
    MIN_PASSWORD_LEN,
};

#[debug_handler(state = App)]
pub async fn create_comment(
    State(ctx): State<App>,
    CurrentSite(site): CurrentSite,
    _: CommentRateLimit,
    Path(slug): Path<String>,
    ClientIp(ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    crate::json::Json(mut comment): crate::json::Json<CommentSubmission>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    comment.validate()?;

    let post = match comment.parent_id {
        // a reply needs a live thread, a rejected one leaves no post behind
        Some(parent_id) => {
            let post = ctx
                .store
                .find_post_by_slug(site.id, &slug)
                .await?
                .ok_or(CommentError::ParentNotFound)?;

            let parent = ctx
                .store
                .find_comment(parent_id)
                .await?
                .filter(|p| p.post_id == post.id)
                .ok_or(CommentError::ParentNotFound)?;

            if parent.parent_id.is_some() {
                return Err(CommentError::NestedReply.into());
            }

            post
        }
        // the slug doubles as the title until the site tells us otherwise
        None => resolve_post(ctx.store.as_ref(), site.id, &slug, &slug).await?,
    };

    let author_password = ctx.hasher.hash(comment.password).await?;

    let created = ctx
        .store
        .insert_comment(NewComment {
            post_id: post.id,
            parent_id: comment.parent_id,
            author_name: comment.author_name,
            author_password,
            content: comment.content,
            ip_address: ip,
            user_agent,
        })
        .await?;

    bump_comment_count(ctx.store.as_ref(), post.id).await;

    tracing::info!(
        site_id = site.id,
        post_id = post.id,
        comment_id = created.id,
        "Comment created"
    );

    Ok((StatusCode::CREATED, Json(CommentView::from(&created))))
}

#[derive(Deserialize)]
pub struct CommentSubmission {
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    content: String,
    parent_id: Option<i64>,
}

impl CommentSubmission {
    /// Checks every field and reports all problems at once. On success the
    /// name and content are trimmed and stripped of markup.
    fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.author_name.trim();
        if name.is_empty() {
            errors.add("author_name", "Author name is required");
        } else if char_len(name) > MAX_AUTHOR_NAME_LEN {
            errors.add(
                "author_name",
                format!("Author name must be {MAX_AUTHOR_NAME_LEN} characters or less"),
            );
        }

        let password_len = char_len(&self.password);
        if password_len < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        } else if password_len > MAX_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be {MAX_PASSWORD_LEN} characters or less"),
            );
        }

        let content = self.content.trim();
        if content.is_empty() {
            errors.add("content", "Content is required");
        } else if char_len(content) > MAX_CONTENT_LEN {
            errors.add(
                "content",
                format!("Content must be {MAX_CONTENT_LEN} characters or less"),
            );
        }

        if matches!(self.parent_id, Some(id) if id <= 0) {
            errors.add("parent_id", "Parent ID must be a positive integer");
        }

        errors.clone().into_result()?;

        self.author_name = strip_markup(&self.author_name);
        self.content = strip_markup(&self.content);

        // markup only input has nothing left to store
        if self.author_name.is_empty() {
            errors.add("author_name", "Author name is required");
        }
        if self.content.is_empty() {
            errors.add("content", "Content is required");
        }

        errors.into_result()
    }
}
