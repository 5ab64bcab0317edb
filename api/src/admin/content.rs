use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::NaiveDateTime;
use futures::future::try_join_all;
use serde::Serialize;

use crate::{
    App,
    error::AppError,
    identity::AdminUser,
    models::{comment::Comment, post::PostSummary},
    pagination::{PageRequest, Pagination},
    privacy::mask_ip,
};

use super::{SiteError, owned_site};

#[derive(Serialize)]
pub struct PostPage {
    posts: Vec<PostSummary>,
    pagination: Pagination,
}

/// Everything the owner may see about a comment, deleted or not. The secret
/// hash is still left out.
#[derive(Serialize, Debug)]
pub struct AdminCommentView {
    id: i64,
    post_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<i64>,
    author_name: String,
    content: String,
    ip_address: String,
    ip_address_masked: String,
    user_agent: String,
    is_deleted: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replies: Option<Vec<AdminCommentView>>,
}

impl From<Comment> for AdminCommentView {
    fn from(c: Comment) -> Self {
        AdminCommentView {
            id: c.id,
            post_id: c.post_id,
            parent_id: c.parent_id,
            author_name: c.author_name,
            content: c.content,
            ip_address_masked: mask_ip(&c.ip_address),
            ip_address: c.ip_address,
            user_agent: c.user_agent,
            is_deleted: c.is_deleted,
            created_at: c.created_at,
            updated_at: c.updated_at,
            deleted_at: c.deleted_at,
            replies: None,
        }
    }
}

#[derive(Serialize)]
pub struct AdminCommentPage {
    comments: Vec<AdminCommentView>,
    pagination: Pagination,
}

pub async fn list_site_posts(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
    Query(queries): Query<HashMap<String, String>>,
) -> Result<Json<PostPage>, AppError> {
    let site = owned_site(&ctx, &user, site_id).await?;
    let page = PageRequest::from_query(&queries);

    let (posts, total) = ctx
        .store
        .list_site_posts(site.id, page.limit, page.offset())
        .await?;

    Ok(Json(PostPage {
        posts,
        pagination: Pagination::new(page, total),
    }))
}

pub async fn list_post_comments(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path((site_id, post_id)): Path<(i64, i64)>,
    Query(queries): Query<HashMap<String, String>>,
) -> Result<Json<AdminCommentPage>, AppError> {
    let site = owned_site(&ctx, &user, site_id).await?;
    let page = PageRequest::from_query(&queries);

    let post = ctx
        .store
        .find_post(post_id)
        .await?
        .filter(|p| p.site_id == site.id)
        .ok_or(SiteError::PostNotFound)?;

    let total = ctx.store.count_top_level_comments(post.id).await?;
    let top_level = ctx
        .store
        .list_top_level_comments(post.id, page.limit, page.offset())
        .await?;

    let replies = try_join_all(top_level.iter().map(|c| ctx.store.list_replies(c.id))).await?;

    let comments = top_level
        .into_iter()
        .zip(replies)
        .map(|(comment, replies)| {
            let mut view = AdminCommentView::from(comment);
            view.replies = Some(replies.into_iter().map(AdminCommentView::from).collect());
            view
        })
        .collect();

    Ok(Json(AdminCommentPage {
        comments,
        pagination: Pagination::new(page, total),
    }))
}
