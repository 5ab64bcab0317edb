use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use futures::future::try_join_all;
use serde::Serialize;

use crate::{
    App,
    error::AppError,
    models::comment::CommentThread,
    pagination::{PageRequest, Pagination},
    tenant::CurrentSite,
};

use super::{CommentView, visible_threads};

#[derive(Serialize)]
pub struct CommentPage {
    comments: Vec<CommentView>,
    pagination: Pagination,
}

pub async fn get_comments(
    State(ctx): State<App>,
    CurrentSite(site): CurrentSite,
    Path(slug): Path<String>,
    Query(queries): Query<HashMap<String, String>>,
) -> Result<Json<CommentPage>, AppError> {
    let page = PageRequest::from_query(&queries);

    // reading never creates the post
    let Some(post) = ctx.store.find_post_by_slug(site.id, &slug).await? else {
        return Ok(Json(CommentPage {
            comments: vec![],
            pagination: Pagination::new(page, 0),
        }));
    };

    let total = ctx.store.count_top_level_comments(post.id).await?;
    let top_level = ctx
        .store
        .list_top_level_comments(post.id, page.limit, page.offset())
        .await?;

    let replies = try_join_all(top_level.iter().map(|c| ctx.store.list_replies(c.id))).await?;

    let threads = top_level
        .into_iter()
        .zip(replies)
        .map(|(comment, replies)| CommentThread { comment, replies })
        .collect();

    Ok(Json(CommentPage {
        comments: visible_threads(threads),
        pagination: Pagination::new(page, total),
    }))
}
