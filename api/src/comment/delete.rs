use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    App, error::AppError, post::drop_comment_count, tenant::CurrentSite,
    validation::ValidationErrors,
};

use super::{CommentError, authorize_mutation};

#[derive(Deserialize)]
pub struct CommentDeletion {
    #[serde(default)]
    password: String,
}

#[debug_handler(state = App)]
pub async fn delete_comment(
    State(ctx): State<App>,
    CurrentSite(site): CurrentSite,
    Path(id): Path<i64>,
    crate::json::Json(deletion): crate::json::Json<CommentDeletion>,
) -> Result<StatusCode, AppError> {
    if deletion.password.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("password", "Password is required");
        return Err(errors.into());
    }

    let comment = authorize_mutation(&ctx, &site, id, deletion.password).await?;

    if !ctx.store.soft_delete_comment(id).await? {
        return Err(CommentError::NotFound.into());
    }

    drop_comment_count(ctx.store.as_ref(), comment.post_id).await;

    tracing::info!(site_id = site.id, comment_id = id, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}
