use axum::{
    Json, debug_handler,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::{
    App,
    error::AppError,
    models::comment::CommentEdit,
    real_ip::{ClientIp, UserAgent},
    sanitize::strip_markup,
    tenant::CurrentSite,
    validation::{ValidationErrors, char_len},
};

use super::{CommentError, CommentView, MAX_CONTENT_LEN, authorize_mutation};

#[derive(Deserialize)]
pub struct CommentUpdate {
    #[serde(default)]
    password: String,
    #[serde(default)]
    content: String,
}

impl CommentUpdate {
    fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }

        let content = self.content.trim();
        if content.is_empty() {
            errors.add("content", "Content is required");
        } else if char_len(content) > MAX_CONTENT_LEN {
            errors.add(
                "content",
                format!("Content must be {MAX_CONTENT_LEN} characters or less"),
            );
        } else {
            self.content = strip_markup(content);
            if self.content.is_empty() {
                errors.add("content", "Content is required");
            }
        }

        errors.into_result()
    }
}

#[debug_handler(state = App)]
pub async fn update_comment(
    State(ctx): State<App>,
    CurrentSite(site): CurrentSite,
    Path(id): Path<i64>,
    ClientIp(ip): ClientIp,
    UserAgent(user_agent): UserAgent,
    crate::json::Json(mut update): crate::json::Json<CommentUpdate>,
) -> Result<Json<CommentView>, AppError> {
    update.validate()?;

    authorize_mutation(&ctx, &site, id, update.password).await?;

    let edit = CommentEdit {
        content: update.content,
        ip_address: ip,
        user_agent,
        updated_at: chrono::Utc::now().naive_utc(),
    };

    // a concurrent delete can win between the check and the write
    if !ctx.store.update_comment_content(id, edit).await? {
        return Err(CommentError::NotFound.into());
    }

    let updated = ctx
        .store
        .find_comment(id)
        .await?
        .ok_or(CommentError::NotFound)?;

    tracing::info!(site_id = site.id, comment_id = id, "Comment edited");

    Ok(Json(CommentView::from(&updated)))
}
