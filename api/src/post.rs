use crate::{
    models::post::{NewPost, Post},
    store::{PostStore, StoreError, StoreResult},
};

/// Get-or-create for the post a comment is submitted to. Safe under
/// concurrent first use of a slug: the insert is a no-op on conflict and
/// every caller reads back the single surviving row.
pub async fn resolve_post<S>(store: &S, site_id: i64, slug: &str, title: &str) -> StoreResult<Post>
where
    S: PostStore + ?Sized,
{
    store
        .insert_post_if_absent(NewPost {
            site_id,
            slug: slug.to_owned(),
            title: title.to_owned(),
        })
        .await?;

    store
        .find_post_by_slug(site_id, slug)
        .await?
        .ok_or(StoreError::MissingRow("post after get-or-create"))
}

/// Counter maintenance happens after the comment write already succeeded, so
/// failures are only logged.
pub async fn bump_comment_count<S>(store: &S, post_id: i64)
where
    S: PostStore + ?Sized,
{
    if let Err(error) = store.increment_comment_count(post_id).await {
        tracing::error!(post_id, %error, "Failed to increment comment count");
    }
}

pub async fn drop_comment_count<S>(store: &S, post_id: i64)
where
    S: PostStore + ?Sized,
{
    if let Err(error) = store.decrement_comment_count(post_id).await {
        tracing::error!(post_id, %error, "Failed to decrement comment count");
    }
}
