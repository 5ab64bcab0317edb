//! Storage seam. Handlers and the comment engine only ever see these traits,
//! `PgStore` backs them in production.

use async_trait::async_trait;
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::deadpool::PoolError;

use crate::models::{
    comment::{Comment, CommentEdit, NewComment},
    post::{NewPost, Post, PostSummary},
    site::{NewSite, Site, SiteChanges, SiteRole, SiteStats},
    user::{NewUser, User},
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("expected row is missing: {0}")]
    MissingRow(&'static str),

    #[error(transparent)]
    Query(diesel::result::Error),

    #[error("couldn't acquire a database connection: {0}")]
    Pool(#[from] PoolError),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation(info.message().to_owned())
            }
            e => StoreError::Query(e),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Only active sites are returned, an inactive site reads as unknown.
    async fn find_active_site_by_api_key(&self, api_key: &str) -> StoreResult<Option<Site>>;

    async fn find_site(&self, site_id: i64) -> StoreResult<Option<Site>>;

    /// Creates the site and the owner membership of `user_id` atomically.
    async fn create_site_for_user(&self, site: NewSite, user_id: i64) -> StoreResult<Site>;

    async fn update_site(&self, site_id: i64, changes: SiteChanges) -> StoreResult<Option<Site>>;

    /// Removes the site along with its posts, comments and memberships.
    async fn delete_site(&self, site_id: i64) -> StoreResult<bool>;

    /// Sites the user is a member of, newest first.
    async fn list_user_sites(&self, user_id: i64) -> StoreResult<Vec<Site>>;

    async fn add_site_member(&self, user_id: i64, site_id: i64, role: SiteRole)
    -> StoreResult<()>;

    async fn remove_site_member(&self, user_id: i64, site_id: i64) -> StoreResult<bool>;

    async fn list_site_members(&self, site_id: i64) -> StoreResult<Vec<User>>;

    async fn is_site_owner(&self, user_id: i64, site_id: i64) -> StoreResult<bool>;

    async fn site_stats(&self, site_id: i64) -> StoreResult<SiteStats>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>>;

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// A conflict on `(site_id, slug)` is not an error, the existing row wins.
    async fn insert_post_if_absent(&self, post: NewPost) -> StoreResult<()>;

    async fn find_post_by_slug(&self, site_id: i64, slug: &str) -> StoreResult<Option<Post>>;

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>>;

    async fn increment_comment_count(&self, post_id: i64) -> StoreResult<()>;

    /// Never lets the counter go below zero.
    async fn decrement_comment_count(&self, post_id: i64) -> StoreResult<()>;

    /// Posts of a site, newest first, plus the total number of posts.
    async fn list_site_posts(
        &self,
        site_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<PostSummary>, i64)>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn find_comment(&self, comment_id: i64) -> StoreResult<Option<Comment>>;

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    async fn count_top_level_comments(&self, post_id: i64) -> StoreResult<i64>;

    /// Ordered by `created_at` then `id`, both ascending.
    async fn list_top_level_comments(
        &self,
        post_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>>;

    /// Ordered by `created_at` then `id`, both ascending.
    async fn list_replies(&self, parent_id: i64) -> StoreResult<Vec<Comment>>;

    /// Returns false when the comment is missing or already deleted.
    async fn update_comment_content(&self, comment_id: i64, edit: CommentEdit)
    -> StoreResult<bool>;

    /// Returns false when the comment is missing or already deleted.
    async fn soft_delete_comment(&self, comment_id: i64) -> StoreResult<bool>;
}

pub trait Store: SiteStore + UserStore + PostStore + CommentStore {}

impl<T> Store for T where T: SiteStore + UserStore + PostStore + CommentStore {}
