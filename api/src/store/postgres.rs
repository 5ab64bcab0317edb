use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
    pooled_connection::{
        AsyncDieselConnectionManager,
        deadpool::{BuildError, Pool},
    },
    scoped_futures::ScopedFutureExt,
};

use crate::{
    models::{
        comment::{Comment, CommentEdit, NewComment},
        post::{NewPost, Post, PostSummary},
        site::{NewSite, NewSiteMember, Site, SiteChanges, SiteRole, SiteStats},
        user::{NewUser, User},
    },
    schema::{comments, posts, sites, user_sites, users},
};

use super::{CommentStore, PostStore, SiteStore, StoreError, StoreResult, UserStore};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    pub fn connect(database_url: &str, max_connections: usize) -> Result<Self, BuildError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .runtime(deadpool_runtime::Runtime::Tokio1)
            .wait_timeout(Some(Duration::from_secs(10)))
            .create_timeout(Some(Duration::from_secs(10)))
            .recycle_timeout(Some(Duration::from_secs(120)))
            .build()?;

        Ok(PgStore { pool })
    }
}

fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

#[async_trait]
impl SiteStore for PgStore {
    async fn find_active_site_by_api_key(&self, api_key: &str) -> StoreResult<Option<Site>> {
        let mut conn = self.pool.get().await?;

        Ok(sites::table
            .filter(sites::api_key.eq(api_key))
            .filter(sites::is_active.eq(true))
            .select(Site::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn find_site(&self, site_id: i64) -> StoreResult<Option<Site>> {
        let mut conn = self.pool.get().await?;

        Ok(sites::table
            .find(site_id)
            .select(Site::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_site_for_user(&self, site: NewSite, user_id: i64) -> StoreResult<Site> {
        let mut conn = self.pool.get().await?;

        conn.transaction::<_, StoreError, _>(|conn| {
            async move {
                let site: Site = diesel::insert_into(sites::table)
                    .values(&site)
                    .returning(Site::as_returning())
                    .get_result(conn)
                    .await?;

                diesel::insert_into(user_sites::table)
                    .values(&NewSiteMember {
                        user_id,
                        site_id: site.id,
                        role: SiteRole::Owner.as_str(),
                    })
                    .execute(conn)
                    .await?;

                Ok(site)
            }
            .scope_boxed()
        })
        .await
    }

    async fn update_site(&self, site_id: i64, changes: SiteChanges) -> StoreResult<Option<Site>> {
        let mut conn = self.pool.get().await?;

        Ok(diesel::update(sites::table.find(site_id))
            .set((&changes, sites::updated_at.eq(now())))
            .returning(Site::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?)
    }

    async fn delete_site(&self, site_id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;

        // posts, comments and memberships go with it through ON DELETE CASCADE
        let deleted = diesel::delete(sites::table.find(site_id))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn list_user_sites(&self, user_id: i64) -> StoreResult<Vec<Site>> {
        let mut conn = self.pool.get().await?;

        Ok(user_sites::table
            .inner_join(sites::table)
            .filter(user_sites::user_id.eq(user_id))
            .order((sites::created_at.desc(), sites::id.desc()))
            .select(Site::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn add_site_member(
        &self,
        user_id: i64,
        site_id: i64,
        role: SiteRole,
    ) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(user_sites::table)
            .values(&NewSiteMember {
                user_id,
                site_id,
                role: role.as_str(),
            })
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn remove_site_member(&self, user_id: i64, site_id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;

        let removed = diesel::delete(
            user_sites::table
                .filter(user_sites::user_id.eq(user_id))
                .filter(user_sites::site_id.eq(site_id)),
        )
        .execute(&mut conn)
        .await?;

        Ok(removed > 0)
    }

    async fn list_site_members(&self, site_id: i64) -> StoreResult<Vec<User>> {
        let mut conn = self.pool.get().await?;

        Ok(user_sites::table
            .inner_join(users::table)
            .filter(user_sites::site_id.eq(site_id))
            .order((user_sites::created_at.asc(), users::id.asc()))
            .select(User::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn is_site_owner(&self, user_id: i64, site_id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;

        Ok(diesel::select(diesel::dsl::exists(
            user_sites::table
                .filter(user_sites::user_id.eq(user_id))
                .filter(user_sites::site_id.eq(site_id))
                .filter(user_sites::role.eq(SiteRole::Owner.as_str())),
        ))
        .get_result(&mut conn)
        .await?)
    }

    async fn site_stats(&self, site_id: i64) -> StoreResult<SiteStats> {
        let mut conn = self.pool.get().await?;

        let post_count: i64 = posts::table
            .filter(posts::site_id.eq(site_id))
            .count()
            .get_result(&mut conn)
            .await?;

        let comment_count: i64 = comments::table
            .inner_join(posts::table)
            .filter(posts::site_id.eq(site_id))
            .filter(comments::is_deleted.eq(false))
            .count()
            .get_result(&mut conn)
            .await?;

        let deleted_comment_count: i64 = comments::table
            .inner_join(posts::table)
            .filter(posts::site_id.eq(site_id))
            .filter(comments::is_deleted.eq(true))
            .count()
            .get_result(&mut conn)
            .await?;

        Ok(SiteStats {
            post_count,
            comment_count,
            deleted_comment_count,
        })
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let mut conn = self.pool.get().await?;

        Ok(users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>> {
        let mut conn = self.pool.get().await?;

        Ok(users::table
            .filter(users::google_id.eq(google_id))
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut conn = self.pool.get().await?;

        Ok(diesel::insert_into(users::table)
            .values(&user)
            .returning(User::as_returning())
            .get_result(&mut conn)
            .await?)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post_if_absent(&self, post: NewPost) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;

        diesel::insert_into(posts::table)
            .values(&post)
            .on_conflict((posts::site_id, posts::slug))
            .do_nothing()
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn find_post_by_slug(&self, site_id: i64, slug: &str) -> StoreResult<Option<Post>> {
        let mut conn = self.pool.get().await?;

        Ok(posts::table
            .filter(posts::site_id.eq(site_id))
            .filter(posts::slug.eq(slug))
            .select(Post::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        let mut conn = self.pool.get().await?;

        Ok(posts::table
            .find(post_id)
            .select(Post::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn increment_comment_count(&self, post_id: i64) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(posts::table.find(post_id))
            .set(posts::comment_count.eq(posts::comment_count + 1))
            .execute(&mut conn)
            .await?;

        if updated == 0 {
            return Err(StoreError::MissingRow("post"));
        }

        Ok(())
    }

    async fn decrement_comment_count(&self, post_id: i64) -> StoreResult<()> {
        let mut conn = self.pool.get().await?;

        diesel::update(
            posts::table
                .find(post_id)
                .filter(posts::comment_count.gt(0)),
        )
        .set(posts::comment_count.eq(posts::comment_count - 1))
        .execute(&mut conn)
        .await?;

        Ok(())
    }

    async fn list_site_posts(
        &self,
        site_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<PostSummary>, i64)> {
        let mut conn = self.pool.get().await?;

        let total: i64 = posts::table
            .filter(posts::site_id.eq(site_id))
            .count()
            .get_result(&mut conn)
            .await?;

        let page: Vec<Post> = posts::table
            .filter(posts::site_id.eq(site_id))
            .order((posts::created_at.desc(), posts::id.desc()))
            .limit(limit)
            .offset(offset)
            .select(Post::as_select())
            .load(&mut conn)
            .await?;

        let post_ids: Vec<i64> = page.iter().map(|p| p.id).collect();

        let counts: Vec<(i64, bool, i64)> = comments::table
            .filter(comments::post_id.eq_any(&post_ids))
            .group_by((comments::post_id, comments::is_deleted))
            .select((
                comments::post_id,
                comments::is_deleted,
                diesel::dsl::count_star(),
            ))
            .load(&mut conn)
            .await?;

        let mut breakdown: HashMap<i64, (i64, i64)> = HashMap::new();
        for (post_id, is_deleted, count) in counts {
            let entry = breakdown.entry(post_id).or_default();
            if is_deleted {
                entry.1 = count;
            } else {
                entry.0 = count;
            }
        }

        let summaries = page
            .into_iter()
            .map(|post| {
                let (active, deleted) = breakdown.get(&post.id).copied().unwrap_or_default();
                PostSummary::new(post, active, deleted)
            })
            .collect();

        Ok((summaries, total))
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn find_comment(&self, comment_id: i64) -> StoreResult<Option<Comment>> {
        let mut conn = self.pool.get().await?;

        Ok(comments::table
            .find(comment_id)
            .select(Comment::as_select())
            .first(&mut conn)
            .await
            .optional()?)
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut conn = self.pool.get().await?;

        Ok(diesel::insert_into(comments::table)
            .values(&comment)
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await?)
    }

    async fn count_top_level_comments(&self, post_id: i64) -> StoreResult<i64> {
        let mut conn = self.pool.get().await?;

        Ok(comments::table
            .filter(comments::post_id.eq(post_id))
            .filter(comments::parent_id.is_null())
            .count()
            .get_result(&mut conn)
            .await?)
    }

    async fn list_top_level_comments(
        &self,
        post_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let mut conn = self.pool.get().await?;

        Ok(comments::table
            .filter(comments::post_id.eq(post_id))
            .filter(comments::parent_id.is_null())
            .order((comments::created_at.asc(), comments::id.asc()))
            .limit(limit)
            .offset(offset)
            .select(Comment::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn list_replies(&self, parent_id: i64) -> StoreResult<Vec<Comment>> {
        let mut conn = self.pool.get().await?;

        Ok(comments::table
            .filter(comments::parent_id.eq(parent_id))
            .order((comments::created_at.asc(), comments::id.asc()))
            .select(Comment::as_select())
            .load(&mut conn)
            .await?)
    }

    async fn update_comment_content(
        &self,
        comment_id: i64,
        edit: CommentEdit,
    ) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(
            comments::table
                .find(comment_id)
                .filter(comments::is_deleted.eq(false)),
        )
        .set(&edit)
        .execute(&mut conn)
        .await?;

        Ok(updated > 0)
    }

    async fn soft_delete_comment(&self, comment_id: i64) -> StoreResult<bool> {
        let mut conn = self.pool.get().await?;

        let updated = diesel::update(
            comments::table
                .find(comment_id)
                .filter(comments::is_deleted.eq(false)),
        )
        .set((
            comments::is_deleted.eq(true),
            comments::deleted_at.eq(now()),
        ))
        .execute(&mut conn)
        .await?;

        Ok(updated > 0)
    }
}
