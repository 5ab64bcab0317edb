use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{
    comment::{Comment, CommentEdit, NewComment},
    post::{NewPost, Post, PostSummary},
    site::{NewSite, Site, SiteChanges, SiteRole, SiteStats},
    user::{NewUser, User},
};

use super::{CommentStore, PostStore, SiteStore, StoreError, StoreResult, UserStore};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    sites: Vec<Site>,
    members: Vec<(i64, i64, SiteRole)>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Same contract as `PgStore`, kept in process memory for tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    api_key_lookups: AtomicUsize,
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    /// How many times the api key lookup reached storage.
    pub fn api_key_lookups(&self) -> usize {
        self.api_key_lookups.load(Ordering::SeqCst)
    }

    pub fn seed_user(&self, google_id: &str, email: &str) -> User {
        let mut t = self.tables();
        let ts = now();
        let user = User {
            id: t.next_id(),
            email: email.into(),
            name: email.split('@').next().unwrap_or(email).into(),
            picture_url: String::new(),
            google_id: google_id.into(),
            created_at: ts,
            updated_at: ts,
        };
        t.users.push(user.clone());
        user
    }

    pub fn seed_site(&self, api_key: &str, origins: &[&str]) -> Site {
        let mut t = self.tables();
        let ts = now();
        let site = Site {
            id: t.next_id(),
            name: format!("site for {api_key}"),
            domain: "blog.example.com".into(),
            api_key: api_key.into(),
            cors_origins: origins.iter().map(|o| o.to_string()).collect(),
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };
        t.sites.push(site.clone());
        site
    }

    pub fn set_site_active(&self, site_id: i64, active: bool) {
        if let Some(site) = self.tables().sites.iter_mut().find(|s| s.id == site_id) {
            site.is_active = active;
        }
    }

    /// Moves a comment's creation time into the past.
    pub fn backdate_comment(&self, comment_id: i64, by: chrono::Duration) {
        if let Some(c) = self
            .tables()
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
        {
            c.created_at -= by;
        }
    }

    pub fn post_count(&self) -> usize {
        self.tables().posts.len()
    }
}

fn by_creation(a: &Comment, b: &Comment) -> std::cmp::Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn find_active_site_by_api_key(&self, api_key: &str) -> StoreResult<Option<Site>> {
        self.api_key_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .tables()
            .sites
            .iter()
            .find(|s| s.api_key == api_key && s.is_active)
            .cloned())
    }

    async fn find_site(&self, site_id: i64) -> StoreResult<Option<Site>> {
        Ok(self.tables().sites.iter().find(|s| s.id == site_id).cloned())
    }

    async fn create_site_for_user(&self, site: NewSite, user_id: i64) -> StoreResult<Site> {
        let mut t = self.tables();
        if t.sites.iter().any(|s| s.api_key == site.api_key) {
            return Err(StoreError::UniqueViolation("sites_api_key_key".into()));
        }
        let ts = now();
        let site = Site {
            id: t.next_id(),
            name: site.name,
            domain: site.domain,
            api_key: site.api_key,
            cors_origins: site.cors_origins,
            is_active: site.is_active,
            created_at: ts,
            updated_at: ts,
        };
        t.sites.push(site.clone());
        t.members.push((user_id, site.id, SiteRole::Owner));
        Ok(site)
    }

    async fn update_site(&self, site_id: i64, changes: SiteChanges) -> StoreResult<Option<Site>> {
        let mut t = self.tables();
        let Some(site) = t.sites.iter_mut().find(|s| s.id == site_id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            site.name = name;
        }
        if let Some(origins) = changes.cors_origins {
            site.cors_origins = origins;
        }
        if let Some(active) = changes.is_active {
            site.is_active = active;
        }
        site.updated_at = now();
        Ok(Some(site.clone()))
    }

    async fn delete_site(&self, site_id: i64) -> StoreResult<bool> {
        let mut t = self.tables();
        let before = t.sites.len();
        t.sites.retain(|s| s.id != site_id);
        if t.sites.len() == before {
            return Ok(false);
        }
        let post_ids: Vec<i64> = t
            .posts
            .iter()
            .filter(|p| p.site_id == site_id)
            .map(|p| p.id)
            .collect();
        t.posts.retain(|p| p.site_id != site_id);
        t.comments.retain(|c| !post_ids.contains(&c.post_id));
        t.members.retain(|(_, s, _)| *s != site_id);
        Ok(true)
    }

    async fn list_user_sites(&self, user_id: i64) -> StoreResult<Vec<Site>> {
        let t = self.tables();
        let mut sites: Vec<Site> = t
            .sites
            .iter()
            .filter(|s| t.members.iter().any(|(u, id, _)| *u == user_id && *id == s.id))
            .cloned()
            .collect();
        sites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sites)
    }

    async fn add_site_member(
        &self,
        user_id: i64,
        site_id: i64,
        role: SiteRole,
    ) -> StoreResult<()> {
        let mut t = self.tables();
        if t.members.iter().any(|(u, s, _)| *u == user_id && *s == site_id) {
            return Err(StoreError::UniqueViolation("user_sites_pkey".into()));
        }
        t.members.push((user_id, site_id, role));
        Ok(())
    }

    async fn remove_site_member(&self, user_id: i64, site_id: i64) -> StoreResult<bool> {
        let mut t = self.tables();
        let before = t.members.len();
        t.members.retain(|(u, s, _)| !(*u == user_id && *s == site_id));
        Ok(t.members.len() < before)
    }

    async fn list_site_members(&self, site_id: i64) -> StoreResult<Vec<User>> {
        let t = self.tables();
        Ok(t.members
            .iter()
            .filter(|(_, s, _)| *s == site_id)
            .filter_map(|(u, _, _)| t.users.iter().find(|user| user.id == *u).cloned())
            .collect())
    }

    async fn is_site_owner(&self, user_id: i64, site_id: i64) -> StoreResult<bool> {
        Ok(self
            .tables()
            .members
            .iter()
            .any(|(u, s, r)| *u == user_id && *s == site_id && *r == SiteRole::Owner))
    }

    async fn site_stats(&self, site_id: i64) -> StoreResult<SiteStats> {
        let t = self.tables();
        let post_ids: Vec<i64> = t
            .posts
            .iter()
            .filter(|p| p.site_id == site_id)
            .map(|p| p.id)
            .collect();
        let site_comments = t.comments.iter().filter(|c| post_ids.contains(&c.post_id));
        let deleted = site_comments.clone().filter(|c| c.is_deleted).count() as i64;
        let total = site_comments.count() as i64;
        Ok(SiteStats {
            post_count: post_ids.len() as i64,
            comment_count: total - deleted,
            deleted_comment_count: deleted,
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_user_by_google_id(&self, google_id: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.google_id == google_id)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables();
        if t
            .users
            .iter()
            .any(|u| u.email == user.email || u.google_id == user.google_id)
        {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let ts = now();
        let user = User {
            id: t.next_id(),
            email: user.email,
            name: user.name,
            picture_url: user.picture_url,
            google_id: user.google_id,
            created_at: ts,
            updated_at: ts,
        };
        t.users.push(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post_if_absent(&self, post: NewPost) -> StoreResult<()> {
        let mut t = self.tables();
        if t
            .posts
            .iter()
            .any(|p| p.site_id == post.site_id && p.slug == post.slug)
        {
            return Ok(());
        }
        let ts = now();
        let post = Post {
            id: t.next_id(),
            site_id: post.site_id,
            slug: post.slug,
            title: post.title,
            comment_count: 0,
            created_at: ts,
            updated_at: ts,
        };
        t.posts.push(post);
        Ok(())
    }

    async fn find_post_by_slug(&self, site_id: i64, slug: &str) -> StoreResult<Option<Post>> {
        Ok(self
            .tables()
            .posts
            .iter()
            .find(|p| p.site_id == site_id && p.slug == slug)
            .cloned())
    }

    async fn find_post(&self, post_id: i64) -> StoreResult<Option<Post>> {
        Ok(self.tables().posts.iter().find(|p| p.id == post_id).cloned())
    }

    async fn increment_comment_count(&self, post_id: i64) -> StoreResult<()> {
        let mut t = self.tables();
        let post = t
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or(StoreError::MissingRow("post"))?;
        post.comment_count += 1;
        Ok(())
    }

    async fn decrement_comment_count(&self, post_id: i64) -> StoreResult<()> {
        if let Some(post) = self.tables().posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_count = (post.comment_count - 1).max(0);
        }
        Ok(())
    }

    async fn list_site_posts(
        &self,
        site_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<PostSummary>, i64)> {
        let t = self.tables();
        let mut posts: Vec<&Post> = t.posts.iter().filter(|p| p.site_id == site_id).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = posts.len() as i64;
        let page = posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|p| {
                let of_post = t.comments.iter().filter(|c| c.post_id == p.id);
                let deleted = of_post.clone().filter(|c| c.is_deleted).count() as i64;
                let active = of_post.count() as i64 - deleted;
                PostSummary::new(p.clone(), active, deleted)
            })
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn find_comment(&self, comment_id: i64) -> StoreResult<Option<Comment>> {
        Ok(self
            .tables()
            .comments
            .iter()
            .find(|c| c.id == comment_id)
            .cloned())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut t = self.tables();
        let ts = now();
        let comment = Comment {
            id: t.next_id(),
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_name: comment.author_name,
            author_password: comment.author_password,
            content: comment.content,
            ip_address: comment.ip_address,
            user_agent: comment.user_agent,
            is_deleted: false,
            created_at: ts,
            updated_at: ts,
            deleted_at: None,
        };
        t.comments.push(comment.clone());
        Ok(comment)
    }

    async fn count_top_level_comments(&self, post_id: i64) -> StoreResult<i64> {
        Ok(self
            .tables()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .count() as i64)
    }

    async fn list_top_level_comments(
        &self,
        post_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Comment>> {
        let mut top: Vec<Comment> = self
            .tables()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id && c.parent_id.is_none())
            .cloned()
            .collect();
        top.sort_by(by_creation);
        Ok(top
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_replies(&self, parent_id: i64) -> StoreResult<Vec<Comment>> {
        let mut replies: Vec<Comment> = self
            .tables()
            .comments
            .iter()
            .filter(|c| c.parent_id == Some(parent_id))
            .cloned()
            .collect();
        replies.sort_by(by_creation);
        Ok(replies)
    }

    async fn update_comment_content(
        &self,
        comment_id: i64,
        edit: CommentEdit,
    ) -> StoreResult<bool> {
        let mut t = self.tables();
        let Some(c) = t
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id && !c.is_deleted)
        else {
            return Ok(false);
        };
        c.content = edit.content;
        c.ip_address = edit.ip_address;
        c.user_agent = edit.user_agent;
        c.updated_at = edit.updated_at;
        Ok(true)
    }

    async fn soft_delete_comment(&self, comment_id: i64) -> StoreResult<bool> {
        let mut t = self.tables();
        let Some(c) = t
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id && !c.is_deleted)
        else {
            return Ok(false);
        };
        c.is_deleted = true;
        c.deleted_at = Some(now());
        Ok(true)
    }
}
