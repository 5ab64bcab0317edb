use chrono::NaiveDateTime;
use diesel::prelude::*;

// Never serialized directly: the secret hash, raw IP and user agent must go
// through one of the views in `crate::comment`.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_password: String,
    pub content: String,
    pub ip_address: String,
    pub user_agent: String,
    pub is_deleted: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::comments)]
pub struct NewComment {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_name: String,
    pub author_password: String,
    pub content: String,
    pub ip_address: String,
    pub user_agent: String,
}

/// The fields an edit replaces. The submission context is recorded as seen
/// at edit time.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::comments)]
pub struct CommentEdit {
    pub content: String,
    pub ip_address: String,
    pub user_agent: String,
    pub updated_at: NaiveDateTime,
}

/// A top-level comment together with its direct replies.
#[derive(Debug, Clone)]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<Comment>,
}
