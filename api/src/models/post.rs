use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Debug, Serialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Post {
    pub id: i64,
    pub site_id: i64,
    pub slug: String,
    pub title: String,
    pub comment_count: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPost {
    pub site_id: i64,
    pub slug: String,
    pub title: String,
}

/// A post as listed on the admin surface, with its comments split by state.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PostSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub comment_count: i32,
    pub active_comments: i64,
    pub deleted_comments: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PostSummary {
    pub fn new(post: Post, active_comments: i64, deleted_comments: i64) -> Self {
        PostSummary {
            id: post.id,
            slug: post.slug,
            title: post.title,
            comment_count: post.comment_count,
            active_comments,
            deleted_comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}
