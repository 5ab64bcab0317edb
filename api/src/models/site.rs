use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;

#[derive(Queryable, Selectable, Debug, Serialize, Clone, PartialEq)]
#[diesel(table_name = crate::schema::sites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub domain: String,
    pub api_key: String,
    pub cors_origins: Vec<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::sites)]
pub struct NewSite {
    pub name: String,
    pub domain: String,
    pub api_key: String,
    pub cors_origins: Vec<String>,
    pub is_active: bool,
}

/// Only these fields may change once a site exists. `domain` and `api_key`
/// are fixed at creation.
#[derive(AsChangeset, Debug, Default, Clone)]
#[diesel(table_name = crate::schema::sites)]
pub struct SiteChanges {
    pub name: Option<String>,
    pub cors_origins: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteRole {
    Owner,
}

impl SiteRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteRole::Owner => "owner",
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::user_sites)]
pub struct NewSiteMember<'a> {
    pub user_id: i64,
    pub site_id: i64,
    pub role: &'a str,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub struct SiteStats {
    pub post_count: i64,
    pub comment_count: i64,
    pub deleted_comment_count: i64,
}
