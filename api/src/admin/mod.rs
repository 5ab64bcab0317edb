//! Site owner surface. Every handler here runs behind `AdminUser`.

use axum::http::StatusCode;
use url::Url;

use crate::{
    App,
    error::{ApiRequestError, AppError},
    models::{site::Site, user::User},
    validation::{ValidationErrors, char_len},
};

pub mod content;
pub mod routes;
pub mod sites;

pub const MAX_SITE_NAME_LEN: usize = 100;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SiteError {
    #[error("Site not found")]
    NotFound,

    #[error("Post not found")]
    PostNotFound,

    #[error("You don't own this site")]
    Forbidden,
}

impl ApiRequestError for SiteError {
    fn status_code(&self) -> StatusCode {
        match self {
            SiteError::NotFound | SiteError::PostNotFound => StatusCode::NOT_FOUND,
            SiteError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SiteError::NotFound => "SITE_NOT_FOUND",
            SiteError::PostNotFound => "POST_NOT_FOUND",
            SiteError::Forbidden => "FORBIDDEN",
        }
    }
}

/// For reads: a site the user doesn't own looks like it doesn't exist.
async fn owned_site(ctx: &App, user: &User, site_id: i64) -> Result<Site, AppError> {
    if !ctx.store.is_site_owner(user.id, site_id).await? {
        return Err(SiteError::NotFound.into());
    }

    Ok(ctx
        .store
        .find_site(site_id)
        .await?
        .ok_or(SiteError::NotFound)?)
}

/// For mutations: anything but ownership is refused outright.
async fn require_owner(ctx: &App, user: &User, site_id: i64) -> Result<(), AppError> {
    if !ctx.store.is_site_owner(user.id, site_id).await? {
        tracing::warn!(user_id = user.id, site_id, "Site mutation by non-owner");
        return Err(SiteError::Forbidden.into());
    }
    Ok(())
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    let name = name.trim();
    if name.is_empty() {
        errors.add("name", "Name is required");
    } else if char_len(name) > MAX_SITE_NAME_LEN {
        errors.add(
            "name",
            format!("Name must be {MAX_SITE_NAME_LEN} characters or less"),
        );
    }
}

fn validate_origins(origins: &[String], errors: &mut ValidationErrors) {
    if origins.is_empty() {
        errors.add("cors_origins", "At least one allowed origin is required");
        return;
    }

    let invalid = origins.iter().find(|origin| {
        Url::parse(origin.trim())
            .map(|url| !matches!(url.scheme(), "http" | "https") || url.host_str().is_none())
            .unwrap_or(true)
    });

    if let Some(origin) = invalid {
        errors.add(
            "cors_origins",
            format!("`{origin}` is not a valid http(s) origin"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origins(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn names_are_trimmed_and_bounded() {
        let mut errors = ValidationErrors::new();
        validate_name("   ", &mut errors);
        assert!(errors.get("name").is_some());

        let mut errors = ValidationErrors::new();
        validate_name(&"x".repeat(101), &mut errors);
        assert!(errors.get("name").is_some());

        let mut errors = ValidationErrors::new();
        validate_name("  My blog  ", &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn origins_must_be_http_urls_with_a_host() {
        for bad in [
            origins(&[]),
            origins(&["blog.example.com"]),
            origins(&["ftp://blog.example.com"]),
            origins(&["https://ok.example.com", "javascript:alert(1)"]),
        ] {
            let mut errors = ValidationErrors::new();
            validate_origins(&bad, &mut errors);
            assert!(errors.get("cors_origins").is_some(), "{bad:?}");
        }

        let mut errors = ValidationErrors::new();
        validate_origins(
            &origins(&["https://blog.example.com", "http://localhost:3000"]),
            &mut errors,
        );
        assert!(errors.is_empty());
    }
}
