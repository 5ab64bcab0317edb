use axum::{
    Json, debug_handler,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    App,
    crypto::generate_api_key,
    error::AppError,
    identity::AdminUser,
    models::{
        site::{NewSite, Site, SiteChanges, SiteStats},
        user::User,
    },
    validation::ValidationErrors,
};

use super::{SiteError, owned_site, require_owner, validate_name, validate_origins};

#[derive(Deserialize)]
pub struct CreateSite {
    #[serde(default)]
    name: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    cors_origins: Vec<String>,
}

impl CreateSite {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validate_name(&self.name, &mut errors);
        if self.domain.trim().is_empty() {
            errors.add("domain", "Domain is required");
        }
        validate_origins(&self.cors_origins, &mut errors);
        errors.into_result()
    }
}

/// Absent fields stay as they are. `domain` and `api_key` cannot change.
#[derive(Deserialize)]
pub struct UpdateSite {
    name: Option<String>,
    cors_origins: Option<Vec<String>>,
    is_active: Option<bool>,
}

impl UpdateSite {
    fn into_changes(self) -> Result<SiteChanges, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            validate_name(name, &mut errors);
        }
        if let Some(origins) = &self.cors_origins {
            validate_origins(origins, &mut errors);
        }
        errors.into_result()?;

        Ok(SiteChanges {
            name: self.name.map(|n| n.trim().to_owned()),
            cors_origins: self.cors_origins.map(trim_all),
            is_active: self.is_active,
        })
    }
}

fn trim_all(origins: Vec<String>) -> Vec<String> {
    origins.into_iter().map(|o| o.trim().to_owned()).collect()
}

pub async fn list_sites(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
) -> Result<Json<Vec<Site>>, AppError> {
    Ok(Json(ctx.store.list_user_sites(user.id).await?))
}

#[debug_handler(state = App)]
pub async fn create_site(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    crate::json::Json(req): crate::json::Json<CreateSite>,
) -> Result<(StatusCode, Json<Site>), AppError> {
    req.validate()?;

    let site = NewSite {
        name: req.name.trim().to_owned(),
        domain: req.domain.trim().to_owned(),
        api_key: generate_api_key(ctx.config.env),
        cors_origins: trim_all(req.cors_origins),
        is_active: true,
    };

    let site = ctx.store.create_site_for_user(site, user.id).await?;

    tracing::info!(user_id = user.id, site_id = site.id, "Site created");

    Ok((StatusCode::CREATED, Json(site)))
}

pub async fn get_site(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
) -> Result<Json<Site>, AppError> {
    Ok(Json(owned_site(&ctx, &user, site_id).await?))
}

#[debug_handler(state = App)]
pub async fn update_site(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
    crate::json::Json(req): crate::json::Json<UpdateSite>,
) -> Result<Json<Site>, AppError> {
    require_owner(&ctx, &user, site_id).await?;

    let changes = req.into_changes()?;
    let site = ctx
        .store
        .update_site(site_id, changes)
        .await?
        .ok_or(SiteError::NotFound)?;

    ctx.tenants.forget(&site.api_key).await;

    tracing::info!(user_id = user.id, site_id, "Site updated");

    Ok(Json(site))
}

pub async fn delete_site(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_owner(&ctx, &user, site_id).await?;

    let site = ctx
        .store
        .find_site(site_id)
        .await?
        .ok_or(SiteError::NotFound)?;

    if !ctx.store.delete_site(site_id).await? {
        return Err(SiteError::NotFound.into());
    }

    ctx.tenants.forget(&site.api_key).await;

    tracing::info!(user_id = user.id, site_id, "Site deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_site_stats(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
) -> Result<Json<SiteStats>, AppError> {
    let site = owned_site(&ctx, &user, site_id).await?;
    Ok(Json(ctx.store.site_stats(site.id).await?))
}

pub async fn list_site_members(
    State(ctx): State<App>,
    AdminUser(user): AdminUser,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<User>>, AppError> {
    let site = owned_site(&ctx, &user, site_id).await?;
    Ok(Json(ctx.store.list_site_members(site.id).await?))
}
