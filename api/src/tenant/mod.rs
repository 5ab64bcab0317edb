//! Resolves the calling site from its API key and checks it may call us from
//! where it does. Every widget facing handler takes a `CurrentSite`.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};

use crate::{
    App,
    error::{ApiRequestError, AppError},
    models::site::Site,
};

pub mod cache;
pub mod origin;

pub use cache::TenantCache;

pub const API_KEY_HEADER: &str = "x-threadline-api-key";

#[derive(thiserror::Error, Debug)]
pub enum TenantAuthError {
    #[error("API key is required")]
    MissingApiKey,

    // unknown, expired and deactivated keys all end up here on purpose
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Site is not active")]
    SiteInactive,

    #[error("Origin is not allowed for this site")]
    OriginNotAllowed,
}

impl ApiRequestError for TenantAuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            TenantAuthError::MissingApiKey => StatusCode::UNAUTHORIZED,
            TenantAuthError::InvalidApiKey
            | TenantAuthError::SiteInactive
            | TenantAuthError::OriginNotAllowed => StatusCode::FORBIDDEN,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            TenantAuthError::MissingApiKey => "MISSING_API_KEY",
            TenantAuthError::InvalidApiKey => "INVALID_API_KEY",
            TenantAuthError::SiteInactive => "SITE_INACTIVE",
            TenantAuthError::OriginNotAllowed => "INVALID_ORIGIN",
        }
    }
}

/// The site the request was authorized for.
#[derive(Debug, Clone)]
pub struct CurrentSite(pub Arc<Site>);

async fn authorize(app: &App, headers: &HeaderMap) -> Result<Arc<Site>, AppError> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(TenantAuthError::MissingApiKey)?;

    let site = app
        .tenants
        .resolve(app.store.as_ref(), api_key)
        .await?
        .ok_or(TenantAuthError::InvalidApiKey)?;

    // the lookup filters on it already, but a cached copy can be older
    if !site.is_active {
        return Err(TenantAuthError::SiteInactive.into());
    }

    // server to server calls carry no Origin and skip the check
    if let Some(origin) = headers.get(header::ORIGIN) {
        let allowed = match origin.to_str() {
            Ok("") => true,
            Ok(origin) => origin::is_allowed(origin, &site.cors_origins),
            Err(_) => false,
        };

        if !allowed {
            return Err(TenantAuthError::OriginNotAllowed.into());
        }
    }

    Ok(site)
}

impl FromRequestParts<App> for CurrentSite {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        if let Some(site) = parts.extensions.get::<CurrentSite>() {
            return Ok(site.clone());
        }

        let site = authorize(app, &parts.headers).await.inspect_err(|e| {
            tracing::debug!(code = e.code(), "Rejected tenant request");
        })?;

        let site = CurrentSite(site);
        parts.extensions.insert(site.clone());

        Ok(site)
    }
}
