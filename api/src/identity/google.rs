use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Deserialize;

use crate::error::{ApiRequestError, AppError};

const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(thiserror::Error, Debug)]
pub enum GoogleAuthError {
    #[error("Invalid Google ID token")]
    InvalidIdToken,
}

impl ApiRequestError for GoogleAuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn code(&self) -> &'static str {
        "INVALID_ID_TOKEN"
    }
}

/// The parts of a verified ID token we rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: Option<String>,
}

#[async_trait]
pub trait IdTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError>;
}

/// Verifies ID tokens with Google's `tokeninfo` endpoint.
pub struct GoogleTokenInfo {
    http: reqwest::Client,
    client_id: Option<String>,
}

#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
}

impl GoogleTokenInfo {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        GoogleTokenInfo { http, client_id }
    }
}

#[async_trait]
impl IdTokenVerifier for GoogleTokenInfo {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or("Google sign-in is not configured, set GOOGLE_CLIENT_ID")?;

        let res = self
            .http
            .get(TOKEN_INFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await?;

        // Google answers 400 for anything it does not accept
        if res.status().is_client_error() {
            return Err(GoogleAuthError::InvalidIdToken.into());
        }

        let info: TokenInfo = res.error_for_status()?.json().await?;

        if info.aud != client_id || info.sub.is_empty() {
            tracing::warn!(aud = %info.aud, "ID token was issued for another client");
            return Err(GoogleAuthError::InvalidIdToken.into());
        }

        Ok(GoogleIdentity {
            google_id: info.sub,
            email: info.email,
        })
    }
}
