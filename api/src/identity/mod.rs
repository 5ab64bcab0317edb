use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};

use crate::{
    App,
    error::{ApiRequestError, AppError},
    models::user::User,
};

pub mod google;
pub mod routes;
pub mod token;

pub use token::SessionKeys;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Authorization header is required")]
    MissingToken,

    #[error("Authorization header must look like `Bearer <token>`")]
    MalformedToken,

    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session token has expired, please sign in again")]
    ExpiredToken,

    #[error("The account behind this session no longer exists")]
    UserNotFound,
}

impl ApiRequestError for SessionError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn code(&self) -> &'static str {
        match self {
            SessionError::MissingToken => "MISSING_TOKEN",
            SessionError::MalformedToken => "MALFORMED_TOKEN",
            SessionError::InvalidToken => "INVALID_TOKEN",
            SessionError::ExpiredToken => "EXPIRED_TOKEN",
            SessionError::UserNotFound => "USER_NOT_FOUND",
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, SessionError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(SessionError::MissingToken)?
        .to_str()
        .map_err(|_| SessionError::MalformedToken)?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Ok(token),
        _ => Err(SessionError::MalformedToken),
    }
}

/// A signed in site owner.
pub struct AdminUser(pub User);

impl FromRequestParts<App> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, app: &App) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let claims = app.sessions.validate(token)?;

        // tokens can outlive the account they were issued for
        let user = app
            .store
            .find_user(claims.user_id)
            .await?
            .ok_or(SessionError::UserNotFound)?;

        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_shapes() {
        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(SessionError::MissingToken)
        ));
        assert_eq!(bearer_token(&with_auth("Bearer abc.def")).unwrap(), "abc.def");

        for malformed in ["abc.def", "Basic abc", "Bearer", "Bearer ", "bearer abc", "Bearer a b"] {
            assert!(
                matches!(
                    bearer_token(&with_auth(malformed)),
                    Err(SessionError::MalformedToken)
                ),
                "{malformed}"
            );
        }
    }
}
