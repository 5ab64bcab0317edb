use axum::{
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};

use crate::error::{ApiRequestError, AppError};

#[derive(thiserror::Error, Debug)]
#[error("Invalid request body: {0}")]
pub struct InvalidBody(String);

impl ApiRequestError for InvalidBody {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn code(&self) -> &'static str {
        "INVALID_INPUT"
    }
}

/// `axum::Json`, but a body that doesn't parse is reported like any other
/// input problem.
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(value) => Ok(Self(value.0)),
            Err(rejection) => Err(InvalidBody(rejection.body_text()).into()),
        }
    }
}
