use std::{collections::HashMap, time::Duration};

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::Value;

use crate::store::StoreError;

/// An error that is the caller's fault, or at least one the caller is allowed
/// to know about. Anything else becomes a `ServerError`.
pub trait ApiRequestError: std::error::Error {
    fn status_code(&self) -> StatusCode;

    /// Stable machine readable code, e.g. `COMMENT_NOT_FOUND`.
    fn code(&self) -> &'static str;

    fn details(&self) -> Option<Value> {
        None
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug)]
pub enum AppError {
    ServerError {
        error: ServerError,

        #[cfg(debug_assertions)]
        backtrace: Option<backtrace::Backtrace>,
    },
    Request {
        status: StatusCode,
        code: &'static str,
        msg: String,
        details: Option<Value>,
        retry_after: Option<Duration>,
    },
}

#[derive(Serialize)]
struct ErrorResponse {
    code: &'static str,

    msg: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,

    #[cfg(debug_assertions)]
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_info: Option<HashMap<&'static str, Value>>,
}

impl AppError {
    fn server(error: ServerError) -> Self {
        AppError::ServerError {
            error,

            #[cfg(debug_assertions)]
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Request { status, .. } => *status,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ServerError { .. } => "SERVER_ERR",
            AppError::Request { code, .. } => code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::ServerError {
                error,
                #[cfg(debug_assertions)]
                backtrace,
            } => {
                // the concrete error only ever reaches the logs
                tracing::error!(error = %error, "request failed with a server error");

                let body = ErrorResponse {
                    code: "SERVER_ERR",
                    msg: "Internal server error".into(),
                    details: None,
                    #[cfg(debug_assertions)]
                    debug_info: backtrace.as_ref().map(|bt| {
                        HashMap::from([(
                            "backtrace",
                            serde_json::to_value(filter_backtrace(bt)).unwrap_or_default(),
                        )])
                    }),
                };

                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            AppError::Request {
                status,
                code,
                msg,
                details,
                retry_after,
            } => {
                let body = ErrorResponse {
                    code,
                    msg,
                    details,
                    #[cfg(debug_assertions)]
                    debug_info: None,
                };

                let mut res = (status, Json(body)).into_response();
                if let Some(wait) = retry_after {
                    // round up so clients never retry too early
                    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
                    res.headers_mut()
                        .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
                }
                res
            }
        }
    }
}

impl<E: ApiRequestError> From<E> for AppError {
    fn from(e: E) -> Self {
        AppError::Request {
            status: e.status_code(),
            code: e.code(),
            msg: e.to_string(),
            details: e.details(),
            retry_after: e.retry_after(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::server(e.into())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::server(e.into())
    }
}

impl From<&'static str> for AppError {
    fn from(e: &'static str) -> Self {
        AppError::server(ServerError::Internal(e.into()))
    }
}

impl From<String> for AppError {
    fn from(e: String) -> Self {
        AppError::server(ServerError::Internal(e))
    }
}

#[cfg(debug_assertions)]
#[derive(Serialize, Debug)]
struct FrameInfo {
    name: String,
    loc: String,
}

#[cfg(debug_assertions)]
fn filter_backtrace(backtrace: &backtrace::Backtrace) -> Vec<FrameInfo> {
    const MODULE_PREFIX: &str = "threadline_api::";
    let mut frames_info: Vec<FrameInfo> = Vec::new();

    for frame in backtrace.frames() {
        for symbol in frame.symbols() {
            if let (Some(name), Some(filename), Some(lineno)) = (
                symbol.name().map(|n| n.to_string()),
                symbol.filename(),
                symbol.lineno(),
            ) {
                if name.contains(MODULE_PREFIX) {
                    frames_info.push(FrameInfo {
                        name,
                        loc: format!("{}:{}", filename.display(), lineno),
                    });
                }
            }
        }
    }

    frames_info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(thiserror::Error, Debug)]
    #[error("slow down")]
    struct Throttled;

    impl ApiRequestError for Throttled {
        fn status_code(&self) -> StatusCode {
            StatusCode::TOO_MANY_REQUESTS
        }

        fn code(&self) -> &'static str {
            "RATE_LIMIT_EXCEEDED"
        }

        fn retry_after(&self) -> Option<Duration> {
            Some(Duration::from_millis(5500))
        }
    }

    async fn body_json(res: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn request_errors_carry_code_and_retry_hint() {
        let res = AppError::from(Throttled).into_response();

        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers()[header::RETRY_AFTER], "6");

        let body = body_json(res).await;
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["msg"], "slow down");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn store_errors_are_not_echoed() {
        let err = AppError::from(StoreError::MissingRow("post"));
        assert_eq!(err.code(), "SERVER_ERR");

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(res).await;
        assert_eq!(body["code"], "SERVER_ERR");
        assert!(!body.to_string().contains("expected row is missing"));
    }
}
