use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};

use crate::error::AppError;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// First candidate wins: the left-most `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the connecting socket.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(','))
        .map(str::trim)
        .find(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return Some(ip.to_owned());
    }

    let real_ip = headers
        .get(X_REAL_IP)
        .and_then(|header| header.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = real_ip {
        return Some(ip.to_owned());
    }

    remote.map(|addr| addr.ip().to_string())
}

/// The submitter address as observed for this request, also used as the
/// visitor identity for rate limiting.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let ip = client_ip(&parts.headers, remote).ok_or("couldn't get connecting socket IP")?;

        if remote.is_none() {
            tracing::debug!(client_ip = %ip, "No socket address attached, using proxy headers");
        }

        Ok(ClientIp(ip))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserAgent(pub String);

impl<S> FromRequestParts<S> for UserAgent
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(UserAgent(
            parts
                .headers
                .get(header::USER_AGENT)
                .and_then(|ua| ua.to_str().ok())
                .unwrap_or_default()
                .to_owned(),
        ))
    }
}
