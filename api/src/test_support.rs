use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::{
    App,
    config::ServerConfig,
    crypto::SecretHasher,
    error::AppError,
    identity::{
        SessionKeys,
        google::{GoogleAuthError, GoogleIdentity, IdTokenVerifier},
    },
    models::user::User,
    ratelimit::{VisitorRateLimiter, comment_quota},
    store::{PostStore, SiteStore, memory::MemoryStore},
    tenant::{API_KEY_HEADER, TenantCache},
};

pub const VISITOR_IP: &str = "203.0.113.7";

/// Accepts `valid:<google id>` and nothing else.
struct FakeVerifier;

#[async_trait]
impl IdTokenVerifier for FakeVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        match id_token.strip_prefix("valid:") {
            Some(sub) if !sub.is_empty() => Ok(GoogleIdentity {
                google_id: sub.to_owned(),
                email: None,
            }),
            _ => Err(GoogleAuthError::InvalidIdToken.into()),
        }
    }
}

pub struct TestApp {
    pub state: App,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_tenant_ttl(ServerConfig::for_tests().tenant_cache_ttl)
    }

    pub fn with_tenant_ttl(ttl: Duration) -> Self {
        let config = ServerConfig::for_tests();
        let store = Arc::new(MemoryStore::new());

        let state = App {
            store: store.clone(),
            tenants: Arc::new(TenantCache::new(ttl)),
            comment_limiter: Arc::new(VisitorRateLimiter::new(comment_quota(
                config.comment_rate,
            ))),
            sessions: Arc::new(SessionKeys::new(
                &config.session.jwt_secret,
                config.session.expiration_hours,
            )),
            hasher: SecretHasher::cheap(),
            id_tokens: Arc::new(FakeVerifier),
            config: Arc::new(config),
        };

        TestApp { state, store }
    }

    pub fn router(&self) -> Router {
        crate::router(self.state.clone())
    }

    /// A widget call from `VISITOR_IP` without an `Origin`.
    pub fn widget_request(
        &self,
        method: &str,
        uri: &str,
        api_key: &str,
        body: Option<Value>,
    ) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(API_KEY_HEADER, api_key)
            .header("x-forwarded-for", VISITOR_IP)
            .header(header::USER_AGENT, "threadline-tests");

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub fn widget_raw_request(
        &self,
        method: &str,
        uri: &str,
        api_key: &str,
        body: &'static str,
    ) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(API_KEY_HEADER, api_key)
            .header("x-forwarded-for", VISITOR_IP)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    pub fn admin_request(
        &self,
        method: &str,
        uri: &str,
        user: &User,
        body: Option<Value>,
    ) -> Request<Body> {
        let token = self.state.sessions.issue(user.id, &user.email).unwrap();
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));

        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub async fn call(&self, req: Request<Body>) -> Response {
        self.router().oneshot(req).await.unwrap()
    }

    /// Posts a comment that is expected to be accepted and returns it.
    pub async fn post_comment(&self, api_key: &str, slug: &str, body: Value) -> Value {
        let res = self
            .router()
            .oneshot(self.widget_request(
                "POST",
                &format!("/api/posts/{slug}/comments"),
                api_key,
                Some(body),
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await
    }

    pub async fn post_comment_count(&self, api_key: &str, slug: &str) -> i32 {
        let site = self
            .store
            .find_active_site_by_api_key(api_key)
            .await
            .unwrap()
            .unwrap();

        self.store
            .find_post_by_slug(site.id, slug)
            .await
            .unwrap()
            .map(|p| p.comment_count)
            .unwrap_or_default()
    }
}

pub async fn body_json(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
