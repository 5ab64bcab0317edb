use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Json, Router, routing::get};
use config::{Env, ServerConfig};
use crypto::SecretHasher;
use dotenv::dotenv;
use identity::{
    SessionKeys,
    google::{GoogleTokenInfo, IdTokenVerifier},
};
use mimalloc::MiMalloc;
use ratelimit::{VisitorRateLimiter, comment_quota};
use serde_json::{Value, json};
use store::{PgStore, Store};
use tenant::TenantCache;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod admin;
mod comment;
mod config;
mod crypto;
mod error;
mod identity;
mod json;
mod models;
mod pagination;
mod post;
mod privacy;
mod ratelimit;
mod real_ip;
mod sanitize;
mod schema;
mod store;
mod tenant;
#[cfg(test)]
mod test_support;
mod validation;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone)]
pub struct App {
    config: Arc<ServerConfig>,
    store: Arc<dyn Store>,
    tenants: Arc<TenantCache>,
    comment_limiter: Arc<VisitorRateLimiter>,
    sessions: Arc<SessionKeys>,
    hasher: SecretHasher,
    id_tokens: Arc<dyn IdTokenVerifier>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    // config errors are reported through tracing, so it goes first
    init_tracing(Env::from_name(&std::env::var("ENVIRONMENT").unwrap_or_default()));

    let config = ServerConfig::new_from_env();

    let store = PgStore::connect(&config.database_url, config.database_max_connections)?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let app = App {
        store: Arc::new(store),
        tenants: Arc::new(TenantCache::new(config.tenant_cache_ttl)),
        comment_limiter: Arc::new(VisitorRateLimiter::new(comment_quota(config.comment_rate))),
        sessions: Arc::new(SessionKeys::new(
            &config.session.jwt_secret,
            config.session.expiration_hours,
        )),
        hasher: SecretHasher::new(config.secret_hash_memory_kib)?,
        id_tokens: Arc::new(GoogleTokenInfo::new(http, config.google_client_id.clone())),
        config: Arc::new(config),
    };

    app.comment_limiter.clone().spawn_pruner(Duration::from_secs(60));

    if app.config.google_client_id.is_none() {
        tracing::warn!("GOOGLE_CLIENT_ID is not set, admin sign-in will fail");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], app.config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, env = ?app.config.env, "Listening");

    axum::serve(
        listener,
        router(app).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub fn router(app: App) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", identity::routes::route())
        .nest("/api", comment::routes::route())
        .nest(
            "/admin",
            identity::routes::admin_route().merge(admin::routes::route()),
        )
        .layer(TraceLayer::new_for_http())
        // widgets are embedded anywhere, the origin is checked per site
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn init_tracing(env: Env) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("threadline_api=debug,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);

    match env {
        Env::Dev => registry.with(tracing_subscriber::fmt::layer()).init(),
        Env::Staging | Env::Production => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
