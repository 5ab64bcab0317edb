use std::{str::FromStr, time::Duration};

pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub env: Env,
    pub database_url: String,
    pub database_max_connections: usize,
    pub port: u16,
    pub session: SessionConfig,
    pub google_client_id: Option<String>,
    pub comment_rate: CommentRate,
    pub tenant_cache_ttl: Duration,
    pub secret_hash_memory_kib: u32,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub jwt_secret: String,
    pub expiration_hours: i64,
}

/// Token bucket settings for comment creation, per visitor.
#[derive(Clone, Copy, Debug)]
pub struct CommentRate {
    pub per_minute: u32,
    pub burst: u32,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::debug!("Missing environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "Could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

/// Falls back to `default` when unset, refuses to start on garbage.
fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(raw)) => match raw.trim().parse() {
            Ok(val) => val,
            Err(_) => {
                tracing::error!("Environment variable `{key}` has an invalid value `{raw}`");
                std::process::exit(1)
            }
        },
        Ok(None) => default,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1)
        }
    }
}

impl Env {
    pub fn from_name(name: &str) -> Env {
        match name {
            "dev" => Env::Dev,
            "staging" => Env::Staging,
            "production" => Env::Production,
            _ => Env::Dev,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Env::Production)
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let jwt_secret = required_var("JWT_SECRET");
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            tracing::error!(
                "Environment variable `JWT_SECRET` must be at least {MIN_JWT_SECRET_LEN} characters"
            );
            std::process::exit(1)
        }

        ServerConfig {
            env: match var("ENVIRONMENT") {
                Ok(Some(env)) => Env::from_name(env.as_str()),
                _ => Env::Dev,
            },
            database_url: required_var("DATABASE_URL"),
            database_max_connections: parsed_var("DATABASE_MAX_CONNECTIONS", 10),
            port: parsed_var("PORT", 8080),
            session: SessionConfig {
                jwt_secret,
                expiration_hours: parsed_var("JWT_EXPIRATION_HOURS", 168),
            },
            google_client_id: var("GOOGLE_CLIENT_ID").ok().flatten(),
            comment_rate: CommentRate {
                per_minute: parsed_var("COMMENT_RATE_PER_MINUTE", 10),
                burst: parsed_var("COMMENT_RATE_BURST", 5),
            },
            tenant_cache_ttl: Duration::from_secs(parsed_var("TENANT_CACHE_TTL_SECS", 60)),
            secret_hash_memory_kib: parsed_var("SECRET_HASH_MEMORY_KIB", 19456),
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            env: Env::Dev,
            database_url: String::new(),
            database_max_connections: 1,
            port: 0,
            session: SessionConfig {
                jwt_secret: "a-test-secret-that-is-long-enough-for-hs256".into(),
                expiration_hours: 168,
            },
            google_client_id: Some("test-client.apps.googleusercontent.com".into()),
            comment_rate: CommentRate {
                per_minute: 10,
                burst: 5,
            },
            tenant_cache_ttl: Duration::from_secs(60),
            secret_hash_memory_kib: 8,
        }
    }
}
