use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use const_format::concatcp;
use rand::{TryRngCore, rngs::OsRng};

use crate::{config::Env, error::AppError};

const KEY_NAMESPACE: &str = "tl_";
pub const LIVE_KEY_PREFIX: &str = concatcp!(KEY_NAMESPACE, "live_");
pub const TEST_KEY_PREFIX: &str = concatcp!(KEY_NAMESPACE, "test_");

const KEY_RANDOM_BYTES: usize = 32;
const SALT_BYTES: usize = 16;

/// Issues a fresh site API key: a prefix telling production keys apart from
/// the rest, followed by 64 hex characters.
///
/// # Panics
///
/// When the operating system cannot provide randomness. There is nothing a
/// caller could do about that.
pub fn generate_api_key(env: Env) -> String {
    let mut bytes = [0u8; KEY_RANDOM_BYTES];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        panic!("operating system random source failed: {e}");
    }

    let prefix = if env.is_production() {
        LIVE_KEY_PREFIX
    } else {
        TEST_KEY_PREFIX
    };

    format!("{prefix}{}", hex::encode(bytes))
}

#[derive(thiserror::Error, Debug)]
pub enum SecretHashError {
    #[error("invalid argon2 parameters: {0}")]
    Params(argon2::Error),

    #[error("hashing failed: {0}")]
    Hash(argon2::password_hash::Error),

    #[error("stored hash is unreadable: {0}")]
    Corrupt(argon2::password_hash::Error),

    #[error("no randomness for a salt: {0}")]
    Random(String),

    #[error("hashing task died: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SecretHashError> for AppError {
    fn from(e: SecretHashError) -> Self {
        e.to_string().into()
    }
}

/// Argon2id hashing of comment secrets. Work happens on the blocking pool.
#[derive(Clone)]
pub struct SecretHasher {
    params: Params,
}

impl SecretHasher {
    const TIME_COST: u32 = 2;
    const PARALLELISM: u32 = 1;
    const OUTPUT_LEN: usize = 32;

    pub fn new(memory_cost_kib: u32) -> Result<Self, SecretHashError> {
        Self::with_params(memory_cost_kib, Self::TIME_COST, Self::PARALLELISM)
    }

    pub fn with_params(
        memory_cost_kib: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, SecretHashError> {
        let params = Params::new(
            memory_cost_kib,
            time_cost,
            parallelism,
            Some(Self::OUTPUT_LEN),
        )
        .map_err(SecretHashError::Params)?;

        Ok(SecretHasher { params })
    }

    pub async fn hash(&self, secret: String) -> Result<String, SecretHashError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let mut bytes = [0u8; SALT_BYTES];
            OsRng
                .try_fill_bytes(&mut bytes)
                .map_err(|e| SecretHashError::Random(e.to_string()))?;
            let salt = SaltString::encode_b64(&bytes).map_err(SecretHashError::Hash)?;
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(secret.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(SecretHashError::Hash)
        })
        .await?
    }

    pub async fn verify(&self, secret: String, hash: String) -> Result<bool, SecretHashError> {
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(SecretHashError::Corrupt)?;
            // cost parameters are read back from the PHC string
            Ok(Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok())
        })
        .await?
    }
}

#[cfg(test)]
impl SecretHasher {
    pub fn cheap() -> Self {
        Self::with_params(8, 1, 1).unwrap()
    }
}
