use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lendops_common::secretbox::SecretBox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| match Config::from_env() {
    Ok(conf) => conf,
    Err(e) => {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
});

const DB_URI_VAR: &str = "LENDOPS_DB_URI";
const DB_MAX_CONNECTIONS_VAR: &str = "LENDOPS_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "LENDOPS_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "LENDOPS_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "LENDOPS_TOKEN_SIGNING_KEY_B64";
const MFA_SEED_KEY_VAR: &str = "LENDOPS_MFA_SEED_KEY";

const HASH_LENGTH_VAR: &str = "LENDOPS_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "LENDOPS_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "LENDOPS_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "LENDOPS_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "LENDOPS_HASH_SALT_LENGTH";

const SESSION_LIFETIME_MINS_VAR: &str = "LENDOPS_SESSION_LIFETIME_MINS";

const CACHE_BACKEND_VAR: &str = "LENDOPS_CACHE_BACKEND";
const REDIS_URI_VAR: &str = "LENDOPS_REDIS_URI";
const CACHE_TTL_SECS_VAR: &str = "LENDOPS_CACHE_TTL_SECS";

const VOUCHER_DIR_VAR: &str = "LENDOPS_VOUCHER_DIR";

const ACTIX_WORKER_COUNT_VAR: &str = "LENDOPS_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "LENDOPS_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheBackend {
    Local,
    Redis,
}

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_uri: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],
    #[zeroize(skip)]
    pub mfa_seed_box: SecretBox,

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub session_lifetime: Duration,

    #[zeroize(skip)]
    pub cache_backend: CacheBackend,
    pub redis_uri: Option<String>,
    #[zeroize(skip)]
    pub cache_ttl: Duration,

    #[zeroize(skip)]
    pub voucher_dir: String,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let hashing_key = Zeroizing::new(
            b64.decode(env_var::<String>(HASHING_KEY_VAR)?.as_bytes())
                .map_err(|_| ConfigError::InvalidVar(HASHING_KEY_VAR))?,
        );
        let hashing_key = hashing_key
            .as_slice()
            .try_into()
            .map_err(|_| ConfigError::InvalidVar(HASHING_KEY_VAR))?;

        let token_signing_key = Zeroizing::new(
            b64.decode(env_var::<String>(TOKEN_SIGNING_KEY_VAR)?.as_bytes())
                .map_err(|_| ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?,
        );
        let token_signing_key = token_signing_key
            .as_slice()
            .try_into()
            .map_err(|_| ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?;

        let mfa_seed_key = Zeroizing::new(env_var::<String>(MFA_SEED_KEY_VAR)?);
        let mfa_seed_box = SecretBox::from_secret(mfa_seed_key.as_bytes())
            .map_err(|_| ConfigError::InvalidVar(MFA_SEED_KEY_VAR))?;

        let cache_backend = match env_var_or(CACHE_BACKEND_VAR, String::from("local")).as_str() {
            "local" => CacheBackend::Local,
            "redis" => CacheBackend::Redis,
            _ => return Err(ConfigError::InvalidVar(CACHE_BACKEND_VAR)),
        };

        let redis_uri = match cache_backend {
            CacheBackend::Redis => Some(env_var(REDIS_URI_VAR)?),
            CacheBackend::Local => None,
        };

        let inner = ConfigInner {
            db_uri: env_var(DB_URI_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,
            mfa_seed_box,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, 18),
            hash_mem_cost_kib: env_var_or(HASH_MEM_COST_KIB_VAR, 62_500),
            hash_threads: env_var_or(HASH_THREADS_VAR, 1),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            session_lifetime: Duration::from_secs(
                env_var_or(SESSION_LIFETIME_MINS_VAR, 60) * 60,
            ),

            cache_backend,
            redis_uri,
            cache_ttl: Duration::from_secs(env_var_or(CACHE_TTL_SECS_VAR, 300)),

            voucher_dir: env_var_or(VOUCHER_DIR_VAR, String::from("./vouchers")),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only when no other threads are active and the config will not be
    /// accessed again. Meant for graceful shutdown.
    pub unsafe fn zeroize(&self) {
        (*self.inner.get()).zeroize();
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let value = std::env::var(key).map_err(|_| ConfigError::MissingVar(key))?;
    value.parse().map_err(|_| ConfigError::InvalidVar(key))
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(key) => {
                write!(f, "ConfigError: Environment variable '{key}' is not set")
            }
            ConfigError::InvalidVar(key) => {
                write!(f, "ConfigError: Environment variable '{key}' is invalid")
            }
        }
    }
}
