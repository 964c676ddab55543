// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;

/// Default token lifetime: one day.
pub const DEFAULT_JWT_EXPIRATION_SECS: u64 = 24 * 60 * 60;

/// Which credential pair `/api/auth/login` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginScheme {
    /// `{ email, password }` checked against the stored Argon2 hash.
    #[default]
    Password,
    /// `{ email, userId }` matched exactly against the user record.
    UserId,
}

impl FromStr for LoginScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "password" => Ok(LoginScheme::Password),
            "id" | "userid" | "user_id" => Ok(LoginScheme::UserId),
            other => Err(format!("unknown login scheme '{}'", other)),
        }
    }
}

/// Logging settings. Read on their own so the subscriber can be installed
/// before the rest of the configuration is parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub rust_log: String,
    pub log_dir: PathBuf,
}

impl LogConfig {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_dir: lookup("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `users.json`, `exams.json` and `certificates.json`.
    pub data_dir: PathBuf,
    /// When set, the SQLite store is used instead of the JSON files.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub log_dir: PathBuf,
    pub login_scheme: LoginScheme,
    pub seed_demo_data: bool,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Reads the configuration from the process environment (and `.env`).
    ///
    /// Invalid values are logged and replaced by their defaults, so call
    /// this after the tracing subscriber is installed.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let LogConfig { rust_log, log_dir } = LogConfig::from_lookup(&lookup);

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data"));

        let database_url = lookup("DATABASE_URL").filter(|s| !s.trim().is_empty());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, generating a per-process secret");
            format!(
                "{}{}",
                uuid::Uuid::new_v4().simple(),
                uuid::Uuid::new_v4().simple()
            )
        });

        let jwt_expiration = lookup("JWT_EXPIRATION")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_JWT_EXPIRATION_SECS);

        let bind_addr = lookup("BIND_ADDR")
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Ignoring invalid BIND_ADDR '{}': {}", v, e);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let login_scheme = lookup("LOGIN_SCHEME")
            .and_then(|v| match v.parse() {
                Ok(scheme) => Some(scheme),
                Err(e) => {
                    tracing::warn!("{}, falling back to password login", e);
                    None
                }
            })
            .unwrap_or_default();

        let seed_demo_data = lookup("SEED_DEMO_DATA")
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "no" | "off"
                )
            })
            .unwrap_or(true);

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ]
            });

        Self {
            data_dir,
            database_url,
            jwt_secret,
            jwt_expiration,
            bind_addr,
            rust_log,
            log_dir,
            login_scheme,
            seed_demo_data,
            cors_origins,
        }
    }
}
