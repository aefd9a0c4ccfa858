//! Configuration management for Blog Service
//!
//! Loads configuration from environment variables.
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Storage backend selection
    pub storage: StorageBackend,
    /// Database configuration (used by the postgres backend)
    pub database: DatabaseConfig,
    /// Bearer token verification
    pub auth: AuthConfig,
    /// Post listing pagination
    pub pagination: PaginationConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Upper bound for request bodies, image uploads included
    pub max_upload_bytes: usize,
    /// Log output format
    pub log_format: LogFormat,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .finish()
    }
}

/// Limit/offset pagination for post listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size used when the client sends no `limit`; `None` lists everything
    pub default_page_size: Option<usize>,
    /// Largest `limit` honoured; larger requests are clamped
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: None,
            max_page_size: default_max_page_size(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_max_page_size() -> usize {
    100
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env_or("PORT", 8080)?,
        };

        let storage = match std::env::var("STORAGE_BACKEND") {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "postgres" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                other => bail!("STORAGE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
            },
            Err(_) => StorageBackend::Postgres,
        };

        let database = DatabaseConfig {
            url: match storage {
                StorageBackend::Postgres => std::env::var("DATABASE_URL")
                    .context("DATABASE_URL environment variable not set")?,
                StorageBackend::Memory => std::env::var("DATABASE_URL").unwrap_or_default(),
            },
            max_connections: parse_env_or("DB_MAX_CONNECTIONS", default_max_connections())?,
            min_connections: parse_env_or("DB_MIN_CONNECTIONS", default_min_connections())?,
        };

        let jwt_secret =
            std::env::var("JWT_SECRET").context("JWT_SECRET environment variable not set")?;
        if app.is_production() && jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
            bail!(
                "JWT_SECRET must be at least {} bytes in production",
                MIN_PRODUCTION_SECRET_LEN
            );
        }

        let pagination = PaginationConfig {
            default_page_size: parse_env_opt("PAGE_SIZE_DEFAULT")?,
            max_page_size: parse_env_or("PAGE_SIZE_MAX", default_max_page_size())?,
        };
        if pagination.max_page_size == 0 {
            bail!("PAGE_SIZE_MAX must be positive");
        }

        let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(value) => value,
            Err(_) if app.is_production() => {
                bail!("CORS_ALLOWED_ORIGINS must be set in production")
            }
            Err(_) => "http://localhost:3000".to_string(),
        };
        if app.is_production() && allowed_origins.trim() == "*" {
            bail!("CORS_ALLOWED_ORIGINS cannot be '*' in production");
        }

        let log_format = match std::env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Config {
            app,
            storage,
            database,
            auth: AuthConfig { jwt_secret },
            pagination,
            cors: CorsConfig { allowed_origins },
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", default_max_upload_bytes())?,
            log_format,
        })
    }
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_env_opt(key)?.unwrap_or(default))
}

fn parse_env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}='{}': {}", key, val, e)),
        _ => Ok(None),
    }
}
