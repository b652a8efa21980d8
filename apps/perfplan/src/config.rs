//! # Configuration
//!
//! Application settings, read from an optional TOML file and then
//! overridden by environment variables.
//!
//! ## Environment Variables
//!
//! - `PERFPLAN_TOKEN_SECRET`: secret used to sign bearer tokens (required by `server` and `token`)
//! - `PERFPLAN_DEV_LOGIN`: `true`/`1` enables `POST /api/v1/auth/dev-login`
//! - `PERFPLAN_CORS_ORIGINS`: comma-separated allowed origins, or `*`
//! - `PERFPLAN_RATE_LIMIT`: requests per second (0 disables)
//!
//! ## Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "/var/lib/perfplan/perfplan.db"
//!
//! [security]
//! token_ttl_hours = 24
//! ```

use perfplan_core::ReviewError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// `redb` (persistent) or `memory` (volatile, for demos).
    pub backend: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("perfplan.db"),
            backend: "redb".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub token_secret: Option<String>,
    pub token_ttl_hours: u64,
    pub dev_login: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            token_ttl_hours: 72,
            dev_login: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `None` means localhost only; `["*"]` allows every origin.
    pub cors_origins: Option<Vec<String>>,
    /// Requests per second, 0 disables rate limiting.
    pub rate_limit: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            rate_limit: 100,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub http: HttpConfig,
}

impl AppConfig {
    /// Load from `path` (if given), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ReviewError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ReviewError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            ReviewError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ReviewError::InvalidInput(format!(
                "Config file exceeds {} bytes",
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReviewError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ReviewError> {
        toml::from_str(text)
            .map_err(|e| ReviewError::SerializationError(format!("Invalid config: {}", e)))
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a function so tests need not touch the process
    /// environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("PERFPLAN_TOKEN_SECRET").filter(|s| !s.is_empty()) {
            self.security.token_secret = Some(secret);
        }
        if let Some(flag) = lookup("PERFPLAN_DEV_LOGIN") {
            self.security.dev_login = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(origins) = lookup("PERFPLAN_CORS_ORIGINS") {
            let list: Vec<String> = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            self.http.cors_origins = Some(list);
        }
        match lookup("PERFPLAN_RATE_LIMIT").map(|s| s.trim().parse::<u32>()) {
            Some(Ok(rps)) => self.http.rate_limit = rps,
            Some(Err(e)) => tracing::warn!("Ignoring invalid PERFPLAN_RATE_LIMIT: {}", e),
            None => {}
        }
    }

    /// The token secret, or an error naming how to provide one.
    pub fn require_secret(&self) -> Result<&str, ReviewError> {
        self.security
            .token_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ReviewError::InvalidInput(
                    "No token secret configured: set PERFPLAN_TOKEN_SECRET or security.token_secret"
                        .to_string(),
                )
            })
    }
}
