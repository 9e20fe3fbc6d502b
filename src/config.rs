// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! fixed identity constants the service depends on. Configuration is loaded
//! from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the credential database | `./data` |
//! | `JWT_SECRET` | Token signing secret (HS512) | built-in deployment secret |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated list of allowed origins | `http://localhost:3000,http://localhost:8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory.
///
/// The credential database (`users.redb`) is created inside this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the token signing secret.
///
/// Every instance of a deployment must share the same secret so that tokens
/// issued by one instance verify on all others and survive restarts.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for the CORS origin allow-list.
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:8080";
const DEFAULT_JWT_SECRET: &str =
    "ChurnInsightBancoSecureKey2024SuperSecretKeyForJWTTokenGeneration!!";

/// File name of the credential database inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "users.redb";

// =============================================================================
// Fixed identity constants
// =============================================================================

/// Username of the privileged account maintained by the bootstrap reconciler.
pub const ADMIN_USERNAME: &str = "admin";

/// Email of the privileged account maintained by the bootstrap reconciler.
pub const ADMIN_EMAIL: &str = "admin@churninsight.com";

/// Credential assigned when the privileged account is created or its stored
/// credential is blank.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Display name given to a freshly created privileged account.
pub const ADMIN_FULL_NAME: &str = "System Administrator";

/// Lifetime of an issued access token.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Lifetime of a password-reset token.
pub const RESET_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Typed runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup(PORT_ENV)
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let data_dir = lookup(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());
        let allowed_origins = lookup(CORS_ALLOWED_ORIGINS_ENV)
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            host,
            port,
            data_dir,
            jwt_secret,
            allowed_origins,
            log_format,
        }
    }

    /// Socket address string to bind the listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Full path of the credential database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_path(), PathBuf::from("./data/users.redb"));
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "http://localhost:8080"]
        );
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let config = config_from(&[(PORT_ENV, "not-a-port")]);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (DATA_DIR_ENV, "/var/lib/churn"),
            (JWT_SECRET_ENV, "another-secret"),
            (CORS_ALLOWED_ORIGINS_ENV, "https://a.example, https://b.example,"),
            (LOG_FORMAT_ENV, "JSON"),
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.database_path(), PathBuf::from("/var/lib/churn/users.redb"));
        assert_eq!(config.jwt_secret, "another-secret");
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn empty_secret_uses_default() {
        let config = config_from(&[(JWT_SECRET_ENV, "")]);
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }
}
