// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup. A missing
//! `JWT_SECRET` or an unparsable value aborts startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `waitress.redb` | `./data` |
//! | `JWT_SECRET` | HS256 signing secret for API tokens | Required |
//! | `BCRYPT_COST` | bcrypt work factor (4-31) | `12` |
//! | `DEFAULT_TIMEZONE` | Timezone attached to every request context | `UTC` |
//! | `CLIENT_SECRET_GRACE_SECS` | How long a rotated client secret stays valid | `86400` |
//! | `SETUP_ROUTES_ENABLED` | Mount `/setup/db/*` | `false` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::password::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const BCRYPT_COST_ENV: &str = "BCRYPT_COST";
pub const DEFAULT_TIMEZONE_ENV: &str = "DEFAULT_TIMEZONE";
pub const CLIENT_SECRET_GRACE_ENV: &str = "CLIENT_SECRET_GRACE_SECS";
pub const SETUP_ROUTES_ENV: &str = "SETUP_ROUTES_ENABLED";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "waitress.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{JWT_SECRET_ENV} must be set to a non-empty value")]
    MissingSecret,

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    pub default_timezone: String,
    pub client_secret_grace: chrono::Duration,
    pub setup_routes_enabled: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let jwt_secret = lookup(JWT_SECRET_ENV)
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        let bcrypt_cost: u32 = parse_or(&lookup, BCRYPT_COST_ENV, 12)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: BCRYPT_COST_ENV,
                value: bcrypt_cost.to_string(),
            });
        }

        let grace_secs: u32 = parse_or(&lookup, CLIENT_SECRET_GRACE_ENV, 86_400)?;

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, PORT_ENV, 8080)?,
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            jwt_secret,
            bcrypt_cost,
            default_timezone: lookup(DEFAULT_TIMEZONE_ENV).unwrap_or_else(|| "UTC".to_string()),
            client_secret_grace: chrono::Duration::seconds(i64::from(grace_secs)),
            setup_routes_enabled: parse_bool(&lookup, SETUP_ROUTES_ENV)?,
            log_format: parse_or(&lookup, LOG_FORMAT_ENV, LogFormat::Pretty)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &"<redacted>")
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("default_timezone", &self.default_timezone)
            .field("client_secret_grace", &self.client_secret_grace)
            .field("setup_routes_enabled", &self.setup_routes_enabled)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<bool, ConfigError> {
    match lookup(var).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            var,
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |var| map.get(var).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[(JWT_SECRET_ENV, "s3cret")]).unwrap();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.database_path(), PathBuf::from("./data").join(DATABASE_FILE));
        assert_eq!(cfg.bcrypt_cost, 12);
        assert_eq!(cfg.default_timezone, "UTC");
        assert_eq!(cfg.client_secret_grace, chrono::Duration::days(1));
        assert!(!cfg.setup_routes_enabled);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn missing_or_blank_secret_is_fatal() {
        assert!(matches!(config(&[]), Err(ConfigError::MissingSecret)));
        assert!(matches!(
            config(&[(JWT_SECRET_ENV, "   ")]),
            Err(ConfigError::MissingSecret)
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            (JWT_SECRET_ENV, "s3cret"),
            (PORT_ENV, "9000"),
            (BCRYPT_COST_ENV, "4"),
            (SETUP_ROUTES_ENV, "true"),
            (LOG_FORMAT_ENV, "JSON"),
            (CLIENT_SECRET_GRACE_ENV, "60"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.bcrypt_cost, 4);
        assert!(cfg.setup_routes_enabled);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.client_secret_grace, chrono::Duration::seconds(60));
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            (PORT_ENV, "eighty"),
            (BCRYPT_COST_ENV, "2"),
            (SETUP_ROUTES_ENV, "maybe"),
            (LOG_FORMAT_ENV, "xml"),
        ] {
            let err = config(&[(JWT_SECRET_ENV, "s3cret"), (var, value)]).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: v, .. } if v == var), "{var}");
        }
    }

    #[test]
    fn debug_redacts_secret() {
        let cfg = config(&[(JWT_SECRET_ENV, "s3cret")]).unwrap();
        assert!(!format!("{cfg:?}").contains("s3cret"));
    }
}
