//! Configuration loading for the Slack relay.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `EVENT_LISTENER_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const ENV_PREFIX: &str = "EVENT_LISTENER_";

/// Application configuration derived from `EVENT_LISTENER_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default)]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_ms")]
    pub db_connect_timeout_ms: u64,
    #[serde(default = "default_db_max_lifetime_seconds")]
    pub db_max_lifetime_seconds: u64,
    #[serde(default = "default_db_idle_timeout_seconds")]
    pub db_idle_timeout_seconds: u64,
    #[serde(default)]
    pub run_migrations: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_certificate_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key_path: Option<PathBuf>,
    #[serde(default = "default_slack_oauth_base")]
    pub slack_oauth_base: String,
    #[serde(default = "default_slack_api_base")]
    pub slack_api_base: String,
    #[serde(default = "default_oauth_redirect_uri")]
    pub oauth_redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_state_max_age_seconds: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: 0,
            db_connect_timeout_ms: default_db_connect_timeout_ms(),
            db_max_lifetime_seconds: default_db_max_lifetime_seconds(),
            db_idle_timeout_seconds: default_db_idle_timeout_seconds(),
            run_migrations: false,
            tls_certificate_path: None,
            tls_key_path: None,
            slack_oauth_base: default_slack_oauth_base(),
            slack_api_base: default_slack_api_base(),
            oauth_redirect_uri: default_oauth_redirect_uri(),
            oauth_state_max_age_seconds: None,
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns the certificate/key pair when TLS is configured.
    pub fn tls_paths(&self) -> Option<(&PathBuf, &PathBuf)> {
        match (&self.tls_certificate_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.database_url = redact_url_password(&config.database_url);
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error on inconsistent settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        if self.db_max_connections == 0 || self.db_min_connections > self.db_max_connections {
            return Err(ConfigError::InvalidPoolBounds {
                min: self.db_min_connections,
                max: self.db_max_connections,
            });
        }

        match (&self.tls_certificate_path, &self.tls_key_path) {
            (Some(_), None) => return Err(ConfigError::IncompleteTls { missing: "KEY_PATH" }),
            (None, Some(_)) => {
                return Err(ConfigError::IncompleteTls {
                    missing: "CERTIFICATE_PATH",
                });
            }
            _ => {}
        }

        for (field, value) in [
            ("SLACK_OAUTH_BASE", &self.slack_oauth_base),
            ("SLACK_API_BASE", &self.slack_api_base),
            ("OAUTH_REDIRECT_URI", &self.oauth_redirect_uri),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
                source,
            })?;
        }

        if self.oauth_state_max_age_seconds == Some(0) {
            return Err(ConfigError::InvalidStateMaxAge);
        }

        Ok(())
    }
}

fn redact_url_password(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("REDACTED"));
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "[REDACTED]".to_string(),
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:18075".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    compose_database_url(&PgSettings::default())
}

fn default_db_max_connections() -> u32 {
    4
}

fn default_db_connect_timeout_ms() -> u64 {
    5000
}

fn default_db_max_lifetime_seconds() -> u64 {
    3600
}

fn default_db_idle_timeout_seconds() -> u64 {
    1800
}

fn default_slack_oauth_base() -> String {
    "https://slack.com".to_string()
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_oauth_redirect_uri() -> String {
    "https://slack.holmosapien.com/authorization".to_string()
}

/// Discrete Postgres connection settings (`PG_*` keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgSettings {
    pub hostname: String,
    pub port: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for PgSettings {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port: "5432".to_string(),
            username: "postgres".to_string(),
            password: String::new(),
            database: "event_listener".to_string(),
        }
    }
}

/// Builds a `postgres://` URL from discrete settings, percent-encoding credentials.
pub fn compose_database_url(pg: &PgSettings) -> String {
    let base = format!("postgres://{}:{}/{}", pg.hostname, pg.port, pg.database);
    match Url::parse(&base) {
        Ok(mut url) => {
            let _ = url.set_username(&pg.username);
            if !pg.password.is_empty() {
                let _ = url.set_password(Some(&pg.password));
            }
            url.to_string()
        }
        Err(_) => base,
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
    #[error("database URL is empty; set EVENT_LISTENER_DATABASE_URL or the EVENT_LISTENER_PG_* variables")]
    MissingDatabaseUrl,
    #[error("database pool bounds are invalid (min: {min}, max: {max})")]
    InvalidPoolBounds { min: u32, max: u32 },
    #[error("TLS is partially configured; set EVENT_LISTENER_{missing} as well or unset both paths")]
    IncompleteTls { missing: &'static str },
    #[error("{field} must be an absolute URL, got '{value}': {source}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        source: url::ParseError,
    },
    #[error("OAuth state max age must be positive when set")]
    InvalidStateMaxAge,
}

/// Loads configuration using layered `.env` files and `EVENT_LISTENER_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration: `.env` layers first, process environment last.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_non_empty(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);

        // An explicit URL wins over the discrete PG_* settings.
        let database_url = match take_non_empty(&mut layered, "DATABASE_URL") {
            Some(url) => url,
            None => {
                let defaults = PgSettings::default();
                compose_database_url(&PgSettings {
                    hostname: take_non_empty(&mut layered, "PG_HOSTNAME")
                        .unwrap_or(defaults.hostname),
                    port: take_non_empty(&mut layered, "PG_PORT").unwrap_or(defaults.port),
                    username: take_non_empty(&mut layered, "PG_USERNAME")
                        .unwrap_or(defaults.username),
                    password: layered.remove("PG_PASSWORD").unwrap_or(defaults.password),
                    database: take_non_empty(&mut layered, "PG_DATABASE")
                        .unwrap_or(defaults.database),
                })
            }
        };

        let db_max_connections = take_parsed(&mut layered, "DB_MAX_CONNECTIONS")?
            .unwrap_or_else(default_db_max_connections);
        let db_min_connections = take_parsed(&mut layered, "DB_MIN_CONNECTIONS")?.unwrap_or(0);
        let db_connect_timeout_ms = take_parsed(&mut layered, "DB_CONNECT_TIMEOUT_MS")?
            .unwrap_or_else(default_db_connect_timeout_ms);
        let db_max_lifetime_seconds = take_parsed(&mut layered, "DB_MAX_LIFETIME_SECONDS")?
            .unwrap_or_else(default_db_max_lifetime_seconds);
        let db_idle_timeout_seconds = take_parsed(&mut layered, "DB_IDLE_TIMEOUT_SECONDS")?
            .unwrap_or_else(default_db_idle_timeout_seconds);
        let run_migrations = take_parsed(&mut layered, "RUN_MIGRATIONS")?.unwrap_or(false);

        let tls_certificate_path = take_non_empty(&mut layered, "CERTIFICATE_PATH").map(PathBuf::from);
        let tls_key_path = take_non_empty(&mut layered, "KEY_PATH").map(PathBuf::from);

        let slack_oauth_base = take_non_empty(&mut layered, "SLACK_OAUTH_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(default_slack_oauth_base);
        let slack_api_base = take_non_empty(&mut layered, "SLACK_API_BASE")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or_else(default_slack_api_base);
        let oauth_redirect_uri = take_non_empty(&mut layered, "OAUTH_REDIRECT_URI")
            .unwrap_or_else(default_oauth_redirect_uri);
        let oauth_state_max_age_seconds =
            take_parsed(&mut layered, "OAUTH_STATE_MAX_AGE_SECONDS")?;

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_min_connections,
            db_connect_timeout_ms,
            db_max_lifetime_seconds,
            db_idle_timeout_seconds,
            run_migrations,
            tls_certificate_path,
            tls_key_path,
            slack_oauth_base,
            slack_api_base,
            oauth_redirect_uri,
            oauth_state_max_age_seconds,
        };

        // Validate configuration
        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_non_empty(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_parsed<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match take_non_empty(values, key) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        None => Ok(None),
    }
}
