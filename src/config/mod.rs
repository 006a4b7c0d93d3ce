//! Configuration management
//!
//! Configuration is loaded from a `config.yml` file and can be overridden by
//! `GAZETTE_*` environment variables. Missing optional values are filled with
//! sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "GAZETTE_";

/// Upper bound on session lifetime, in days
const MAX_SESSION_DAYS: i64 = 3650;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Session and CSRF settings
    #[serde(default)]
    pub security: SecurityConfig,
    /// Template override settings
    #[serde(default)]
    pub templates: TemplatesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/gazette.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Session and CSRF configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Secret used to sign CSRF tokens. A random one is generated at startup
    /// when unset, which invalidates outstanding tokens on restart.
    #[serde(default)]
    pub csrf_secret: Option<String>,
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            csrf_secret: None,
            session_days: default_session_days(),
            secure_cookies: false,
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory whose `.html` files override the embedded templates
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - GAZETTE_SERVER_HOST
    /// - GAZETTE_SERVER_PORT
    /// - GAZETTE_DATABASE_DRIVER
    /// - GAZETTE_DATABASE_URL
    /// - GAZETTE_SECURITY_CSRF_SECRET
    /// - GAZETTE_SECURITY_SESSION_DAYS
    /// - GAZETTE_SECURITY_SECURE_COOKIES
    /// - GAZETTE_TEMPLATES_PATH
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SESSION_DAYS).contains(&self.security.session_days) {
            return Err(ConfigError::ValidationError(format!(
                "security.session_days must be between 1 and {}",
                MAX_SESSION_DAYS
            )));
        }
        if let Some(secret) = &self.security.csrf_secret {
            if secret.len() < 16 {
                return Err(ConfigError::ValidationError(
                    "security.csrf_secret must be at least 16 bytes".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(host) = env_value("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("SERVER_PORT") {
            self.server.port = port;
        }
        if let Some(driver) = env_value::<String>("DATABASE_DRIVER") {
            // Unknown drivers keep the file setting
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => tracing::warn!(driver = %driver, "Ignoring unknown GAZETTE_DATABASE_DRIVER"),
            }
        }
        if let Some(url) = env_value("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(secret) = env_value("SECURITY_CSRF_SECRET") {
            self.security.csrf_secret = Some(secret);
        }
        if let Some(days) = env_value("SECURITY_SESSION_DAYS") {
            self.security.session_days = days;
        }
        if let Some(secure) = env_value("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = secure;
        }
        if let Some(path) = env_value::<String>("TEMPLATES_PATH") {
            self.templates.path = Some(PathBuf::from(path));
        }
    }
}

/// Parse `GAZETTE_<key>`; unset or unparsable values are ignored
fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(format!("{}{}", ENV_PREFIX, key))
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Tests touching process environment share this lock.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
