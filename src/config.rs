//! Configuration loading and constants.
//!
//! Loads application configuration from a TOML file, overlays the environment
//! variables used by the container deployment, and validates the result before
//! anything is served. `AppConfig` is the root configuration struct containing
//! all settings. Connection parameters are handed to the probes as typed values;
//! the probes never read the environment themselves.

use const_format::formatcp;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// HTTP Response Headers
// =============================================================================

/// Health responses must never be served from an intermediate cache
pub const CACHE_CONTROL_NO_STORE: &str = "no-store";

/// Response header carrying the per-request UUID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// Probe Constants
// =============================================================================

/// Default per-probe deadline in milliseconds
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;

/// Key written and read back by the cache round-trip check
pub const CACHE_CHECK_KEY: &str = "vigil:cache-check";

/// Value written by the cache round-trip check
pub const CACHE_CHECK_VALUE: &str = "ok";

/// Expiry of the cache round-trip key, so checks leave nothing behind
pub const CACHE_CHECK_TTL_SECS: u64 = 60;

/// Service names used in reports and issue entries
pub const DATABASE_SERVICE: &str = "database";
pub const CACHE_SERVICE: &str = "cache";

// =============================================================================
// Default Ports, Paths and Strings
// =============================================================================

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// Seconds to wait for open connections to drain on shutdown
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Default configuration file path (optional when not given explicitly)
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Default log filter when neither --log-level nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "vigil=info,tower_http=info";

/// Default log format (text or json)
pub const DEFAULT_LOG_FORMAT: &str = "text";

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Liveness banner returned by `GET /`
pub const LIVENESS_MESSAGE: &str = formatcp!("{} {} is running", PKG_NAME, PKG_VERSION);

// =============================================================================
// Environment Overlay
// =============================================================================

pub const ENV_HTTP_HOST: &str = "HTTP_HOST";
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "POSTGRES_USER";
pub const ENV_DB_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DB_NAME: &str = "POSTGRES_DB";
pub const ENV_CACHE_HOST: &str = "REDIS_HOST";
pub const ENV_CACHE_PORT: &str = "REDIS_PORT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub probe: ProbeSettings,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "HttpServerConfig::default_host")]
    pub host: String,
    #[serde(default = "HttpServerConfig::default_port")]
    pub port: u16,
    /// Connection drain window on SIGTERM/SIGINT
    #[serde(default = "HttpServerConfig::default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            shutdown_grace_seconds: Self::default_shutdown_grace(),
        }
    }
}

impl HttpServerConfig {
    fn default_host() -> String {
        DEFAULT_HTTP_HOST.to_string()
    }

    fn default_port() -> u16 {
        DEFAULT_HTTP_PORT
    }

    fn default_shutdown_grace() -> u64 {
        DEFAULT_SHUTDOWN_GRACE_SECS
    }
}

/// PostgreSQL connection parameters.
///
/// `host`, `user` and `dbname` are required. `password` is optional (trust or
/// peer auth) and never defaulted.
#[derive(Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "DatabaseConfig::default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    pub password: Option<String>,
    #[serde(default)]
    pub dbname: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Self::default_port(),
            user: String::new(),
            password: None,
            dbname: String::new(),
        }
    }
}

impl DatabaseConfig {
    fn default_port() -> u16 {
        DEFAULT_POSTGRES_PORT
    }

    /// Check if a password is configured
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("dbname", &self.dbname)
            .finish()
    }
}

/// Redis connection parameters. `host` is required.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default = "CacheConfig::default_port")]
    pub port: u16,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: Self::default_port(),
        }
    }
}

impl CacheConfig {
    fn default_port() -> u16 {
        DEFAULT_REDIS_PORT
    }
}

/// Probe execution settings
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Deadline applied to each probe individually
    #[serde(default = "ProbeSettings::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Run probes concurrently (fan-out/fan-in) instead of one after another
    #[serde(default = "ProbeSettings::default_concurrent")]
    pub concurrent: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            concurrent: Self::default_concurrent(),
        }
    }
}

impl ProbeSettings {
    fn default_timeout_ms() -> u64 {
        DEFAULT_PROBE_TIMEOUT_MS
    }

    fn default_concurrent() -> bool {
        true
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadinessConfig {
    /// Version reported by `/ready`. Defaults to the crate version.
    pub version: Option<String>,
}

impl ReadinessConfig {
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(PKG_VERSION)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` allows any origin.
    #[serde(default = "CorsConfig::default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Self::default_allowed_origins(),
        }
    }
}

impl CorsConfig {
    fn default_allowed_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "text" (human-readable, default) or "json" (structured)
    #[serde(default = "LoggingConfig::default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_LOG_FORMAT.to_string(),
        }
    }
}

impl LoggingConfig {
    fn default_format() -> String {
        DEFAULT_LOG_FORMAT.to_string()
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from `path`, overlay the process environment and validate.
    ///
    /// An explicit path must exist. Without one, `DEFAULT_CONFIG_PATH` is read
    /// if present and defaults are used otherwise.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file without applying the environment or validating.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay values from an environment lookup. Set variables win over the file.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = lookup(ENV_HTTP_HOST) {
            self.http.host = host;
        }
        if let Some(port) = lookup(ENV_HTTP_PORT) {
            self.http.port = parse_port(ENV_HTTP_PORT, &port)?;
        }
        if let Some(host) = lookup(ENV_DB_HOST) {
            self.database.host = host;
        }
        if let Some(port) = lookup(ENV_DB_PORT) {
            self.database.port = parse_port(ENV_DB_PORT, &port)?;
        }
        if let Some(user) = lookup(ENV_DB_USER) {
            self.database.user = user;
        }
        if let Some(password) = lookup(ENV_DB_PASSWORD) {
            self.database.password = Some(password);
        }
        if let Some(dbname) = lookup(ENV_DB_NAME) {
            self.database.dbname = dbname;
        }
        if let Some(host) = lookup(ENV_CACHE_HOST) {
            self.cache.host = host;
        }
        if let Some(port) = lookup(ENV_CACHE_PORT) {
            self.cache.port = parse_port(ENV_CACHE_PORT, &port)?;
        }

        Ok(())
    }

    /// Reject configurations that cannot possibly probe anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("database.host", ENV_DB_HOST, &self.database.host),
            ("database.user", ENV_DB_USER, &self.database.user),
            ("database.dbname", ENV_DB_NAME, &self.database.dbname),
            ("cache.host", ENV_CACHE_HOST, &self.cache.host),
        ];

        let missing: Vec<String> = required
            .iter()
            .filter(|(_, _, value)| value.trim().is_empty())
            .map(|(field, env, _)| format!("{} (or {})", field, env))
            .collect();

        if !missing.is_empty() {
            return Err(ConfigError::Validation(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        if self.probe.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "probe.timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(ConfigError::Validation(
                "cors.allowed_origins must not be empty (use [\"*\"] to allow any origin)".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Validation(format!("{} is not a valid port: {:?}", var, value)))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
}
