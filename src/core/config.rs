//! # Configuration Module
//!
//! Gateway configuration is assembled in three steps:
//! 1. serde defaults
//! 2. an optional YAML file (`GATEWAY_CONFIG_PATH`)
//! 3. environment variable overrides
//!
//! followed by `validate()`, which reports every problem at once.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::core::error::ConfigError;
use crate::core::types::MAX_REQUEST_TIMEOUT;

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";

/// Main gateway configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Connection to the user service
    pub backend: BackendConfig,

    /// Bearer credential policy
    pub auth: AuthSettings,

    /// Log output settings
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    pub port: u16,

    /// Hard upper bound for a whole request, including authentication
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum accepted request body size in bytes
    pub max_body_size: usize,

    /// How long in-flight requests may run after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout: Duration::from_secs(60),
            max_body_size: 1024 * 1024,
            shutdown_grace_period: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// User service address; `http://` is assumed when no scheme is given
    pub endpoint: String,

    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Deadline for a single remote call
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,

    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,

    pub enable_compression: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5003".to_string(),
            connect_timeout: Duration::from_secs(10),
            call_timeout: Duration::from_secs(5),
            tcp_keepalive: Some(Duration::from_secs(60)),
            enable_compression: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Header carrying the credential
    pub header: String,

    /// Required scheme in front of the token, compared case-insensitively
    pub scheme: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            header: "authorization".to_string(),
            scheme: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "user_gateway=info,tower_http=info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

impl GatewayConfig {
    /// Load configuration for the running process
    ///
    /// Reads the YAML file named by `GATEWAY_CONFIG_PATH` when set, otherwise starts from
    /// defaults, then applies environment overrides and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML file without applying overrides
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source
    ///
    /// When two variables name the same setting, the first one listed wins.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&'static str]| {
            keys.iter()
                .find_map(|key| lookup(*key).map(|value| (*key, value)))
        };

        if let Some((key, port)) = first(&["GATEWAY_SERVER_PORT", "PORT"]) {
            self.server.port = parse_value(key, &port)?;
        }

        if let Some((_, addr)) = first(&["GATEWAY_SERVER_BIND_ADDRESS"]) {
            self.server.bind_address = addr;
        }

        if let Some((key, timeout)) = first(&["GATEWAY_REQUEST_TIMEOUT"]) {
            self.server.request_timeout = parse_duration(key, &timeout)?;
        }

        if let Some((key, size)) = first(&["GATEWAY_MAX_BODY_SIZE"]) {
            self.server.max_body_size = parse_value(key, &size)?;
        }

        if let Some((_, endpoint)) = first(&["GATEWAY_BACKEND_ENDPOINT", "USER_SERVICE_ADDR"]) {
            self.backend.endpoint = endpoint;
        }

        if let Some((key, timeout)) = first(&["GATEWAY_BACKEND_CALL_TIMEOUT"]) {
            self.backend.call_timeout = parse_duration(key, &timeout)?;
        }

        if let Some((key, timeout)) = first(&["GATEWAY_BACKEND_CONNECT_TIMEOUT"]) {
            self.backend.connect_timeout = parse_duration(key, &timeout)?;
        }

        if let Some((_, scheme)) = first(&["GATEWAY_AUTH_SCHEME"]) {
            self.auth.scheme = scheme;
        }

        if let Some((_, level)) = first(&["GATEWAY_LOG_LEVEL"]) {
            self.logging.level = level;
        }

        if let Some((key, format)) = first(&["GATEWAY_LOG_FORMAT"]) {
            self.logging.format = parse_value(key, &format)?;
        }

        self.backend.endpoint = normalize_endpoint(&self.backend.endpoint);
        Ok(())
    }

    /// Validate the configuration, collecting every problem
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push("server.port must be greater than 0".to_string());
        }

        if self.server.bind_address.is_empty() {
            errors.push("server.bind_address cannot be empty".to_string());
        } else if self.bind_addr().is_none() {
            errors.push(format!(
                "server.bind_address '{}' is not a valid IP address",
                self.server.bind_address
            ));
        }

        if self.server.request_timeout.is_zero() {
            errors.push("server.request_timeout must be greater than 0".to_string());
        } else if self.server.request_timeout > MAX_REQUEST_TIMEOUT {
            errors.push(format!(
                "server.request_timeout cannot exceed {}",
                humantime::format_duration(MAX_REQUEST_TIMEOUT)
            ));
        }

        if self.server.max_body_size == 0 {
            errors.push("server.max_body_size must be greater than 0".to_string());
        }

        if self.backend.call_timeout.is_zero() {
            errors.push("backend.call_timeout must be greater than 0".to_string());
        } else if self.backend.call_timeout > self.server.request_timeout {
            errors.push("backend.call_timeout cannot exceed server.request_timeout".to_string());
        }

        if self.backend.connect_timeout.is_zero() {
            errors.push("backend.connect_timeout must be greater than 0".to_string());
        }

        match Url::parse(&self.backend.endpoint) {
            Ok(url) if url.host_str().is_some() => {}
            Ok(_) => errors.push(format!("backend.endpoint '{}' has no host", self.backend.endpoint)),
            Err(e) => errors.push(format!("backend.endpoint '{}' is invalid: {}", self.backend.endpoint, e)),
        }

        if self.auth.header.is_empty() {
            errors.push("auth.header cannot be empty".to_string());
        } else if axum::http::HeaderName::from_bytes(self.auth.header.to_ascii_lowercase().as_bytes()).is_err() {
            errors.push(format!("auth.header '{}' is not a valid header name", self.auth.header));
        }

        if self.auth.scheme.is_empty() || self.auth.scheme.contains(char::is_whitespace) {
            errors.push("auth.scheme must be a single non-empty word".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Socket address the HTTP listener binds to
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        format!("{}:{}", self.server.bind_address, self.server.port)
            .parse()
            .ok()
            .or_else(|| {
                // IPv6 literals need brackets
                format!("[{}]:{}", self.server.bind_address, self.server.port)
                    .parse()
                    .ok()
            })
    }
}

/// Prefix `http://` onto bare `host:port` endpoints
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidOverride {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidOverride {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
