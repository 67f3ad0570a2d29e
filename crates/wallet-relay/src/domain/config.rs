//! Relay configuration with validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub use self::humantime_serde::parse_duration;

/// Default per-request timeout (five minutes).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Default bound on waiting for the browser to attach.
pub const BROWSER_TIMEOUT: Duration = Duration::from_secs(60);

/// Main relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Bind address (loopback only)
    pub host: IpAddr,
    /// Listen port, 0 for an OS-assigned port
    pub port: u16,
    /// Kill whatever holds `port` and retry the bind once
    pub free_port: bool,
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// How long operations wait for a browser to attach
    #[serde(with = "humantime_serde")]
    pub browser_timeout: Duration,
    /// Polling interval while waiting for attachment
    #[serde(with = "humantime_serde")]
    pub attach_poll_interval: Duration,
    /// Grace period after attach before the first operation goes out
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Max wait for the server task on close
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
    /// Browser selection
    pub browser: BrowserConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            free_port: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            browser_timeout: BROWSER_TIMEOUT,
            attach_poll_interval: Duration::from_millis(50),
            settle_delay: Duration::from_millis(500),
            shutdown_grace: Duration::from_secs(2),
            browser: BrowserConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with `WALLET_RELAY_*` environment variables.
    ///
    /// - `WALLET_RELAY_PORT`: listen port
    /// - `WALLET_RELAY_FREE_PORT`: `true`/`1` to reclaim an occupied port
    /// - `WALLET_RELAY_TIMEOUT`: per-request timeout (`300s`, `5m`, `1500ms`)
    /// - `WALLET_RELAY_BROWSER`: browser executable
    /// - `WALLET_RELAY_PROFILE`: browser profile
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(port) = env::var("WALLET_RELAY_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("WALLET_RELAY_PORT", port.clone()))?;
        }
        if let Ok(v) = env::var("WALLET_RELAY_FREE_PORT") {
            config.free_port = v.to_lowercase() == "true" || v == "1";
        }
        if let Ok(timeout) = env::var("WALLET_RELAY_TIMEOUT") {
            config.request_timeout = humantime_serde::parse_duration(&timeout)
                .map_err(|_| ConfigError::InvalidValue("WALLET_RELAY_TIMEOUT", timeout.clone()))?;
        }
        if let Ok(browser) = env::var("WALLET_RELAY_BROWSER") {
            config.browser.executable = Some(browser);
        }
        if let Ok(profile) = env::var("WALLET_RELAY_PROFILE") {
            config.browser.profile = Some(profile);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.host.is_loopback() {
            return Err(ConfigError::NotLoopback(self.host));
        }

        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request_timeout cannot be 0".into(),
            ));
        }

        if self.browser_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "browser_timeout cannot be 0".into(),
            ));
        }

        if self.attach_poll_interval.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "attach_poll_interval cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Get server bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Browser selection passed through to the launcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Open a browser on initialize
    pub launch: bool,
    /// Browser executable (None = platform default opener)
    pub executable: Option<String>,
    /// Browser profile
    pub profile: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            launch: true,
            executable: None,
            profile: None,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins (`*` for any)
    pub allowed_origins: Vec<String>,
    /// Preflight cache max-age in seconds
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            max_age: 600,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("relay must bind a loopback address, got {0}")]
    NotLoopback(IpAddr),
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(&'static str, String),
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
