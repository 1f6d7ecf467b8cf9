use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Process-level settings: network, limits, logging.
///
/// Item, matcher, claim and AI settings live in the YAML file named by
/// `app_config`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Requests per minute per signed-in user
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Path to the lost & found YAML configuration. Defaults apply when unset.
    #[serde(default)]
    pub app_config: Option<String>,

    /// Mark the session cookie `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            app_config: None,
            secure_cookies: false,
        }
    }
}

impl ServerConfig {
    /// Load from an optional `server.*` file and `LOSTFOUND_SERVER__*`
    /// environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("LOSTFOUND_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("timeout_secs must be greater than zero");
        }
        if self.max_body_size_mb == 0 {
            anyhow::bail!("max_body_size_mb must be greater than zero");
        }
        if self.rate_limit_per_minute == 0 {
            anyhow::bail!("rate_limit_per_minute must be greater than zero");
        }
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    2
}

fn default_rate_limit_per_minute() -> u32 {
    120
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
