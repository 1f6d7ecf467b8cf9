//! YAML configuration for a lost & found deployment.
//!
//! One file describes every component: identity policy, item store,
//! matcher, claim desk and AI collaborators. Secrets are normally left out
//! of the file and supplied through the environment.
//!
//! ```yaml
//! version: "1.0"
//! name: "campus"
//!
//! auth:
//!   allowed_domain: "iare.ac.in"
//!   token_ttl_secs: 3600
//!
//! store:
//!   backend: "redb"
//!   path: "/var/lib/lostfound/items.redb"
//!   compression: "zstd"
//!   max_image_bytes: 786432
//!
//! matcher:
//!   min_title_chars: 3
//!
//! claims:
//!   verification_timeout_ms: 20000
//!   idle_ttl_secs: 1800
//!
//! assist:
//!   provider: "gemini"
//!   vision_model: "gemini-1.5-flash"
//!   text_model: "gemini-1.5-flash"
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use assist::AssistConfig;
use claims::ClaimsConfig;
use items::{DEFAULT_MAX_IMAGE_BYTES, EmailDomainPolicy};
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use store::{BackendConfig, CompressionCodec, CompressionConfig, StoreConfig};
use thiserror::Error;

/// Environment variable holding the session token signing secret.
pub const TOKEN_SECRET_ENV: &str = "LOSTFOUND_TOKEN_SECRET";
/// Environment variables checked, in order, for the AI provider key.
pub const AI_API_KEY_ENV: [&str; 2] = ["LOSTFOUND_AI_API_KEY", "GEMINI_API_KEY"];

/// Largest document the original managed store accepted.
const DOCUMENT_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LostFoundConfig {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub auth: AuthYamlConfig,

    #[serde(default)]
    pub store: StoreYamlConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub claims: ClaimsYamlConfig,

    #[serde(default)]
    pub assist: AssistConfig,
}

impl Default for LostFoundConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            auth: AuthYamlConfig::default(),
            store: StoreYamlConfig::default(),
            matcher: MatchConfig::default(),
            claims: ClaimsYamlConfig::default(),
            assist: AssistConfig::default(),
        }
    }
}

impl LostFoundConfig {
    /// Read, apply environment secrets, then validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        let mut config: LostFoundConfig = serde_yaml::from_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LostFoundConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Fill secrets from `lookup`. Values already present in the file are
    /// replaced only by non-empty variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(secret) = non_empty(TOKEN_SECRET_ENV) {
            self.auth.token_secret = Some(secret);
        }
        if let Some(key) = AI_API_KEY_ENV.iter().find_map(|key| non_empty(key)) {
            self.assist.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.auth.validate()?;
        self.store.validate()?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.claims.validate()?;
        self.assist
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        Ok(())
    }

    pub fn domain_policy(&self) -> EmailDomainPolicy {
        EmailDomainPolicy::new(&self.auth.allowed_domain)
    }

    pub fn store_config(&self) -> StoreConfig {
        self.store.to_store_config()
    }

    pub fn claims_config(&self) -> ClaimsConfig {
        ClaimsConfig {
            verification_timeout: self.claims.verification_timeout(),
            idle_ttl: Duration::from_secs(self.claims.idle_ttl_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthYamlConfig {
    /// Email domain accepted at sign-in, with or without the leading `@`.
    #[serde(default = "default_allowed_domain")]
    pub allowed_domain: String,

    /// HS256 secret for ID tokens.
    #[serde(default)]
    pub token_secret: Option<String>,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthYamlConfig {
    fn default() -> Self {
        Self {
            allowed_domain: default_allowed_domain(),
            token_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl AuthYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        let domain = self.allowed_domain.trim().trim_start_matches('@');
        if domain.is_empty() || !domain.contains('.') || domain.contains('@') {
            return Err(ConfigLoadError::Validation(format!(
                "auth.allowed_domain is not a domain: {:?}",
                self.allowed_domain
            )));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "auth.token_ttl_secs must be greater than zero".into(),
            ));
        }
        if let Some(secret) = &self.token_secret {
            if secret.len() < 16 {
                return Err(ConfigLoadError::Validation(
                    "auth.token_secret must be at least 16 bytes".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    #[default]
    InMemory,
    Redb,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreCompression {
    None,
    #[default]
    Zstd,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreYamlConfig {
    #[serde(default)]
    pub backend: StoreBackendKind,

    /// redb file; required for the redb backend.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub compression: StoreCompression,

    #[serde(default = "default_compression_level")]
    pub compression_level: i32,

    /// Cap on the base64 payload of an embedded photo.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            path: None,
            compression: StoreCompression::default(),
            compression_level: default_compression_level(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.backend == StoreBackendKind::Redb
            && self.path.as_deref().is_none_or(|p| p.trim().is_empty())
        {
            return Err(ConfigLoadError::Validation(
                "store.path is required for the redb backend".into(),
            ));
        }
        if self.compression == StoreCompression::Zstd && !(1..=22).contains(&self.compression_level)
        {
            return Err(ConfigLoadError::Validation(
                "store.compression_level must be between 1 and 22".into(),
            ));
        }
        if self.max_image_bytes == 0 || self.max_image_bytes >= DOCUMENT_LIMIT_BYTES {
            return Err(ConfigLoadError::Validation(format!(
                "store.max_image_bytes must be between 1 and {}",
                DOCUMENT_LIMIT_BYTES - 1
            )));
        }
        Ok(())
    }

    fn to_store_config(&self) -> StoreConfig {
        let backend = match (self.backend, &self.path) {
            (StoreBackendKind::Redb, Some(path)) => BackendConfig::redb(path.clone()),
            _ => BackendConfig::in_memory(),
        };
        let compression = match self.compression {
            StoreCompression::None => CompressionConfig::none(),
            StoreCompression::Zstd => CompressionConfig {
                codec: CompressionCodec::Zstd,
                level: self.compression_level,
            },
        };
        StoreConfig::new()
            .with_backend(backend)
            .with_compression(compression)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimsYamlConfig {
    #[serde(default = "default_verification_timeout_ms")]
    pub verification_timeout_ms: u64,
    /// Unfinished claims untouched this long are discarded.
    #[serde(default = "default_claim_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

impl Default for ClaimsYamlConfig {
    fn default() -> Self {
        Self {
            verification_timeout_ms: default_verification_timeout_ms(),
            idle_ttl_secs: default_claim_idle_ttl_secs(),
        }
    }
}

impl ClaimsYamlConfig {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_millis(self.verification_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.verification_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "claims.verification_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.idle_ttl_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "claims.idle_ttl_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_allowed_domain() -> String {
    "iare.ac.in".to_string()
}
fn default_token_ttl_secs() -> u64 {
    3600
}
fn default_compression_level() -> i32 {
    3
}
fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}
fn default_verification_timeout_ms() -> u64 {
    20_000
}
fn default_claim_idle_ttl_secs() -> u64 {
    30 * 60
}
