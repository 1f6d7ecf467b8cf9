use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gemini::{GeminiClient, GeminiSettings};
use crate::resilience::{CircuitBreakerConfig, RetryConfig};
use crate::stub::StubAssistant;
use crate::{AssistError, ClaimComparator, ImageAnalyzer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    /// Offline deterministic collaborator.
    #[default]
    Stub,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistConfig {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default = "AssistConfig::default_base_url")]
    pub base_url: String,
    /// Usually supplied through the environment rather than the file.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "AssistConfig::default_model")]
    pub vision_model: String,
    #[serde(default = "AssistConfig::default_model")]
    pub text_model: String,
    #[serde(
        with = "crate::serde_millis",
        default = "AssistConfig::default_request_timeout"
    )]
    pub request_timeout: Duration,
    #[serde(
        with = "crate::serde_millis",
        default = "AssistConfig::default_connect_timeout"
    )]
    pub connect_timeout: Duration,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            base_url: Self::default_base_url(),
            api_key: None,
            vision_model: Self::default_model(),
            text_model: Self::default_model(),
            request_timeout: Self::default_request_timeout(),
            connect_timeout: Self::default_connect_timeout(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl AssistConfig {
    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com".into()
    }

    fn default_model() -> String {
        "gemini-1.5-flash".into()
    }

    fn default_request_timeout() -> Duration {
        Duration::from_secs(15)
    }

    fn default_connect_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn stub() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), AssistError> {
        if self.provider == Provider::Gemini {
            if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                return Err(AssistError::InvalidConfig(
                    "assist.api_key is required when provider is gemini".into(),
                ));
            }
            if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
                return Err(AssistError::InvalidConfig(
                    "assist.base_url must be an http(s) URL".into(),
                ));
            }
            if self.vision_model.trim().is_empty() || self.text_model.trim().is_empty() {
                return Err(AssistError::InvalidConfig(
                    "assist model names must not be empty".into(),
                ));
            }
        }
        if self.request_timeout.is_zero() {
            return Err(AssistError::InvalidConfig(
                "assist.request_timeout must be greater than zero".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(AssistError::InvalidConfig(
                "assist.circuit_breaker.failure_threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Collaborators, AssistError> {
        self.validate()?;
        match self.provider {
            Provider::Stub => Ok(Collaborators::shared(Arc::new(StubAssistant::new()))),
            Provider::Gemini => {
                let client = GeminiClient::new(GeminiSettings {
                    base_url: self.base_url.clone(),
                    api_key: self.api_key.clone().unwrap_or_default(),
                    vision_model: self.vision_model.clone(),
                    text_model: self.text_model.clone(),
                    request_timeout: self.request_timeout,
                    connect_timeout: self.connect_timeout,
                    retry: self.retry,
                    circuit_breaker: self.circuit_breaker,
                })?;
                Ok(Collaborators::shared(Arc::new(client)))
            }
        }
    }
}

/// The two AI roles, possibly backed by one object.
#[derive(Clone)]
pub struct Collaborators {
    pub comparator: Arc<dyn ClaimComparator>,
    pub analyzer: Arc<dyn ImageAnalyzer>,
}

impl Collaborators {
    pub fn shared<T>(assistant: Arc<T>) -> Self
    where
        T: ClaimComparator + ImageAnalyzer + 'static,
    {
        Self {
            comparator: assistant.clone(),
            analyzer: assistant,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
