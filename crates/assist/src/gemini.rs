//! Gemini `generateContent` client.
//!
//! One instance serves both collaborator roles: the vision model analyzes
//! photos, the text model compares claims. Calls go through the retry loop
//! and a circuit breaker shared by both roles.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::prompt::{
    claim_comparison_prompt, parse_claim_assessment, parse_item_analysis, IMAGE_ANALYSIS_PROMPT,
};
use crate::resilience::{retry_transient, CircuitBreaker, CircuitBreakerConfig, RetryConfig};
use crate::{AssistError, ClaimAssessment, ClaimComparator, ImageAnalyzer, ItemAnalysis};

const PROVIDER: &str = "gemini";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub base_url: String,
    pub api_key: String,
    pub vision_model: String,
    pub text_model: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

pub struct GeminiClient {
    http: reqwest::Client,
    settings: GeminiSettings,
    breaker: CircuitBreaker,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Result<Self, AssistError> {
        if settings.api_key.trim().is_empty() {
            return Err(AssistError::InvalidConfig(
                "api_key is required for the gemini provider".into(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| AssistError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self {
            http,
            breaker: CircuitBreaker::new(settings.circuit_breaker),
            settings,
        })
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Send one request (with retries) and return the concatenated text of
    /// the first candidate.
    async fn generate(&self, model: &str, body: Value) -> Result<String, AssistError> {
        if !self.breaker.allow_request() {
            return Err(AssistError::CircuitOpen(PROVIDER.into()));
        }

        let url = self.endpoint(model);
        let result = retry_transient(&self.settings.retry, PROVIDER, |_| {
            self.send(&url, &body)
        })
        .await;

        match result {
            Ok(response) => {
                self.breaker.record_success();
                extract_text(&response)
            }
            Err(err) => {
                if err.is_transient() {
                    self.breaker.record_failure();
                }
                tracing::warn!(
                    target: "lostfound::assist",
                    provider = PROVIDER,
                    model,
                    error = %err,
                    "provider call failed"
                );
                Err(err)
            }
        }
    }

    async fn send(&self, url: &str, body: &Value) -> Result<Value, AssistError> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistError::Http {
                status: status.as_u16(),
                body: truncate(&body, 512),
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiClient {
    async fn analyze(&self, image_base64: &str, mime: &str) -> Result<ItemAnalysis, AssistError> {
        if image_base64.trim().is_empty() {
            return Err(AssistError::MissingInput("image"));
        }
        let body = vision_request(image_base64, mime);
        let text = self.generate(&self.settings.vision_model, body).await?;
        parse_item_analysis(&text)
    }
}

#[async_trait]
impl ClaimComparator for GeminiClient {
    async fn compare(
        &self,
        hidden_details: &str,
        proof: &str,
    ) -> Result<ClaimAssessment, AssistError> {
        if hidden_details.trim().is_empty() {
            return Err(AssistError::MissingInput("hidden_details"));
        }
        if proof.trim().is_empty() {
            return Err(AssistError::MissingInput("proof"));
        }
        let body = text_request(&claim_comparison_prompt(hidden_details, proof));
        let text = self.generate(&self.settings.text_model, body).await?;
        parse_claim_assessment(&text)
    }
}

pub(crate) fn vision_request(image_base64: &str, mime: &str) -> Value {
    let mime = if mime.trim().is_empty() {
        items::DEFAULT_IMAGE_MIME
    } else {
        mime
    };
    json!({
        "contents": [{
            "role": "user",
            "parts": [
                { "text": IMAGE_ANALYSIS_PROMPT },
                { "inlineData": { "mimeType": mime, "data": image_base64 } }
            ]
        }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

pub(crate) fn text_request(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": { "responseMimeType": "application/json" }
    })
}

pub(crate) fn extract_text(response: &Value) -> Result<String, AssistError> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = response
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            AssistError::MalformedResponse(format!("response has no content: {reason}"))
        })?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(AssistError::MalformedResponse("response text is empty".into()));
    }
    Ok(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
