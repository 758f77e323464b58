//! Model calls with key rotation, backoff and model fallback

use crate::config::ModelConfig;
use crate::error::{DeepfixError, ModelError};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Longest wait honored from a server-supplied retry hint
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// First backoff step when only one key is available
const BASE_BACKOFF: Duration = Duration::from_secs(5);

/// A text-generation backend
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send `prompt` to `model` and return the reply text
    async fn generate(&self, model: &str, api_key: &str, prompt: &str) -> Result<String, ModelError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
    async fn generate(&self, model: &str, api_key: &str, prompt: &str) -> Result<String, ModelError> {
        (**self).generate(model, api_key, prompt).await
    }
}

/// Gemini `generateContent` over HTTP
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DeepfixError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeepfixError::other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ModelConfig) -> Result<Self, DeepfixError> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, model: &str, api_key: &str, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
            },
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::classify(model, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::classify(model, e.to_string()))?;
        if !status.is_success() {
            return Err(ModelError::classify(model, format!("{}: {}", status, text)));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| ModelError::InvalidResponse {
            model: model.to_string(),
            message: format!("Response body is not JSON: {}", e),
        })?;

        let parts: Vec<&str> = value
            .pointer("/candidates/0/content/parts")
            .and_then(Value::as_array)
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();
        if parts.is_empty() {
            return Err(ModelError::InvalidResponse {
                model: model.to_string(),
                message: "Response has no candidate text".to_string(),
            });
        }
        Ok(parts.concat())
    }
}

/// API keys shared round-robin across calls
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<String>,
    index: AtomicUsize,
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys,
            index: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn current(&self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.index.load(Ordering::Relaxed) % self.keys.len();
        Some(&self.keys[index])
    }

    /// Advance to the next key and return its position
    pub fn rotate(&self) -> usize {
        let len = self.keys.len().max(1);
        (self.index.fetch_add(1, Ordering::Relaxed) + 1) % len
    }
}

/// Counters describing how hard the transport had to work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransportStats {
    pub key_rotations: usize,
    pub model_fallbacks: usize,
}

/// Retry policy wrapped around a [`ModelClient`]
pub struct Transport<C> {
    client: C,
    keys: KeyPool,
    models: Vec<String>,
    max_retries: u32,
    key_rotations: AtomicUsize,
    model_fallbacks: AtomicUsize,
}

impl<C: ModelClient> Transport<C> {
    pub fn new(client: C, keys: Vec<String>, models: Vec<String>, max_retries: u32) -> Self {
        Self {
            client,
            keys: KeyPool::new(keys),
            models,
            max_retries,
            key_rotations: AtomicUsize::new(0),
            model_fallbacks: AtomicUsize::new(0),
        }
    }

    pub fn from_config(client: C, config: &ModelConfig) -> Self {
        Self::new(
            client,
            config.api_keys.clone(),
            config.models.clone(),
            config.max_retries,
        )
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            key_rotations: self.key_rotations.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
        }
    }

    /// Generate a reply, returning it with the model that produced it
    ///
    /// Quota and overload failures rotate keys when several are configured, or
    /// back off exponentially on a single key. Once a model's retries are spent
    /// the next model is tried. Any other failure is returned immediately.
    pub async fn generate(&self, prompt: &str) -> Result<(String, String), ModelError> {
        if self.models.is_empty() {
            return Err(ModelError::NoModels);
        }
        if self.keys.is_empty() {
            return Err(ModelError::NoApiKeys);
        }

        let rotation_budget = self.keys.len() * self.max_retries as usize;
        let mut last_error = ModelError::NoModels;

        for (position, model) in self.models.iter().enumerate() {
            if position > 0 {
                self.model_fallbacks.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(model = %model, "Falling back to next model");
            }

            let mut rotations = 0usize;
            let mut backoffs = 0u32;
            loop {
                let key = self.keys.current().ok_or(ModelError::NoApiKeys)?;
                let error = match self.client.generate(model, key, prompt).await {
                    Ok(text) => {
                        tracing::debug!(model = %model, chars = text.len(), "Model replied");
                        return Ok((text, model.clone()));
                    }
                    Err(e) if e.is_quota() => e,
                    Err(e) => return Err(e),
                };

                let hinted = parse_retry_delay(error.message());
                if self.keys.len() > 1 {
                    if rotations >= rotation_budget {
                        last_error = error;
                        break;
                    }
                    rotations += 1;
                    let next = self.keys.rotate();
                    self.key_rotations.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(model = %model, key_index = next, "Quota hit, rotating API key");
                    if let Some(delay) = hinted {
                        tokio::time::sleep(delay).await;
                    }
                } else {
                    if backoffs >= self.max_retries {
                        last_error = error;
                        break;
                    }
                    let delay = hinted.unwrap_or_else(|| BASE_BACKOFF * 2u32.pow(backoffs));
                    backoffs += 1;
                    tracing::warn!(
                        model = %model,
                        attempt = backoffs,
                        max_retries = self.max_retries,
                        backoff_secs = delay.as_secs(),
                        "Quota hit, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(last_error)
    }
}

static RETRY_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)retry in (\d+(?:\.\d+)?)\s*s").unwrap());

static RETRY_DELAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""retryDelay"\s*:\s*"(\d+(?:\.\d+)?)s""#).unwrap());

/// Server-suggested wait found in an error message, capped at one minute
pub fn parse_retry_delay(message: &str) -> Option<Duration> {
    let secs: f64 = RETRY_IN_RE
        .captures(message)
        .or_else(|| RETRY_DELAY_RE.captures(message))?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    Some(Duration::from_secs_f64(secs).min(MAX_RETRY_DELAY))
}
