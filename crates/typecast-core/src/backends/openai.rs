//! OpenAI-compatible chat-completions backend
//!
//! Works against the OpenAI API and any server exposing the same
//! `/chat/completions` surface. Configuration comes from the environment
//! (`.env` supported) or is constructed directly.

use serde_json::{json, Value};
use url::Url;

use crate::backends::retry::{execute_with_retry, RetryPolicy, TransportError};
use crate::backends::LanguageModel;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::SamplingParams;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the OpenAI-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// Full chat-completions endpoint URL
    pub endpoint: String,
    /// Model name passed through in the request body
    pub model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Load configuration from environment variables
    ///
    /// Reads `OPENAI_API_KEY` and `OPENAI_MODEL` (both required) and
    /// `OPENAI_ENDPOINT` (optional). A `.env` file is honored when present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let api_key = require_env("OPENAI_API_KEY")?;
        let model = require_env("OPENAI_MODEL")?;
        let endpoint =
            std::env::var("OPENAI_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Ok(Self {
            api_key,
            endpoint,
            model,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

pub(crate) fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() && value != "?" => Ok(value),
        _ => Err(Error::Configuration {
            message: format!("environment variable {} is not set", name),
            source: None,
        }),
    }
}

/// OpenAI-compatible [`LanguageModel`] adapter
#[derive(Debug)]
pub struct OpenAiModel {
    client: reqwest::Client,
    endpoint: Url,
    config: OpenAiConfig,
    retry: RetryPolicy,
}

impl OpenAiModel {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| Error::Configuration {
            message: format!("invalid OpenAI endpoint '{}'", config.endpoint),
            source: Some(anyhow::anyhow!(e)),
        })?;
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration {
                message: "failed to construct HTTP client".to_string(),
                source: Some(anyhow::anyhow!(e)),
            })?;
        Ok(Self {
            client,
            endpoint,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_body(&self, prompt: &str, sampling: &SamplingParams) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = sampling.temperature {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = sampling.top_p {
            body["top_p"] = json!(top_p);
        }
        if let Some(max_tokens) = sampling.max_output_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }

    async fn complete(&self, body: &Value) -> Result<String> {
        let response = execute_with_retry(
            || async {
                let response = self
                    .client
                    .post(self.endpoint.clone())
                    .bearer_auth(&self.config.api_key)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() || e.is_connect() {
                            TransportError::retryable(e.to_string(), None)
                        } else {
                            TransportError::permanent(e.to_string(), None)
                        }
                    })?;

                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await.unwrap_or_default();
                    return Err(TransportError::from_status(status.as_u16(), text));
                }
                response
                    .json::<Value>()
                    .await
                    .map_err(|e| TransportError::permanent(e.to_string(), None))
            },
            &self.retry,
        )
        .await
        .map_err(|e| Error::Backend {
            backend: "openai".to_string(),
            message: e.to_string(),
            source: None,
        })?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::backend("openai", "response carried no message content"))
    }
}

impl LanguageModel for OpenAiModel {
    async fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingParams,
        cancel: &CancelToken,
    ) -> Result<String> {
        let body = self.request_body(prompt, sampling);
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.complete(&body) => result,
        }
    }
}
