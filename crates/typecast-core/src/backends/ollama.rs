//! Ollama backend over the local `/api/generate` endpoint

use serde_json::{json, Value};
use url::Url;

use crate::backends::openai::require_env;
use crate::backends::retry::{execute_with_retry, RetryPolicy, TransportError};
use crate::backends::LanguageModel;
use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::types::SamplingParams;

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the Ollama backend
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base endpoint, e.g. `http://localhost:11434/`
    pub endpoint: String,
    /// Local model name, e.g. `llama3`
    pub model: String,
    /// Request timeout in seconds; local generation can be slow
    pub timeout_secs: u64,
}

impl OllamaConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from `OLLAMA_ENDPOINT` and `OLLAMA_MODEL`
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Ok(Self {
            endpoint: require_env("OLLAMA_ENDPOINT")?,
            model: require_env("OLLAMA_MODEL")?,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }
}

/// Ollama [`LanguageModel`] adapter
#[derive(Debug)]
pub struct OllamaModel {
    client: reqwest::Client,
    generate_url: Url,
    config: OllamaConfig,
    retry: RetryPolicy,
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let base = Url::parse(&config.endpoint).map_err(|e| Error::Configuration {
            message: format!("invalid Ollama endpoint '{}'", config.endpoint),
            source: Some(anyhow::anyhow!(e)),
        })?;
        let generate_url = base.join("api/generate").map_err(|e| Error::Configuration {
            message: format!("invalid Ollama endpoint '{}'", config.endpoint),
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
            generate_url,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn request_body(&self, prompt: &str, sampling: &SamplingParams) -> Value {
        let mut options = json!({});
        if let Some(temperature) = sampling.temperature {
            options["temperature"] = json!(temperature);
        }
        if let Some(top_p) = sampling.top_p {
            options["top_p"] = json!(top_p);
        }
        json!({
            "model": self.config.model,
            "prompt": prompt,
            "options": options,
            "stream": false,
        })
    }

    async fn complete(&self, body: &Value) -> Result<String> {
        let response = execute_with_retry(
            || async {
                let response = self
                    .client
                    .post(self.generate_url.clone())
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
            backend: "ollama".to_string(),
            message: e.to_string(),
            source: None,
        })?;

        response["response"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::backend("ollama", "response carried no completion text"))
    }
}

impl LanguageModel for OllamaModel {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_joined_from_base() {
        let model = OllamaModel::new(OllamaConfig::new("http://localhost:11434/", "llama3")).unwrap();
        assert_eq!(
            model.generate_url.as_str(),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let model = OllamaModel::new(OllamaConfig::new("http://localhost:11434/", "llama3")).unwrap();
        let sampling = SamplingParams {
            temperature: Some(0.5),
            ..Default::default()
        };
        let body = model.request_body("hello", &sampling);
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["prompt"], "hello");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["temperature"], 0.5);
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let err = OllamaModel::new(OllamaConfig::new("::nope::", "llama3")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }
}
