//! Gemini backend, `models/{model}:generateContent` over HTTPS.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{API_KEY_VAR, DocumentGenerator, LlmConfig};
use crate::error::{ConfigError, LlmError};

const PROVIDER: &str = "gemini";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Gemini REST client.
pub struct GeminiGenerator {
    config: LlmConfig,
    client: reqwest::Client,
    api_base: String,
}

impl GeminiGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            api_base: API_BASE.to_string(),
        }
    }

    /// Point the client at another endpoint (a proxy or a local stub).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.api_base)
    }

    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| LlmError::AuthFailed {
            provider: PROVIDER.into(),
        })?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = resp.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.into(),
            reason: e.to_string(),
        })?;

        check_status(status, model, retry_after, &text)?;
        extract_text(&text)
    }
}

#[async_trait]
impl DocumentGenerator for GeminiGenerator {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn configure(&self) -> Result<(), ConfigError> {
        match &self.config.api_key {
            Some(key) => {
                tracing::info!("Configuring Gemini API with key: {}", mask_key(key.expose_secret()));
                Ok(())
            }
            None => Err(ConfigError::MissingEnvVar(API_KEY_VAR.to_string())),
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let mut last_err = None;
        for model in self.config.model_chain() {
            tracing::info!(model = %model, "Requesting generation");
            match self.generate_with_model(&model, prompt).await {
                Ok(text) => {
                    tracing::info!(model = %model, chars = text.len(), "Generation succeeded");
                    return Ok(text);
                }
                Err(LlmError::ModelNotAvailable { provider, model }) => {
                    tracing::warn!(model = %model, "Model not available, trying next fallback");
                    last_err = Some(LlmError::ModelNotAvailable { provider, model });
                }
                Err(e) => {
                    tracing::error!(model = %model, "Generation failed: {}", e);
                    return Err(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: "no models configured".into(),
        }))
    }
}

fn check_status(
    status: StatusCode,
    model: &str,
    retry_after: Option<Duration>,
    body: &str,
) -> Result<(), LlmError> {
    if status.is_success() {
        return Ok(());
    }
    Err(match status {
        StatusCode::NOT_FOUND => LlmError::ModelNotAvailable {
            provider: PROVIDER.into(),
            model: model.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthFailed {
            provider: PROVIDER.into(),
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            provider: PROVIDER.into(),
            retry_after,
        },
        _ => LlmError::RequestFailed {
            provider: PROVIDER.into(),
            reason: format!("HTTP {status}: {}", body.chars().take(500).collect::<String>()),
        },
    })
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let response: GenerateResponse = serde_json::from_str(body)?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: PROVIDER.into(),
            reason: "response contained no text".into(),
        });
    }
    Ok(text)
}

/// Keep the first five and last four characters: `abcde...wxyz`.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 9 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
