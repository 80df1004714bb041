//! Document generation through an external text-generation service.
//!
//! The session only sees the [`DocumentGenerator`] trait. The concrete
//! backend is Google Gemini, reached over its REST API with `reqwest`.

pub mod gemini;

pub use gemini::GeminiGenerator;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{ConfigError, LlmError};

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";

/// Model tried first unless `GEMINI_MODEL` says otherwise.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-05-20";

/// Tried in order when the preferred model does not exist.
pub const FALLBACK_MODELS: &[&str] = &["gemini-1.5-flash", "gemini-1.5-pro", "gemini-pro"];

/// Submit a prompt, receive a document.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Check that the generator has what it needs (credentials) before any
    /// request is made.
    fn configure(&self) -> Result<(), ConfigError>;

    /// Generate a document. A single request per model; failures are not
    /// retried.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Configuration for the generation backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
}

impl LlmConfig {
    /// Read `GEMINI_API_KEY` and `GEMINI_MODEL`. A missing key is not an
    /// error here; it surfaces from [`DocumentGenerator::configure`] when a
    /// submission is attempted.
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .map(|k| k.trim().trim_matches(['"', '\'']).to_string())
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        let model = std::env::var(MODEL_VAR)
            .ok()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self { api_key, model }
    }

    /// The preferred model followed by every fallback not equal to it.
    pub fn model_chain(&self) -> Vec<String> {
        std::iter::once(self.model.clone())
            .chain(
                FALLBACK_MODELS
                    .iter()
                    .filter(|m| **m != self.model)
                    .map(|m| m.to_string()),
            )
            .collect()
    }
}
