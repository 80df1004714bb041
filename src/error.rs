//! Error types for the portfolio builder.

use std::path::PathBuf;
use std::time::Duration;

/// Fatal errors raised while preparing a session.
///
/// These end the process: a questionnaire never starts with a partial
/// question list or an unreadable schema.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Outline document not found (looked in {})", format_paths(.searched))]
    OutlineNotFound { searched: Vec<PathBuf> },

    #[error("Invalid JSON in schema file {path}: {source}")]
    SchemaInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the generation service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Model {model} not available on provider {provider}")]
    ModelNotAvailable { provider: String, model: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prompt construction errors.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("No responses to build a prompt from")]
    NoResponses,

    #[error("Failed to serialize responses: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure to read a persisted response file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed response file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a session transition. All of them are recoverable: the
/// caller reports the message and the session stays active.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No responses to save")]
    EmptyResponses,

    #[error("Invalid student ID {0:?}: must not be blank or contain path separators or '..'")]
    InvalidStudentId(String),

    #[error("Error configuring the generation service: {0}")]
    Config(#[from] ConfigError),

    #[error("Error generating prompt: {0}")]
    Prompt(#[from] PromptError),

    #[error("Error from the generation service: {0}")]
    Generation(#[from] LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
