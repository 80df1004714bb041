//! Configuration types.
//!
//! All filesystem locations live in [`AppConfig`], which is built once at
//! process start and passed down explicitly. Directory creation happens in
//! [`AppConfig::ensure_dirs`], never as a side effect of constructing
//! anything else.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::ConfigError;

/// Outline file name, looked up in the templates dir and then the base dir.
pub const OUTLINE_FILE: &str = "QS_STATEMENT_OF_INTENT.md";
/// Optional structural reference schema, under the data dir.
pub const SCHEMA_FILE: &str = "statement_intent_schema.json";
pub const STATEMENT_TEMPLATE_FILE: &str = "statement_template.md";
pub const STAGE_TEMPLATE_FILE: &str = "stage_template.md";

pub const DEFAULT_STATEMENT_TEMPLATE: &str = "\
# Statement of Intent: {student_name}

## Project Title
{project_title}

## Project Description
{project_description}

## Project Goals
{project_goals}

## Timeline
{timeline}
";

pub const DEFAULT_STAGE_TEMPLATE: &str = "\
# {stage_title}

## Progress Update
{progress_update}

## Challenges Faced
{challenges}

## Next Steps
{next_steps}
";

/// Filesystem layout of the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory; `.env` and the fallback outline are looked up here.
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub students_dir: PathBuf,
    /// Response snapshots (`{slug}_{student_id}.json`).
    pub responses_dir: PathBuf,
    /// Generated documents, one subdirectory per student.
    pub generated_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Explicit outline location; overrides the templates/base lookup.
    pub outline_override: Option<PathBuf>,
}

impl AppConfig {
    /// Lay out every directory under `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let data_dir = base_dir.join("data");
        Self {
            students_dir: data_dir.join("students"),
            responses_dir: data_dir.join("responses"),
            generated_dir: data_dir.join("generated"),
            log_dir: data_dir.join("logs"),
            templates_dir: base_dir.join("templates"),
            data_dir,
            base_dir,
            outline_override: None,
        }
    }

    /// Build from `PORTFOLIO_HOME` (default: current directory) and
    /// `PORTFOLIO_OUTLINE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_dir = match std::env::var("PORTFOLIO_HOME") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => std::env::current_dir()?,
        };

        let mut config = Self::with_base_dir(base_dir);
        if let Ok(outline) = std::env::var("PORTFOLIO_OUTLINE")
            && !outline.trim().is_empty()
        {
            config.outline_override = Some(outline_path(&outline)?);
        }
        Ok(config)
    }

    /// Candidate outline locations, in lookup order.
    pub fn outline_candidates(&self) -> Vec<PathBuf> {
        match &self.outline_override {
            Some(path) => vec![path.clone()],
            None => vec![
                self.templates_dir.join(OUTLINE_FILE),
                self.base_dir.join(OUTLINE_FILE),
            ],
        }
    }

    pub fn schema_path(&self) -> PathBuf {
        self.data_dir.join(SCHEMA_FILE)
    }

    /// Create the directory layout and the default templates.
    ///
    /// Idempotent: existing directories and templates are left untouched.
    pub async fn ensure_dirs(&self) -> Result<(), ConfigError> {
        for dir in [
            &self.students_dir,
            &self.responses_dir,
            &self.generated_dir,
            &self.templates_dir,
            &self.log_dir,
        ] {
            fs::create_dir_all(dir).await?;
        }

        write_if_missing(
            &self.templates_dir.join(STATEMENT_TEMPLATE_FILE),
            DEFAULT_STATEMENT_TEMPLATE,
        )
        .await?;
        write_if_missing(
            &self.templates_dir.join(STAGE_TEMPLATE_FILE),
            DEFAULT_STAGE_TEMPLATE,
        )
        .await?;
        Ok(())
    }

    /// Load `<base>/.env` into the process environment, if present.
    pub fn load_dotenv(&self) {
        let path = self.base_dir.join(".env");
        match dotenvy::from_path(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(path = %path.display(), "Could not load .env: {}", e),
        }
    }
}

/// `PORTFOLIO_OUTLINE` must name a file, not a directory.
fn outline_path(value: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(value.trim());
    if path.is_dir() {
        return Err(ConfigError::InvalidValue {
            key: "PORTFOLIO_OUTLINE".into(),
            message: format!("{} is a directory", path.display()),
        });
    }
    Ok(path)
}

async fn write_if_missing(path: &Path, content: &str) -> Result<(), ConfigError> {
    if fs::try_exists(path).await? {
        return Ok(());
    }
    fs::write(path, content).await?;
    tracing::info!(path = %path.display(), "Created default template");
    Ok(())
}
