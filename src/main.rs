use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use portfolio_builder::cli::{App, Console, MenuState};
use portfolio_builder::config::AppConfig;
use portfolio_builder::llm::{GeminiGenerator, LlmConfig};
use portfolio_builder::schema::StatementSchema;

#[derive(Parser)]
#[command(name = "portfolio-builder")]
#[command(version)]
#[command(about = "Guided questionnaire that drafts a Statement of Intent")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new questionnaire
    New {
        /// Student ID (defaults to the current timestamp)
        #[arg(long)]
        student_id: Option<String>,
    },

    /// Continue from saved responses
    Load {
        /// Response file to load
        #[arg(long, conflicts_with = "student_id")]
        responses_file: Option<PathBuf>,

        /// Load the newest response file for this student
        #[arg(long)]
        student_id: Option<String>,
    },

    /// List student portfolios and response files
    List {
        /// Show student portfolios
        #[arg(long)]
        students: bool,

        /// Show response files
        #[arg(long)]
        responses: bool,
    },
}

/// Screen the state machine starts on. No subcommand opens the main menu.
fn initial_state(command: Option<Commands>) -> MenuState {
    match command {
        None => MenuState::MainMenu,
        Some(Commands::New { student_id }) => MenuState::NewSession { student_id },
        Some(Commands::Load {
            responses_file,
            student_id,
        }) => MenuState::LoadSession {
            responses_file,
            student_id,
        },
        Some(Commands::List {
            students,
            responses,
        }) => MenuState::List {
            students,
            responses,
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to resolve application directories")?;

    // Logs go to a file so the questionnaire owns the terminal.
    tokio::fs::create_dir_all(&config.log_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "portfolio-builder.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    config.load_dotenv();
    config
        .ensure_dirs()
        .await
        .context("Failed to set up data directories")?;
    tracing::info!(base = %config.base_dir.display(), "Portfolio Builder starting");

    let schema = StatementSchema::load(&config.schema_path()).await?;

    let llm_config = LlmConfig::from_env();
    eprintln!("Portfolio Builder v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data: {}", config.data_dir.display());
    eprintln!("   Model: {}", llm_config.model);
    if llm_config.api_key.is_none() {
        eprintln!("   Warning: GEMINI_API_KEY not set; statements cannot be generated");
    }

    let generator = Arc::new(GeminiGenerator::new(llm_config));
    let console = Console::new(BufReader::new(tokio::io::stdin()));
    let mut app = App::new(config, console, generator, schema);

    if let Err(e) = app.run(initial_state(cli.command)).await {
        tracing::error!("Fatal: {}", e);
        return Err(e.into());
    }

    tracing::info!("Portfolio Builder exiting");
    Ok(())
}
