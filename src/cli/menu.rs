//! Main-menu state machine.
//!
//! Every screen is a [`MenuState`]; [`App::run`] loops `state = step(state)`
//! until it reaches [`MenuState::Exit`]. A run that starts from a subcommand
//! performs that one action and exits; a run that starts at the main menu
//! comes back to it after every action.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncBufRead;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::llm::DocumentGenerator;
use crate::prompts::{PromptBuilder, StatementPromptBuilder};
use crate::questionnaire::{Session, SessionOutcome, outline};
use crate::schema::StatementSchema;
use crate::store::{ResponseStore, is_valid_student_id};

use super::console::Console;
use super::listing::{render_portfolios, render_responses};
use super::session_runner::{SubmitDeps, run_session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuState {
    MainMenu,
    NewSession {
        student_id: Option<String>,
    },
    LoadSession {
        responses_file: Option<PathBuf>,
        student_id: Option<String>,
    },
    List {
        students: bool,
        responses: bool,
    },
    Exit,
}

pub struct App<R> {
    config: AppConfig,
    store: ResponseStore,
    console: Console<R>,
    prompts: Box<dyn PromptBuilder>,
    generator: Arc<dyn DocumentGenerator>,
    schema: Option<StatementSchema>,
}

impl<R: AsyncBufRead + Unpin> App<R> {
    pub fn new(
        config: AppConfig,
        console: Console<R>,
        generator: Arc<dyn DocumentGenerator>,
        schema: Option<StatementSchema>,
    ) -> Self {
        Self {
            store: ResponseStore::from_config(&config),
            config,
            console,
            prompts: Box::new(StatementPromptBuilder),
            generator,
            schema,
        }
    }

    pub fn with_prompts(mut self, prompts: Box<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Drive the state machine from `initial` until it exits.
    pub async fn run(&mut self, initial: MenuState) -> Result<(), StartupError> {
        let interactive = initial == MenuState::MainMenu;
        let after_action = || {
            if interactive {
                MenuState::MainMenu
            } else {
                MenuState::Exit
            }
        };

        let mut state = initial;
        loop {
            tracing::debug!(state = ?state, "Menu transition");
            state = match state {
                MenuState::MainMenu => self.main_menu().await?,
                MenuState::NewSession { student_id } => {
                    if accept_student_id(student_id.as_deref()) {
                        let student_id = student_id.unwrap_or_else(Session::generate_student_id);
                        self.new_session(student_id, interactive).await?;
                    }
                    after_action()
                }
                MenuState::LoadSession {
                    responses_file,
                    student_id,
                } => {
                    if accept_student_id(student_id.as_deref()) {
                        self.load_session(responses_file, student_id, interactive)
                            .await?;
                    }
                    after_action()
                }
                MenuState::List {
                    students,
                    responses,
                } => {
                    // Neither flag means both listings.
                    let both = !students && !responses;
                    self.list(students || both, responses || both).await?;
                    if interactive {
                        self.console
                            .pause("\nPress ENTER to return to the main menu...")
                            .await?;
                    }
                    after_action()
                }
                MenuState::Exit => break,
            };
        }
        Ok(())
    }

    async fn main_menu(&mut self) -> Result<MenuState, StartupError> {
        println!("\n{}", "=".repeat(50));
        println!("Statement of Intent Portfolio Builder");
        println!("{}", "=".repeat(50));
        println!("1. Start a new questionnaire");
        println!("2. Load saved responses");
        println!("3. List students and response files");
        println!("4. Exit");

        let choice = self
            .console
            .choose("\nChoose an option: ", &["1", "2", "3", "4"])
            .await?;
        Ok(match choice.as_deref() {
            Some("1") => MenuState::NewSession { student_id: None },
            Some("2") => MenuState::LoadSession {
                responses_file: None,
                student_id: None,
            },
            Some("3") => MenuState::List {
                students: false,
                responses: false,
            },
            _ => {
                println!("\nGoodbye!");
                MenuState::Exit
            }
        })
    }

    async fn new_session(&mut self, student_id: String, interactive: bool) -> Result<(), StartupError> {
        println!("\nStarting new questionnaire for student ID: {student_id}");
        let session = self.start_session(student_id).await?;
        self.drive(session, interactive).await
    }

    async fn load_session(
        &mut self,
        responses_file: Option<PathBuf>,
        student_id: Option<String>,
        interactive: bool,
    ) -> Result<(), StartupError> {
        let path = match (responses_file, &student_id) {
            (Some(path), _) => path,
            (None, Some(id)) => match self.store.find_latest_for_student(id).await? {
                Some(path) => path,
                None => {
                    println!("\nNo response files found for student ID: {id}");
                    return Ok(());
                }
            },
            (None, None) => match self.pick_response_file().await? {
                Some(path) => path,
                None => return Ok(()),
            },
        };

        if !tokio::fs::try_exists(&path).await? {
            println!("\nError: Could not find responses file.");
            tracing::warn!(path = %path.display(), "Responses file not found");
            return Ok(());
        }

        let student_id = student_id.unwrap_or_else(Session::generate_student_id);
        let mut session = self.start_session(student_id).await?;
        match self.store.load(&path).await {
            Ok(stored) => {
                session.seed(stored, &path);
                println!(
                    "\nLoaded {} responses from {}",
                    session.responses().len(),
                    path.display()
                );
            }
            Err(e) => {
                tracing::error!("{}", e);
                println!("\n{e}");
                println!("Starting with no responses.");
            }
        }
        self.drive(session, interactive).await
    }

    /// Numbered pick list over the response files. `None` when cancelled.
    async fn pick_response_file(&mut self) -> Result<Option<PathBuf>, StartupError> {
        let entries = self.store.list_responses().await?;
        if entries.is_empty() {
            println!("\nNo response files found.");
            return Ok(None);
        }

        println!("\nAvailable response files:");
        println!("{}", render_responses(&entries));
        loop {
            let Some(reply) = self
                .console
                .prompt("Enter the number of the file to load (or 'q' to cancel): ")
                .await?
            else {
                return Ok(None);
            };
            if reply.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match reply.parse::<usize>() {
                Ok(n) if (1..=entries.len()).contains(&n) => {
                    return Ok(Some(entries[n - 1].path.clone()));
                }
                _ => println!("Invalid selection. Please try again."),
            }
        }
    }

    async fn list(&mut self, students: bool, responses: bool) -> Result<(), StartupError> {
        if students {
            println!("\nStudent portfolios:");
            println!("{}", render_portfolios(&self.store.list_portfolios().await?));
        }
        if responses {
            println!("\nResponse files:");
            println!("{}", render_responses(&self.store.list_responses().await?));
        }
        Ok(())
    }

    /// Parse the outline afresh and open a session over it.
    async fn start_session(&self, student_id: String) -> Result<Session, StartupError> {
        let questions = outline::load(&self.config.outline_candidates()).await?;
        Ok(Session::new(questions, student_id, self.store.clone()))
    }

    async fn drive(&mut self, session: Session, interactive: bool) -> Result<(), StartupError> {
        let deps = SubmitDeps {
            prompts: self.prompts.as_ref(),
            generator: self.generator.as_ref(),
            schema: self.schema.as_ref(),
        };
        let outcome = run_session(&mut self.console, session, &deps).await?;
        tracing::info!(outcome = ?outcome, "Session finished");

        if interactive && matches!(outcome, SessionOutcome::SavedAndSubmitted { .. }) {
            self.console
                .pause("\nPress ENTER to return to the main menu...")
                .await?;
        }
        Ok(())
    }
}

/// Reject a supplied student id that cannot name a file or directory.
fn accept_student_id(student_id: Option<&str>) -> bool {
    match student_id {
        Some(id) if !is_valid_student_id(id) => {
            tracing::warn!(student_id = %id, "Rejected student id");
            println!("\nInvalid student ID {id:?}: it must not be blank or contain '/', '\\' or '..'.");
            false
        }
        _ => true,
    }
}
