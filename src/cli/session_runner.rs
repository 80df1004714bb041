//! Interactive driver for one questionnaire session.

use tokio::io::AsyncBufRead;

use crate::error::SessionError;
use crate::llm::DocumentGenerator;
use crate::prompts::PromptBuilder;
use crate::questionnaire::{Session, SessionOutcome};
use crate::schema::StatementSchema;

use super::console::Console;

const RULE: &str = "--------------------------------------------------";

/// Collaborators a session needs to submit.
pub struct SubmitDeps<'a> {
    pub prompts: &'a dyn PromptBuilder,
    pub generator: &'a dyn DocumentGenerator,
    pub schema: Option<&'a StatementSchema>,
}

/// A numbered option in the session menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionChoice {
    Answer,
    Skip,
    Previous,
    Next,
    SaveAndGenerate,
    SaveOnly,
    Exit,
}

impl SessionChoice {
    fn key(self) -> &'static str {
        match self {
            Self::Answer => "1",
            Self::Skip => "2",
            Self::Previous => "3",
            Self::Next => "4",
            Self::SaveAndGenerate => "5",
            Self::SaveOnly => "6",
            Self::Exit => "7",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Answer => "Answer this question",
            Self::Skip => "Skip this question",
            Self::Previous => "Previous question",
            Self::Next => "Next question",
            Self::SaveAndGenerate => "Save and generate statement",
            Self::SaveOnly => "Save responses without generating",
            Self::Exit => "Exit without saving",
        }
    }

    /// Options offered at the session's current position.
    fn available(session: &Session) -> Vec<Self> {
        let mut choices = vec![Self::Answer, Self::Skip];
        if session.can_go_previous() {
            choices.push(Self::Previous);
        }
        if session.can_go_next() {
            choices.push(Self::Next);
        }
        choices.extend([Self::SaveAndGenerate, Self::SaveOnly, Self::Exit]);
        choices
    }
}

/// Walk the student through the questions until a terminal transition
/// succeeds. End of input aborts the session.
pub async fn run_session<R: AsyncBufRead + Unpin>(
    console: &mut Console<R>,
    mut session: Session,
    deps: &SubmitDeps<'_>,
) -> std::io::Result<SessionOutcome> {
    loop {
        display_question(&session);

        let choices = SessionChoice::available(&session);
        let keys: Vec<&str> = choices.iter().map(|c| c.key()).collect();
        let Some(key) = console.choose("\nChoose an option: ", &keys).await? else {
            println!("\nInput closed. Exiting without saving.");
            return Ok(session.abort());
        };
        let Some(choice) = choices.into_iter().find(|c| c.key() == key) else {
            continue;
        };

        match choice {
            SessionChoice::Answer => {
                println!("\n{}", session.current_question().text);
                println!("\nEnter your response below (or press Enter to skip)");
                println!("You can use multiple lines. Type 'DONE' on a new line when finished.");
                let text = console.read_multiline().await?;
                session.answer(&text);
            }
            SessionChoice::Skip => session.skip(),
            SessionChoice::Previous => session.previous(),
            SessionChoice::Next => session.next(),
            SessionChoice::SaveOnly => match session.save_only().await {
                Ok(outcome) => {
                    if let SessionOutcome::Saved { snapshot } = &outcome {
                        println!("\nResponses saved to {}", snapshot.display());
                        println!("You can continue later by loading this file.");
                    }
                    return Ok(outcome);
                }
                Err(e) => report(&e),
            },
            SessionChoice::SaveAndGenerate => {
                warn_missing_required(&session, deps.schema);
                println!("\nGenerating your Statement of Intent...");
                match session.save_and_submit(deps.prompts, deps.generator).await {
                    Ok(outcome) => {
                        if let SessionOutcome::SavedAndSubmitted {
                            snapshot,
                            document,
                            content,
                        } = &outcome
                        {
                            println!("\nResponses saved to {}", snapshot.display());
                            println!("\n{}", "=".repeat(RULE.len()));
                            println!("Your Statement of Intent has been generated!");
                            println!("File saved as: {}", document.display());
                            println!("{}", "=".repeat(RULE.len()));
                            println!("\nComplete Generated Statement of Intent:");
                            println!("{RULE}\n{content}\n{RULE}");
                        }
                        return Ok(outcome);
                    }
                    Err(e) => {
                        report(&e);
                        let nothing_written = matches!(
                            e,
                            SessionError::EmptyResponses | SessionError::InvalidStudentId(_)
                        );
                        if let Some(path) = session.responses_path()
                            && !nothing_written
                        {
                            println!("Your responses are still saved at {}", path.display());
                        }
                    }
                }
            }
            SessionChoice::Exit => {
                println!("\nExiting without saving. Your progress will be lost.");
                return Ok(session.abort());
            }
        }
    }
}

fn display_question(session: &Session) {
    let question = session.current_question();
    println!("\n{}", question.section);
    println!("{}", "=".repeat(question.section.chars().count()));
    println!(
        "Question {} of {} ({} answered): {}",
        session.cursor() + 1,
        session.questions().len(),
        session.responses().len(),
        question.title
    );
    println!("\n{}", question.text);

    if let Some(answer) = session.current_answer() {
        println!("\nCurrent response:");
        println!("---------------");
        println!("{answer}");
        println!("---------------");
    }

    println!("\n{RULE}");
    println!("Options:");
    for choice in SessionChoice::available(session) {
        println!("{}. {}", choice.key(), choice.label());
    }
    println!("{RULE}");
}

fn warn_missing_required(session: &Session, schema: Option<&StatementSchema>) {
    let mut missing: Vec<String> = session
        .unanswered_required()
        .iter()
        .map(|q| q.id.clone())
        .collect();
    if let Some(schema) = schema {
        for id in schema.missing_required(session.responses()) {
            if !missing.contains(&id) {
                missing.push(id);
            }
        }
    }
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Submitting with unanswered required questions");
        println!("\nNote: unanswered required questions: {}", missing.join(", "));
    }
}

fn report(err: &SessionError) {
    tracing::error!("Session transition failed: {}", err);
    println!("\n{err}");
    match err {
        SessionError::Config(_) => {
            println!("Please check GEMINI_API_KEY in your environment or .env file.")
        }
        SessionError::Generation(_) => println!(
            "This might be due to API rate limits, an invalid API key, or network issues."
        ),
        _ => {}
    }
}
