//! Outline parser: turns the questionnaire outline into ordered questions.
//!
//! The outline is markdown-like text: `## ` headings open a section, `### `
//! headings optionally title the next question, and a bold sentence with a
//! question mark and an interrogative cue word is a question.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::StartupError;

/// Section assigned to questions that appear before any `## ` heading.
pub const DEFAULT_SECTION: &str = "Introduction";

/// How many lines above a question are searched for a `### ` title.
const TITLE_LOOKBACK: usize = 9;

/// Words that mark an emphasised line as a question. Matched case-sensitively.
const CUE_WORDS: &[&str] = &["What", "How", "Why", "Describe"];

const SECTION_MARKER: &str = "## ";
const TITLE_MARKER: &str = "### ";
const EMPHASIS: &str = "**";

/// One prompt shown to the student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub section: String,
    pub title: String,
    pub text: String,
    /// `q<N>`, N being the 1-based discovery order.
    pub id: String,
    pub required: bool,
}

impl Question {
    fn new(section: &str, title: &str, text: &str, id: &str) -> Self {
        Self {
            section: section.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            id: id.to_string(),
            required: true,
        }
    }
}

/// Parse an outline. Never returns an empty list: when no question lines
/// are found the [`default_questions`] are returned instead.
pub fn parse(outline: &str) -> Vec<Question> {
    let lines: Vec<&str> = outline.lines().collect();
    let mut current_section = DEFAULT_SECTION.to_string();
    let mut questions = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(heading) = line.strip_prefix(SECTION_MARKER) {
            current_section = heading.trim().to_string();
            continue;
        }

        if !is_question_line(line) {
            continue;
        }

        let number = questions.len() + 1;
        let text = line.replace(EMPHASIS, "").trim().to_string();
        let title =
            find_title(&lines, i).unwrap_or_else(|| format!("Question {number}"));

        questions.push(Question {
            section: current_section.clone(),
            title,
            text,
            id: format!("q{number}"),
            required: true,
        });
    }

    if questions.is_empty() {
        tracing::warn!("No questions found in the outline; using default questions");
        return default_questions();
    }

    tracing::debug!(count = questions.len(), "Parsed outline questions");
    questions
}

/// Read and parse the first outline that exists among `candidates`.
pub async fn load(candidates: &[PathBuf]) -> Result<Vec<Question>, StartupError> {
    for path in candidates {
        if fs::try_exists(path).await? {
            tracing::info!(path = %path.display(), "Loading outline");
            let content = fs::read_to_string(path).await?;
            return Ok(parse(&content));
        }
    }

    Err(StartupError::OutlineNotFound {
        searched: candidates.to_vec(),
    })
}

fn is_question_line(line: &str) -> bool {
    line.contains(EMPHASIS) && line.contains('?') && CUE_WORDS.iter().any(|w| line.contains(w))
}

/// Nearest `### ` heading within the look-back window above `index`.
fn find_title(lines: &[&str], index: usize) -> Option<String> {
    let start = index.saturating_sub(TITLE_LOOKBACK);
    lines[start..index]
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix(TITLE_MARKER))
        .map(|title| title.trim().to_string())
}

/// The fixed questions used when an outline yields nothing.
pub fn default_questions() -> Vec<Question> {
    vec![
        Question::new(
            "Introduction",
            "Project Title",
            "What is the proposed title of your Industrial Technology Multimedia Major Project?",
            "q1",
        ),
        Question::new(
            "Introduction",
            "Project Type",
            "What is the specific type of multimedia product you intend to create?",
            "q2",
        ),
        Question::new(
            "Introduction",
            "Problem/Opportunity",
            "What specific problem, opportunity, or need does your project aim to address?",
            "q3",
        ),
        Question::new(
            "Target Audience",
            "Audience",
            "Who is the primary target audience for your project?",
            "q4",
        ),
        Question::new(
            "Implementation",
            "Technologies",
            "What are the primary multimedia technologies you plan to use?",
            "q5",
        ),
    ]
}
