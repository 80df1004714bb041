//! Questionnaire session: the cursor over the questions and the answers
//! collected so far.
//!
//! Navigation transitions (`answer`, `skip`, `previous`, `next`) are
//! synchronous and never fail. The cursor is clamped after every one of them.
//! Terminal transitions (`save_only`, `save_and_submit`, `abort`) are the only
//! ones that touch the filesystem.

use std::path::{Path, PathBuf};

use crate::error::SessionError;
use crate::llm::DocumentGenerator;
use crate::prompts::PromptBuilder;
use crate::store::{ResponseStore, is_valid_student_id};

use super::outline::{Question, default_questions};
use super::snapshot::{ResponseMap, ResponseSnapshot, StoredResponses, slugify};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Saved {
        snapshot: PathBuf,
    },
    SavedAndSubmitted {
        snapshot: PathBuf,
        document: PathBuf,
        content: String,
    },
    AbortedWithoutSaving,
}

/// One student's pass through the questionnaire.
pub struct Session {
    questions: Vec<Question>,
    responses: ResponseMap,
    cursor: usize,
    student_id: String,
    project_title: Option<String>,
    responses_path: Option<PathBuf>,
    store: ResponseStore,
}

impl Session {
    /// Start a session with no answers. An empty question list is replaced
    /// by the default questions so the cursor always has somewhere to point.
    pub fn new(questions: Vec<Question>, student_id: impl Into<String>, store: ResponseStore) -> Self {
        let questions = if questions.is_empty() {
            tracing::warn!("Session started without questions; using default questions");
            default_questions()
        } else {
            questions
        };

        Self {
            questions,
            responses: ResponseMap::new(),
            cursor: 0,
            student_id: student_id.into(),
            project_title: None,
            responses_path: None,
            store,
        }
    }

    /// Default student id: local time as `%Y%m%d_%H%M%S`.
    pub fn generate_student_id() -> String {
        chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
    }

    /// Replace the answers with those of a loaded file.
    ///
    /// A wrapped snapshot also brings its student id and project title; a
    /// legacy map, or a recorded id that is not a safe path component, keeps
    /// the session's own identity.
    pub fn seed(&mut self, stored: StoredResponses, path: &Path) {
        match stored.student_id() {
            Some(student_id) if is_valid_student_id(student_id) => {
                self.student_id = student_id.to_string();
            }
            Some(student_id) => tracing::warn!(
                stored = %student_id,
                kept = %self.student_id,
                "Ignoring unsafe student id in response file"
            ),
            None => {}
        }
        if let Some(title) = stored.project_title() {
            self.project_title = Some(title.to_string());
        }
        self.responses = stored.into_responses();
        self.responses_path = Some(path.to_path_buf());
        tracing::info!(
            path = %path.display(),
            student_id = %self.student_id,
            count = self.responses.len(),
            "Seeded session from response file"
        );
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn responses(&self) -> &ResponseMap {
        &self.responses
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn student_id(&self) -> &str {
        &self.student_id
    }

    pub fn project_title(&self) -> Option<&str> {
        self.project_title.as_deref()
    }

    /// Path of the last snapshot written or loaded.
    pub fn responses_path(&self) -> Option<&Path> {
        self.responses_path.as_deref()
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.cursor]
    }

    pub fn current_answer(&self) -> Option<&str> {
        self.responses
            .get(&self.current_question().id)
            .map(String::as_str)
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor + 1 < self.questions.len()
    }

    /// Required questions that have no answer yet.
    pub fn unanswered_required(&self) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|q| q.required && !self.responses.contains_key(&q.id))
            .collect()
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Record a non-blank answer for the current question, then advance.
    pub fn answer(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let id = self.current_question().id.clone();
            self.responses.insert(id, trimmed.to_string());
        }
        self.advance();
    }

    pub fn skip(&mut self) {
        self.advance();
    }

    pub fn previous(&mut self) {
        if self.can_go_previous() {
            self.cursor -= 1;
        }
    }

    pub fn next(&mut self) {
        if self.can_go_next() {
            self.cursor += 1;
        }
    }

    fn advance(&mut self) {
        self.cursor = (self.cursor + 1).min(self.questions.len() - 1);
    }

    // ── Terminal transitions ────────────────────────────────────────

    /// Write the response snapshot.
    pub async fn save_only(&mut self) -> Result<SessionOutcome, SessionError> {
        let snapshot = self.write_snapshot().await?;
        Ok(SessionOutcome::Saved { snapshot })
    }

    /// Write the response snapshot, then generate the document from it.
    ///
    /// If configuration, prompt construction or generation fails, the
    /// snapshot stays on disk and no document is written.
    pub async fn save_and_submit(
        &mut self,
        prompts: &dyn PromptBuilder,
        generator: &dyn DocumentGenerator,
    ) -> Result<SessionOutcome, SessionError> {
        let snapshot = self.write_snapshot().await?;

        generator.configure()?;
        let prompt = prompts.build(&self.responses)?;
        tracing::info!(
            generator = generator.name(),
            prompt_chars = prompt.len(),
            "Submitting prompt"
        );
        let content = generator.generate(&prompt).await?;

        let slug = self.slug();
        let document = self
            .store
            .write_document(&self.student_id, &slug, &content)
            .await?;
        tracing::info!(path = %document.display(), "Generated document written");

        Ok(SessionOutcome::SavedAndSubmitted {
            snapshot,
            document,
            content,
        })
    }

    /// End the session, discarding anything unsaved.
    pub fn abort(self) -> SessionOutcome {
        tracing::info!(
            student_id = %self.student_id,
            discarded = self.responses.len(),
            "Session aborted without saving"
        );
        SessionOutcome::AbortedWithoutSaving
    }

    fn slug(&self) -> String {
        slugify(self.project_title.as_deref())
    }

    async fn write_snapshot(&mut self) -> Result<PathBuf, SessionError> {
        if self.responses.is_empty() {
            return Err(SessionError::EmptyResponses);
        }

        if let Some(title) = self.responses.get("q1") {
            self.project_title = Some(title.clone());
        }

        let snapshot = ResponseSnapshot::now(
            &self.student_id,
            self.project_title.clone(),
            self.responses.clone(),
        );
        let path = self.store.write_snapshot(&snapshot, &self.slug()).await?;
        tracing::info!(path = %path.display(), count = self.responses.len(), "Responses saved");
        self.responses_path = Some(path.clone());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, LlmError};
    use crate::prompts::StatementPromptBuilder;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct StubGenerator {
        configured: bool,
        reply: Result<&'static str, ()>,
    }

    #[async_trait]
    impl DocumentGenerator for StubGenerator {
        fn name(&self) -> &str {
            "stub"
        }

        fn configure(&self) -> Result<(), ConfigError> {
            if self.configured {
                Ok(())
            } else {
                Err(ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))
            }
        }

        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.reply
                .map(str::to_string)
                .map_err(|()| LlmError::RateLimited {
                    provider: "stub".into(),
                    retry_after: None,
                })
        }
    }

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question {
                section: "S".into(),
                title: format!("T{i}"),
                text: format!("What is {i}?"),
                id: format!("q{i}"),
                required: true,
            })
            .collect()
    }

    fn session(n: usize, dir: &TempDir) -> Session {
        let store = ResponseStore::new(dir.path().join("responses"), dir.path().join("generated"));
        Session::new(questions(n), "s1", store)
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn blank_answers_are_not_recorded() {
        let dir = TempDir::new().unwrap();
        let mut s = session(3, &dir);
        s.answer("");
        s.answer("   ");
        assert!(s.responses().is_empty());
        assert_eq!(s.cursor(), 2);
    }

    #[test]
    fn answer_records_trimmed_text_and_advances() {
        let dir = TempDir::new().unwrap();
        let mut s = session(3, &dir);
        s.answer("x");
        assert_eq!(s.responses().len(), 1);
        assert_eq!(s.responses()["q1"], "x");
        assert_eq!(s.cursor(), 1);

        s.answer("  line one\nline two \n");
        assert_eq!(s.responses()["q2"], "line one\nline two");
    }

    #[test]
    fn answer_overwrites_previous_answer() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("first");
        s.previous();
        s.answer("second");
        assert_eq!(s.responses()["q1"], "second");
        assert_eq!(s.responses().len(), 1);
    }

    #[test]
    fn advancing_saturates_at_last_question() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.skip();
        s.skip();
        s.skip();
        assert_eq!(s.cursor(), 1);
        s.answer("last");
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.responses()["q2"], "last");
    }

    #[test]
    fn previous_at_start_and_next_at_end_are_no_ops() {
        let dir = TempDir::new().unwrap();
        let mut s = session(3, &dir);
        assert!(!s.can_go_previous());
        s.previous();
        assert_eq!(s.cursor(), 0);

        s.next();
        s.next();
        assert_eq!(s.cursor(), 2);
        assert!(!s.can_go_next());
        s.next();
        assert_eq!(s.cursor(), 2);

        s.previous();
        assert_eq!(s.cursor(), 1);
    }

    #[test]
    fn single_question_session_never_moves() {
        let dir = TempDir::new().unwrap();
        let mut s = session(1, &dir);
        s.next();
        s.skip();
        s.previous();
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn empty_question_list_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let store = ResponseStore::new(dir.path().join("r"), dir.path().join("g"));
        let s = Session::new(Vec::new(), "s1", store);
        assert_eq!(s.questions().len(), 5);
        assert_eq!(s.current_question().id, "q1");
    }

    #[test]
    fn unanswered_required_tracks_answers() {
        let dir = TempDir::new().unwrap();
        let mut s = session(3, &dir);
        s.skip();
        s.answer("two");
        let ids: Vec<&str> = s.unanswered_required().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["q1", "q3"]);
    }

    #[test]
    fn generated_student_id_is_a_timestamp() {
        let id = Session::generate_student_id();
        assert_eq!(id.len(), 15);
        assert_eq!(&id[8..9], "_");
        assert!(id.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn save_with_no_responses_fails_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        let result = s.save_only().await;
        assert!(matches!(result, Err(SessionError::EmptyResponses)));
        assert!(files_in(&dir.path().join("responses")).is_empty());
        assert!(s.responses_path().is_none());
    }

    #[tokio::test]
    async fn save_writes_wrapped_snapshot_named_by_title() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("My Cool Game!!");

        let outcome = s.save_only().await.unwrap();
        let expected = dir.path().join("responses/my_cool_game_s1.json");
        assert_eq!(
            outcome,
            SessionOutcome::Saved {
                snapshot: expected.clone()
            }
        );
        assert_eq!(s.responses_path(), Some(expected.as_path()));
        assert_eq!(s.project_title(), Some("My Cool Game!!"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&expected).unwrap()).unwrap();
        assert_eq!(json["student_id"], "s1");
        assert_eq!(json["project_title"], "My Cool Game!!");
        assert_eq!(json["responses"]["q1"], "My Cool Game!!");
    }

    #[tokio::test]
    async fn save_without_title_uses_untitled_slug() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.skip();
        s.answer("only the second");

        s.save_only().await.unwrap();
        assert!(dir.path().join("responses/untitled_project_s1.json").exists());
    }

    #[tokio::test]
    async fn seeded_title_is_kept_when_q1_is_missing() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        let stored = StoredResponses::from_json(
            r#"{"student_id": "s9", "project_title": "Old Title", "responses": {"q2": "b"}}"#,
        )
        .unwrap();
        s.seed(stored, Path::new("/tmp/old.json"));
        assert_eq!(s.student_id(), "s9");

        s.save_only().await.unwrap();
        assert!(dir.path().join("responses/old_title_s9.json").exists());
    }

    #[tokio::test]
    async fn seed_ignores_traversing_student_id() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        let stored = StoredResponses::from_json(
            r#"{"student_id": "../../etc", "project_title": "Game", "responses": {"q1": "Game"}}"#,
        )
        .unwrap();
        s.seed(stored, Path::new("/tmp/evil.json"));
        assert_eq!(s.student_id(), "s1");

        s.save_only().await.unwrap();
        assert!(dir.path().join("responses/game_s1.json").exists());
    }

    #[tokio::test]
    async fn invalid_student_id_fails_save_and_keeps_session() {
        let dir = TempDir::new().unwrap();
        let store = ResponseStore::new(dir.path().join("responses"), dir.path().join("generated"));
        let mut s = Session::new(questions(2), "a/b", store);
        s.answer("Game");

        let result = s.save_only().await;
        assert!(matches!(result, Err(SessionError::InvalidStudentId(_))));
        assert!(files_in(&dir.path().join("responses")).is_empty());
        assert_eq!(s.responses()["q1"], "Game");
    }

    #[tokio::test]
    async fn legacy_seed_resaves_in_wrapped_format() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        let stored = StoredResponses::from_json(r#"{"q1": "Legacy Game", "q2": "b"}"#).unwrap();
        s.seed(stored, Path::new("/tmp/legacy.json"));
        assert_eq!(s.student_id(), "s1");
        assert_eq!(s.responses_path(), Some(Path::new("/tmp/legacy.json")));

        let SessionOutcome::Saved { snapshot } = s.save_only().await.unwrap() else {
            panic!("expected Saved");
        };
        let reloaded =
            StoredResponses::from_json(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
        assert!(matches!(reloaded, StoredResponses::Wrapped(_)));
        assert_eq!(reloaded.responses(), s.responses());
    }

    #[tokio::test]
    async fn submit_writes_snapshot_and_document() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("Monkey Magic");
        let generator = StubGenerator {
            configured: true,
            reply: Ok("# Statement of Intent"),
        };

        let outcome = s
            .save_and_submit(&StatementPromptBuilder, &generator)
            .await
            .unwrap();
        let SessionOutcome::SavedAndSubmitted {
            snapshot,
            document,
            content,
        } = outcome
        else {
            panic!("expected SavedAndSubmitted");
        };

        assert!(snapshot.ends_with("responses/monkey_magic_s1.json"));
        assert_eq!(document.parent(), Some(dir.path().join("generated/s1").as_path()));
        let name = document.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("monkey_magic_statement_of_intent_"));
        assert!(name.ends_with(".md"));
        assert_eq!(content, "# Statement of Intent");
        assert_eq!(std::fs::read_to_string(&document).unwrap(), content);
    }

    #[tokio::test]
    async fn submit_with_missing_key_keeps_snapshot_only() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("Game");
        let generator = StubGenerator {
            configured: false,
            reply: Ok("unused"),
        };

        let result = s.save_and_submit(&StatementPromptBuilder, &generator).await;
        assert!(matches!(result, Err(SessionError::Config(_))));
        assert_eq!(files_in(&dir.path().join("responses")).len(), 1);
        assert!(files_in(&dir.path().join("generated/s1")).is_empty());
    }

    #[tokio::test]
    async fn submit_with_generation_failure_keeps_snapshot_only() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("Game");
        let generator = StubGenerator {
            configured: true,
            reply: Err(()),
        };

        let result = s.save_and_submit(&StatementPromptBuilder, &generator).await;
        assert!(matches!(result, Err(SessionError::Generation(_))));
        assert!(dir.path().join("responses/game_s1.json").exists());
        assert!(files_in(&dir.path().join("generated/s1")).is_empty());

        // Session stays usable after the failure.
        s.answer("more");
        assert_eq!(s.responses()["q2"], "more");
    }

    #[tokio::test]
    async fn submit_with_no_responses_fails_before_generation() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        let generator = StubGenerator {
            configured: true,
            reply: Ok("unused"),
        };
        let result = s.save_and_submit(&StatementPromptBuilder, &generator).await;
        assert!(matches!(result, Err(SessionError::EmptyResponses)));
        assert!(files_in(&dir.path().join("responses")).is_empty());
    }

    #[test]
    fn abort_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut s = session(2, &dir);
        s.answer("unsaved");
        assert_eq!(s.abort(), SessionOutcome::AbortedWithoutSaving);
        assert!(files_in(&dir.path().join("responses")).is_empty());
    }
}
